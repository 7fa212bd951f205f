//! Typed pool configuration.
//!
//! Pool properties arrive as untyped maps. Each strategy family deserializes
//! them into one of the structs below and validates the result once, when the
//! strategy is built, so allocation code never re-checks shapes.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ip::{AddressFamily, Cidr};
use crate::strategy::AllocationError;
use crate::utils::Properties;

/// Placeholder every counter template must contain.
pub const COUNTER_PLACEHOLDER: &str = "{counter}";

/// Pool keys consumed by the counter strategy itself; never substituted.
pub const COUNTER_RESERVED_KEYS: [&str; 4] = ["idFormat", "from", "to", "counterFormatWidth"];

/// Deserialize pool properties into a typed configuration.
pub fn from_properties<T: DeserializeOwned>(properties: &Properties) -> Result<T, AllocationError> {
    serde_json::from_value(Value::Object(properties.clone()))
        .map_err(|e| AllocationError::MalformedConfig(format!("Unable to read pool properties: {}", e)))
}

/// Root of an IPv4/IPv6 prefix or address pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixPoolConfig {
    pub address: String,
    pub prefix: u32,
    /// Reserve network and broadcast addresses
    #[serde(default)]
    pub subnet: bool,
}

impl PrefixPoolConfig {
    /// Parse and canonicalize the root prefix for the given family.
    pub fn root<F: AddressFamily>(&self) -> Result<Cidr<F>, AllocationError> {
        Cidr::from_parts(&self.address, self.prefix).map_err(AllocationError::config)
    }
}

/// Inclusive integer bounds shared by the VLAN and random-integer pools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangePoolConfig {
    pub from: i64,
    pub to: i64,
}

impl RangePoolConfig {
    /// VLAN style bounds: non-negative and `from <= to`.
    pub fn validate_non_negative(&self) -> Result<(), AllocationError> {
        if self.from < 0 || self.to < 0 {
            return Err(AllocationError::MalformedConfig(format!(
                "Range [{}-{}] must not be negative",
                self.from, self.to
            )));
        }
        if self.from > self.to {
            return Err(AllocationError::MalformedConfig(format!(
                "Range start {} is past its end {}",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// Signed 32-bit bounds with `from < to`.
    pub fn validate_int32(&self) -> Result<(), AllocationError> {
        let in_range = |n: i64| i32::try_from(n).is_ok();
        if !in_range(self.from) || !in_range(self.to) {
            return Err(AllocationError::MalformedConfig(format!(
                "Range [{}-{}] is outside of the signed 32-bit range",
                self.from, self.to
            )));
        }
        if self.from >= self.to {
            return Err(AllocationError::MalformedConfig(format!(
                "Range start {} must be below its end {}",
                self.from, self.to
            )));
        }
        Ok(())
    }

    /// Number of values in the range.
    pub fn width(&self) -> u128 {
        (i128::from(self.to) - i128::from(self.from) + 1).max(0) as u128
    }
}

/// Template and bounds of a unique-id pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterPoolConfig {
    pub id_format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_format_width: Option<usize>,

    /// Any other pool properties, available as template placeholders
    #[serde(flatten)]
    pub extra: Properties,
}

impl CounterPoolConfig {
    pub fn validate(&self) -> Result<(), AllocationError> {
        if !self.id_format.contains(COUNTER_PLACEHOLDER) {
            return Err(AllocationError::MalformedConfig(format!(
                "idFormat {} does not contain {}",
                self.id_format, COUNTER_PLACEHOLDER
            )));
        }
        let to = self.upper_bound();
        if to > i64::MAX as u64 {
            return Err(AllocationError::MalformedConfig(format!(
                "to {} is above the largest counter {}",
                to,
                i64::MAX
            )));
        }
        if let Some(from) = self.from {
            if from > to {
                return Err(AllocationError::MalformedConfig(format!(
                    "from {} is past to {}",
                    from, to
                )));
            }
        }
        Ok(())
    }

    /// The counter that precedes the first one handed out: `from - 1`, or 0
    /// when `from` is unset. A pool starting at 0 has offset -1.
    pub fn starting_offset(&self) -> i128 {
        self.from.map_or(0, |from| i128::from(from) - 1)
    }

    pub fn upper_bound(&self) -> u64 {
        self.to.unwrap_or(i64::MAX as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::{Ipv4, Ipv6};
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_prefix_pool_parsing() {
        let config: PrefixPoolConfig =
            from_properties(&props(json!({"address": "10.1.2.3", "prefix": 8}))).unwrap();
        assert!(!config.subnet);
        assert_eq!(config.root::<Ipv4>().unwrap().to_string(), "10.0.0.0/8");
        assert!(config.root::<Ipv6>().is_err());

        let missing = from_properties::<PrefixPoolConfig>(&props(json!({"address": "10.0.0.0"})));
        assert!(matches!(missing, Err(AllocationError::MalformedConfig(_))));

        let bad_mask = PrefixPoolConfig {
            address: "10.0.0.0".into(),
            prefix: 33,
            subnet: false,
        };
        assert!(matches!(bad_mask.root::<Ipv4>(), Err(AllocationError::MalformedConfig(_))));
    }

    #[test]
    fn test_range_validation() {
        let vlan = RangePoolConfig { from: 0, to: 4095 };
        assert!(vlan.validate_non_negative().is_ok());
        assert_eq!(vlan.width(), 4096);
        assert!(RangePoolConfig { from: 10, to: 9 }.validate_non_negative().is_err());
        assert!(RangePoolConfig { from: -1, to: 9 }.validate_non_negative().is_err());

        let full = RangePoolConfig {
            from: i64::from(i32::MIN),
            to: i64::from(i32::MAX),
        };
        assert!(full.validate_int32().is_ok());
        assert_eq!(full.width(), 1 << 32);
        assert!(RangePoolConfig { from: 5, to: 5 }.validate_int32().is_err());
        assert!(RangePoolConfig { from: 0, to: 1 << 31 }.validate_int32().is_err());
    }

    #[test]
    fn test_counter_pool_parsing() {
        let config: CounterPoolConfig = from_properties(&props(json!({
            "idFormat": "{vrf}-{counter}",
            "from": 1000,
            "vrf": "blue"
        })))
        .unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_offset(), 999);
        assert_eq!(config.upper_bound(), i64::MAX as u64);
        assert_eq!(config.extra.get("vrf"), Some(&json!("blue")));
        assert!(!config.extra.contains_key("from"));

        let from_zero: CounterPoolConfig =
            from_properties(&props(json!({"idFormat": "{counter}", "from": 0}))).unwrap();
        assert_eq!(from_zero.starting_offset(), -1);
        let unset: CounterPoolConfig = from_properties(&props(json!({"idFormat": "{counter}"}))).unwrap();
        assert_eq!(unset.starting_offset(), 0);

        let no_placeholder: CounterPoolConfig =
            from_properties(&props(json!({"idFormat": "static"}))).unwrap();
        assert!(no_placeholder.validate().is_err());

        let inverted: CounterPoolConfig =
            from_properties(&props(json!({"idFormat": "{counter}", "from": 10, "to": 5}))).unwrap();
        assert!(inverted.validate().is_err());
    }
}

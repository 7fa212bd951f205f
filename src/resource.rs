//! Resource, request and result types exchanged with the host.
//!
//! Everything here is a thin typed view over JSON-shaped property maps. The
//! host stores resources however it likes; allocators only ever see the
//! properties a strategy produced for them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::strategy::AllocationError;
use crate::utils::properties::{value_as_i64, value_as_u128, value_is_negative, Properties};
use crate::utils::Count;

/// A resource already claimed from a pool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocatedResource {
    #[serde(alias = "Properties")]
    pub properties: Properties,

    /// Lifecycle state as tracked by the host, e.g. "claimed" or "free"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl AllocatedResource {
    pub fn new(properties: Properties) -> Self {
        AllocatedResource {
            properties,
            status: None,
            updated_at: None,
        }
    }
}

impl From<Properties> for AllocatedResource {
    fn from(properties: Properties) -> Self {
        AllocatedResource::new(properties)
    }
}

/// Caller-supplied parameters for a single allocation.
///
/// Numeric fields stay as raw JSON values because hosts send them either as
/// numbers or as decimal text; each strategy validates the fields it reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_size: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desired_value: Option<Value>,

    /// Overrides the pool's subnet flag when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_count: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_number: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_number: Option<Value>,
}

impl AllocationRequest {
    /// Parse a request from a property map. A missing map is an empty request.
    pub fn from_properties(properties: Option<&Properties>) -> Result<Self, AllocationError> {
        match properties {
            None => Ok(AllocationRequest::default()),
            Some(map) => serde_json::from_value(Value::Object(map.clone()))
                .map_err(|e| AllocationError::InvalidRequest(format!("Unable to read request: {}", e))),
        }
    }

    /// The requested size, if any. Accepts a JSON integer or decimal text.
    pub fn desired_size(&self) -> Result<Option<u128>, AllocationError> {
        self.desired_size
            .as_ref()
            .map(|value| non_negative(value, "desiredSize"))
            .transpose()
    }

    /// Number of resources asked for; 1 when absent.
    pub fn resource_count(&self) -> Result<u128, AllocationError> {
        match &self.resource_count {
            None => Ok(1),
            Some(value) => match non_negative(value, "resourceCount")? {
                0 => Err(AllocationError::InvalidRequest(
                    "resourceCount must be at least 1".to_string(),
                )),
                count => Ok(count),
            },
        }
    }

    /// The desired value rendered as text, for address-like values.
    pub fn desired_text(&self) -> Result<Option<String>, AllocationError> {
        match &self.desired_value {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(AllocationError::InvalidRequest(format!(
                "desiredValue {} is not a string or number",
                other
            ))),
        }
    }

    /// The desired value as a signed integer.
    pub fn desired_integer(&self) -> Result<Option<i64>, AllocationError> {
        self.desired_value
            .as_ref()
            .map(|value| {
                value_as_i64(value).ok_or_else(|| {
                    AllocationError::InvalidRequest(format!("desiredValue {} is not an integer", value))
                })
            })
            .transpose()
    }

    /// The desired value as a non-negative integer.
    pub fn desired_number(&self) -> Result<Option<u128>, AllocationError> {
        self.desired_value
            .as_ref()
            .map(|value| non_negative(value, "desiredValue"))
            .transpose()
    }
}

fn non_negative(value: &Value, field: &str) -> Result<u128, AllocationError> {
    if value_is_negative(value) {
        return Err(AllocationError::InvalidRequest(format!(
            "{} must be non-negative, got {}",
            field, value
        )));
    }
    value_as_u128(value).ok_or_else(|| {
        AllocationError::InvalidRequest(format!("{} {} is not an integer", field, value))
    })
}

/// What a successful allocation hands back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AllocationResult {
    Single(Properties),
    Bulk(Vec<Properties>),
}

impl AllocationResult {
    /// The properties of a single-resource result.
    pub fn single(&self) -> Option<&Properties> {
        match self {
            AllocationResult::Single(properties) => Some(properties),
            AllocationResult::Bulk(_) => None,
        }
    }

    /// All produced property maps, in allocation order.
    pub fn into_properties(self) -> Vec<Properties> {
        match self {
            AllocationResult::Single(properties) => vec![properties],
            AllocationResult::Bulk(all) => all,
        }
    }
}

/// Utilised and free counts of a pool. Both serialize as decimal text so
/// IPv6 figures never lose precision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Capacity {
    #[serde(rename = "utilizedCapacity")]
    pub utilized: Count,
    #[serde(rename = "freeCapacity")]
    pub free: Count,
}

impl Capacity {
    pub fn new(utilized: Count, free: Count) -> Self {
        Capacity { utilized, free }
    }

    /// Capacity of a pool holding `total` values of which `utilized` are taken.
    pub fn from_total(total: Count, utilized: Count) -> Self {
        Capacity {
            utilized,
            free: total.saturating_sub(utilized),
        }
    }

    /// Utilised plus free; `None` past 2^128.
    pub fn total(&self) -> Option<Count> {
        self.utilized.checked_add(self.free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_request_from_properties() {
        let request = AllocationRequest::from_properties(Some(&props(json!({
            "desiredSize": "16777216",
            "subnet": true,
            "resourceCount": 3
        }))))
        .unwrap();
        assert_eq!(request.desired_size().unwrap(), Some(16_777_216));
        assert_eq!(request.subnet, Some(true));
        assert_eq!(request.resource_count().unwrap(), 3);

        let empty = AllocationRequest::from_properties(None).unwrap();
        assert_eq!(empty.desired_size().unwrap(), None);
        assert_eq!(empty.resource_count().unwrap(), 1);
    }

    #[test]
    fn test_request_rejects_bad_numbers() {
        let request = AllocationRequest::from_properties(Some(&props(json!({
            "desiredSize": -1,
            "resourceCount": 0,
            "desiredValue": [1]
        }))))
        .unwrap();
        assert!(matches!(request.desired_size(), Err(AllocationError::InvalidRequest(_))));
        assert!(matches!(request.resource_count(), Err(AllocationError::InvalidRequest(_))));
        assert!(matches!(request.desired_text(), Err(AllocationError::InvalidRequest(_))));

        let wrong_type = AllocationRequest::from_properties(Some(&props(json!({"subnet": "yes"}))));
        assert!(matches!(wrong_type, Err(AllocationError::InvalidRequest(_))));
    }

    #[test]
    fn test_allocated_resource_accepts_capitalized_key() {
        let resource: AllocatedResource = serde_json::from_value(json!({
            "Properties": {"vlan": 5},
            "status": "claimed",
            "updatedAt": "2024-03-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(resource.properties.get("vlan"), Some(&json!(5)));
        assert_eq!(resource.status.as_deref(), Some("claimed"));
        assert!(resource.updated_at.is_some());
    }

    #[test]
    fn test_result_serialization() {
        let single = AllocationResult::Single(props(json!({"vlan": 7})));
        assert_eq!(serde_json::to_value(&single).unwrap(), json!({"vlan": 7}));
        let bulk = AllocationResult::Bulk(vec![props(json!({"address": "10.0.0.1"}))]);
        assert_eq!(serde_json::to_value(&bulk).unwrap(), json!([{"address": "10.0.0.1"}]));
        assert_eq!(bulk.into_properties().len(), 1);
    }

    #[test]
    fn test_capacity_serializes_as_text() {
        let capacity = Capacity::from_total(Count::MAX, Count::new(4));
        assert_eq!(
            serde_json::to_value(capacity).unwrap(),
            json!({
                "utilizedCapacity": "4",
                "freeCapacity": "340282366920938463463374607431768211452"
            })
        );
        assert_eq!(capacity.total(), Some(Count::MAX));
    }
}

//! Counter-based unique identifiers.
//!
//! The counter is never stored: the next value is one past the highest
//! counter in the snapshot (or the pool's `from`). Identifiers are rendered
//! from the pool's `idFormat` template, where `{counter}` and any other pool
//! property can appear as `{name}` placeholders.

use std::collections::HashSet;
use std::sync::LazyLock;

use log::debug;
use regex::{Captures, Regex};
use serde_json::Value;

use super::{AllocationError, Strategy};
use crate::config::{self, CounterPoolConfig, COUNTER_RESERVED_KEYS};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::properties::render_value;
use crate::utils::{Count, Properties};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").unwrap_or_else(|e| unreachable!("placeholder pattern is valid: {}", e))
});

/// Counter stored in a resource. Whole floats are accepted since some hosts
/// round-trip every number through a double.
fn counter_of(resource: &AllocatedResource) -> Result<u64, AllocationError> {
    let value = resource.properties.get("counter");
    let counter = match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    counter.ok_or_else(|| {
        AllocationError::MalformedResource(format!(
            "counter missing or not a non-negative integer in {}",
            Value::Object(resource.properties.clone())
        ))
    })
}

#[derive(Debug, Clone)]
pub struct UniqueIdStrategy {
    config: CounterPoolConfig,
}

impl UniqueIdStrategy {
    pub fn new(config: CounterPoolConfig) -> Result<Self, AllocationError> {
        config.validate()?;
        Ok(UniqueIdStrategy { config })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(config::from_properties(properties)?)
    }

    /// Highest counter handed out so far, never below the starting offset.
    fn current(&self, counters: &HashSet<u64>) -> i128 {
        let offset = self.config.starting_offset();
        counters
            .iter()
            .map(|counter| i128::from(*counter))
            .max()
            .map_or(offset, |highest| highest.max(offset))
    }

    /// Substitute placeholders; unknown names stay as written.
    pub fn render(&self, counter: u64) -> String {
        let counter_text = match self.config.counter_format_width {
            Some(width) => format!("{:0width$}", counter, width = width),
            None => counter.to_string(),
        };
        PLACEHOLDER
            .replace_all(&self.config.id_format, |caps: &Captures| {
                let name = &caps[1];
                if name == "counter" {
                    return counter_text.clone();
                }
                match self.config.extra.get(name) {
                    Some(value) if !COUNTER_RESERVED_KEYS.contains(&name) => render_value(value),
                    _ => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn counters(resources: &[AllocatedResource]) -> Result<HashSet<u64>, AllocationError> {
        resources.iter().map(counter_of).collect()
    }
}

impl Strategy for UniqueIdStrategy {
    fn name(&self) -> &'static str {
        "unique_id"
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let counters = Self::counters(resources)?;
        let upper = self.config.upper_bound();

        let counter = match request.desired_number()? {
            Some(desired) => {
                let lower = self.config.from.unwrap_or(0);
                let desired = u64::try_from(desired)
                    .ok()
                    .filter(|d| (lower..=upper).contains(d))
                    .ok_or_else(|| {
                        AllocationError::InvalidRequest(format!(
                            "desiredValue {} is outside of {}-{}",
                            desired, lower, upper
                        ))
                    })?;
                if counters.contains(&desired) {
                    return Err(AllocationError::AlreadyAllocated(format!(
                        "Unique id {} was already claimed",
                        desired
                    )));
                }
                desired
            }
            None => u64::try_from(self.current(&counters) + 1)
                .ok()
                .filter(|next| *next <= upper)
                .ok_or_else(|| {
                    AllocationError::InsufficientCapacity(format!("No counter left below {}", upper))
                })?,
        };

        let text = self.render(counter);
        debug!("Allocated unique id {} (counter {})", text, counter);

        let mut properties = Properties::new();
        properties.insert("text".to_string(), Value::from(text));
        properties.insert("counter".to_string(), Value::from(counter));
        Ok(AllocationResult::Single(properties))
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        let current = self.current(&Self::counters(resources)?);
        // both differences fit in u128 once floored at zero
        let utilized = (current - self.config.starting_offset()).max(0) as u128;
        let free = (i128::from(self.config.upper_bound()) - current).max(0) as u128;
        Ok(Capacity::new(Count::new(utilized), Count::new(free)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::test_support::{props, request, resource};
    use serde_json::json;

    fn pool(properties: Value) -> UniqueIdStrategy {
        UniqueIdStrategy::from_properties(&props(properties)).unwrap()
    }

    fn allocated(result: AllocationResult) -> AllocatedResource {
        AllocatedResource::new(result.single().unwrap().clone())
    }

    fn counter(result: &AllocationResult) -> u64 {
        result.single().unwrap()["counter"].as_u64().unwrap()
    }

    #[test]
    fn test_first_counter() {
        let strategy = pool(json!({"idFormat": "{counter}"}));
        let result = strategy.allocate(&[], &AllocationRequest::default()).unwrap();
        assert_eq!(counter(&result), 1);
        assert_eq!(result.single().unwrap()["text"], json!("1"));
    }

    #[test]
    fn test_counter_from_start() {
        let strategy = pool(json!({"idFormat": "{counter}", "from": 1000}));
        let mut resources = Vec::new();
        for i in 0..=10u64 {
            let result = strategy.allocate(&resources, &AllocationRequest::default()).unwrap();
            assert_eq!(counter(&result), 1000 + i);
            assert_eq!(result.single().unwrap()["text"], json!((1000 + i).to_string()));
            resources.push(allocated(result));
        }
    }

    #[test]
    fn test_counter_from_zero() {
        let strategy = pool(json!({"idFormat": "id-{counter}", "from": 0}));
        let capacity = strategy.capacity(&[]).unwrap();
        assert_eq!(capacity.utilized, Count::ZERO);
        assert_eq!(capacity.free, Count::from(i64::MAX as u64 + 1));

        let first = strategy.allocate(&[], &AllocationRequest::default()).unwrap();
        assert_eq!(counter(&first), 0);
        assert_eq!(first.single().unwrap()["text"], json!("id-0"));

        let taken = [allocated(first)];
        assert_eq!(counter(&strategy.allocate(&taken, &AllocationRequest::default()).unwrap()), 1);
        let capacity = strategy.capacity(&taken).unwrap();
        assert_eq!(capacity.utilized, Count::ONE);
        assert_eq!(capacity.free, Count::from(i64::MAX as u64));
    }

    #[test]
    fn test_desired_value() {
        let strategy = pool(json!({"idFormat": "{counter}"}));
        let result = strategy.allocate(&[], &request(json!({"desiredValue": 4}))).unwrap();
        assert_eq!(counter(&result), 4);
        let taken = [allocated(result)];
        assert!(matches!(
            strategy.allocate(&taken, &request(json!({"desiredValue": 4}))),
            Err(AllocationError::AlreadyAllocated(_))
        ));
        // the implicit counter continues after the highest claimed value
        assert_eq!(counter(&strategy.allocate(&taken, &AllocationRequest::default()).unwrap()), 5);

        let bounded = pool(json!({"idFormat": "{counter}", "from": 10, "to": 20}));
        for desired in [9, 21, -1] {
            assert!(matches!(
                bounded.allocate(&[], &request(json!({"desiredValue": desired}))),
                Err(AllocationError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_template_substitution() {
        let strategy = pool(json!({
            "vpn": "VPN85",
            "network": "Network19",
            "idFormat": "VPN-{counter}-{network}-{vpn}-local"
        }));
        let taken = [
            resource(json!({"counter": 0, "text": "first"})),
            resource(json!({"counter": 1.0, "text": "second"})),
            resource(json!({"counter": 3, "text": "third"})),
        ];
        let result = strategy.allocate(&taken, &AllocationRequest::default()).unwrap();
        assert_eq!(
            result.single().unwrap(),
            &props(json!({"counter": 4, "text": "VPN-4-Network19-VPN85-local"}))
        );

        let capacity = strategy.capacity(&taken).unwrap();
        assert_eq!(capacity.utilized, Count::new(3));
        assert_eq!(capacity.free, Count::from(i64::MAX as u64 - 3));
    }

    #[test]
    fn test_padding_and_unknown_placeholders() {
        let strategy = pool(json!({
            "idFormat": "{site}-{counter}-{unknown}-{from}",
            "counterFormatWidth": 4,
            "site": 7,
            "from": 3
        }));
        let result = strategy.allocate(&[], &AllocationRequest::default()).unwrap();
        assert_eq!(result.single().unwrap()["text"], json!("7-0003-{unknown}-{from}"));
    }

    #[test]
    fn test_exhaustion() {
        let strategy = pool(json!({"idFormat": "{counter}", "from": 1, "to": 2}));
        let taken = [resource(json!({"counter": 1})), resource(json!({"counter": 2}))];
        assert!(matches!(
            strategy.allocate(&taken, &AllocationRequest::default()),
            Err(AllocationError::InsufficientCapacity(_))
        ));
        let capacity = strategy.capacity(&taken).unwrap();
        assert_eq!(capacity.utilized, Count::new(2));
        assert_eq!(capacity.free, Count::ZERO);
    }

    #[test]
    fn test_invalid_pools_and_resources() {
        assert!(UniqueIdStrategy::from_properties(&props(json!({"idFormat": "id"}))).is_err());
        assert!(UniqueIdStrategy::from_properties(&props(json!({"from": 1}))).is_err());

        let strategy = pool(json!({"idFormat": "{counter}"}));
        let broken = [resource(json!({"text": "no counter"}))];
        assert!(matches!(
            strategy.capacity(&broken),
            Err(AllocationError::MalformedResource(_))
        ));
    }
}

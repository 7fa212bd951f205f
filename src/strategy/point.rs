//! Single-value allocation from a bounded integer domain.
//!
//! `vlan` hands out the lowest free id. `random_signed_int32` samples the
//! range uniformly and falls back to a wrap-around scan once its sampling
//! budget is spent, so a pool with any free value always succeeds.

use std::collections::HashSet;

use log::debug;
use rand::Rng;
use serde_json::Value;

use super::{resource_i64, AllocationError, Strategy};
use crate::config::{self, RangePoolConfig};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::{Count, Properties};

/// Random draws attempted before scanning.
const SAMPLE_BUDGET: u128 = 1024;

/// Distinct allocated values under `key`.
fn used_values(resources: &[AllocatedResource], key: &str) -> Result<HashSet<i64>, AllocationError> {
    resources.iter().map(|resource| resource_i64(resource, key)).collect()
}

fn range_capacity(range: &RangePoolConfig, used: &HashSet<i64>) -> Capacity {
    let inside = used.iter().filter(|v| (range.from..=range.to).contains(*v)).count();
    Capacity::from_total(Count::new(range.width()), Count::from(inside))
}

/// Validate an explicitly requested value.
fn check_desired(
    range: &RangePoolConfig,
    used: &HashSet<i64>,
    request: &AllocationRequest,
) -> Result<Option<i64>, AllocationError> {
    let Some(value) = request.desired_integer()? else {
        return Ok(None);
    };
    if !(range.from..=range.to).contains(&value) {
        return Err(AllocationError::InvalidRequest(format!(
            "{} is outside of [{}-{}]",
            value, range.from, range.to
        )));
    }
    if used.contains(&value) {
        return Err(AllocationError::AlreadyAllocated(format!("{} is already allocated", value)));
    }
    Ok(Some(value))
}

fn single(key: &str, value: i64) -> AllocationResult {
    let mut properties = Properties::new();
    properties.insert(key.to_string(), Value::from(value));
    AllocationResult::Single(properties)
}

#[derive(Debug, Clone)]
pub struct VlanStrategy {
    range: RangePoolConfig,
}

impl VlanStrategy {
    pub fn new(config: RangePoolConfig) -> Result<Self, AllocationError> {
        config.validate_non_negative()?;
        Ok(VlanStrategy { range: config })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(config::from_properties(properties)?)
    }
}

impl Strategy for VlanStrategy {
    fn name(&self) -> &'static str {
        "vlan"
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let used = used_values(resources, "vlan")?;
        let vlan = match check_desired(&self.range, &used, request)? {
            Some(vlan) => vlan,
            None => (self.range.from..=self.range.to)
                .find(|candidate| !used.contains(candidate))
                .ok_or_else(|| {
                    AllocationError::InsufficientCapacity(format!(
                        "No free vlan left in [{}-{}]",
                        self.range.from, self.range.to
                    ))
                })?,
        };
        debug!("Allocated vlan {}", vlan);
        Ok(single("vlan", vlan))
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        Ok(range_capacity(&self.range, &used_values(resources, "vlan")?))
    }
}

#[derive(Debug, Clone)]
pub struct RandomInt32Strategy {
    range: RangePoolConfig,
}

impl RandomInt32Strategy {
    pub fn new(config: RangePoolConfig) -> Result<Self, AllocationError> {
        config.validate_int32()?;
        Ok(RandomInt32Strategy { range: config })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(config::from_properties(properties)?)
    }

    /// Allocate drawing from the given generator.
    pub fn allocate_with_rng<R: Rng>(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
        rng: &mut R,
    ) -> Result<AllocationResult, AllocationError> {
        let used = used_values(resources, "int")?;
        if let Some(value) = check_desired(&self.range, &used, request)? {
            debug!("Allocated requested int {}", value);
            return Ok(single("int", value));
        }

        let RangePoolConfig { from, to } = self.range;
        let capacity = range_capacity(&self.range, &used);
        if capacity.free.is_zero() {
            return Err(AllocationError::InsufficientCapacity(format!(
                "No free int left in [{}-{}]",
                from, to
            )));
        }

        let width = self.range.width();
        for _ in 0..width.min(SAMPLE_BUDGET) {
            let candidate = rng.gen_range(from..=to);
            if !used.contains(&candidate) {
                debug!("Allocated random int {}", candidate);
                return Ok(single("int", candidate));
            }
        }

        // nearly full: walk the range once from a random offset
        let width = width as i64;
        let offset = rng.gen_range(0..width);
        let candidate = (0..width)
            .map(|step| from + (offset + step) % width)
            .find(|candidate| !used.contains(candidate))
            .ok_or_else(|| {
                AllocationError::InsufficientCapacity(format!("No free int left in [{}-{}]", from, to))
            })?;
        debug!("Allocated int {} after exhausting random draws", candidate);
        Ok(single("int", candidate))
    }
}

impl Strategy for RandomInt32Strategy {
    fn name(&self) -> &'static str {
        "random_signed_int32"
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        self.allocate_with_rng(resources, request, &mut rand::thread_rng())
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        Ok(range_capacity(&self.range, &used_values(resources, "int")?))
    }
}

//! Contiguous integer range allocation (VLAN ranges).
//!
//! Same first-fit gap search as prefixes, without power-of-two alignment.

use log::{debug, warn};
use serde_json::Value;

use super::{resource_i64, AllocationError, Strategy};
use crate::config::{self, RangePoolConfig};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::interval::{capacity, compare_by_end, find_gap, Interval};
use crate::utils::{Count, Properties};

#[derive(Debug, Clone)]
pub struct VlanRangeStrategy {
    root: Interval,
}

impl VlanRangeStrategy {
    pub fn new(config: &RangePoolConfig) -> Result<Self, AllocationError> {
        config.validate_non_negative()?;
        Ok(VlanRangeStrategy {
            root: Interval {
                start: config.from as u128,
                last: config.to as u128,
            },
        })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(&config::from_properties(properties)?)
    }

    fn allocated(&self, resources: &[AllocatedResource]) -> Result<Vec<Interval>, AllocationError> {
        let mut intervals = Vec::with_capacity(resources.len());
        for resource in resources {
            let from = resource_i64(resource, "from")?;
            let to = resource_i64(resource, "to")?;
            let interval = u128::try_from(from)
                .ok()
                .zip(u128::try_from(to).ok())
                .and_then(|(from, to)| Interval::new(from, to))
                .ok_or_else(|| {
                    AllocationError::MalformedResource(format!("Range [{}-{}] is not a valid range", from, to))
                })?;
            if !self.root.encloses(&interval) {
                warn!(
                    "Ignoring allocated range [{}-{}] outside of pool [{}-{}]",
                    from, to, self.root.start, self.root.last
                );
                continue;
            }
            intervals.push(interval);
        }
        intervals.sort_by(compare_by_end);
        Ok(intervals)
    }
}

impl Strategy for VlanRangeStrategy {
    fn name(&self) -> &'static str {
        "vlan_range"
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let size = request
            .desired_size()?
            .ok_or_else(|| AllocationError::InvalidRequest("desiredSize is required".to_string()))?;
        if size == 0 {
            return Err(AllocationError::InvalidRequest(
                "desiredSize must be at least 1".to_string(),
            ));
        }

        let allocated = self.allocated(resources)?;
        let start = find_gap(&allocated, Count::new(size), self.root, None).ok_or_else(|| {
            AllocationError::InsufficientCapacity(format!(
                "No free range of {} in [{}-{}]",
                size, self.root.start, self.root.last
            ))
        })?;
        // the gap lies inside the root, so start + size - 1 <= root.last
        let last = start + (size - 1);
        debug!("Allocated range [{}-{}]", start, last);

        let mut properties = Properties::new();
        properties.insert("from".to_string(), Value::from(start as u64));
        properties.insert("to".to_string(), Value::from(last as u64));
        Ok(AllocationResult::Single(properties))
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        let allocated = self.allocated(resources)?;
        let total = self.root.width();
        let utilized = capacity(&allocated)
            .filter(|utilized| *utilized <= total)
            .ok_or_else(|| {
                AllocationError::SnapshotInconsistent(format!(
                    "Allocated ranges cover more than [{}-{}]",
                    self.root.start, self.root.last
                ))
            })?;
        Ok(Capacity::from_total(total, utilized))
    }
}

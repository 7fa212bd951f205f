//! CIDR prefix allocation for IPv4 and IPv6 pools.
//!
//! A request for `n` addresses is rounded up to the smallest power-of-two
//! block, then placed in the first gap of the root where a block of that size
//! can start on its own mask boundary.

use log::{debug, warn};
use serde_json::Value;

use super::{resource_str, resource_u128, AllocationError, Strategy};
use crate::config::{self, PrefixPoolConfig};
use crate::ip::{AddressFamily, Cidr};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::interval::{capacity, compare_by_end, find_gap, host_mask, Interval};
use crate::utils::{Count, Properties};

/// Host bits of the smallest block holding `size` addresses (`size >= 1`).
pub fn host_bits_for(size: u128) -> u32 {
    u128::BITS - (size - 1).leading_zeros()
}

/// Prefix allocator over one address family.
#[derive(Debug, Clone)]
pub struct PrefixStrategy<F: AddressFamily> {
    root: Cidr<F>,
    subnet: bool,
}

impl<F: AddressFamily> PrefixStrategy<F> {
    pub fn new(config: &PrefixPoolConfig) -> Result<Self, AllocationError> {
        Ok(PrefixStrategy {
            root: config.root()?,
            subnet: config.subnet,
        })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(&config::from_properties(properties)?)
    }

    pub fn root(&self) -> Cidr<F> {
        self.root
    }

    /// Allocated prefixes inside the root, sorted by their last address.
    fn allocated(&self, resources: &[AllocatedResource]) -> Result<Vec<Interval>, AllocationError> {
        let root = self.root.interval();
        let mut intervals = Vec::with_capacity(resources.len());
        for resource in resources {
            let address = resource_str(resource, "address")?;
            let prefix = resource_u128(resource, "prefix")?;
            let cidr = u32::try_from(prefix)
                .map_err(|_| AllocationError::MalformedResource(format!("prefix {} is out of range", prefix)))
                .and_then(|prefix| {
                    Cidr::<F>::from_parts(address, prefix)
                        .map_err(|e| AllocationError::MalformedResource(e.to_string()))
                })?;
            let interval = cidr.interval();
            if !root.encloses(&interval) {
                warn!("Ignoring allocated prefix {} outside of root {}", cidr, self.root);
                continue;
            }
            intervals.push(interval);
        }
        intervals.sort_by(compare_by_end);
        Ok(intervals)
    }

    /// Check that a requested block start is usable.
    fn check_desired(
        &self,
        text: &str,
        host_bits: u32,
        allocated: &[Interval],
    ) -> Result<u128, AllocationError> {
        let start = F::parse(text).map_err(AllocationError::request)?;
        if start & host_mask(host_bits) != 0 {
            return Err(AllocationError::InvalidRequest(format!(
                "{} is not a network address of a /{} prefix",
                text,
                F::BITS - host_bits
            )));
        }
        let block = Interval::block(start, host_bits)
            .filter(|block| self.root.interval().encloses(block))
            .ok_or_else(|| {
                AllocationError::InvalidRequest(format!(
                    "{}/{} is outside of root {}",
                    text,
                    F::BITS - host_bits,
                    self.root
                ))
            })?;
        if let Some(taken) = allocated.iter().find(|interval| interval.overlaps(&block)) {
            return Err(AllocationError::AlreadyAllocated(format!(
                "{}/{} overlaps allocated block starting at {}",
                text,
                F::BITS - host_bits,
                F::format(taken.start)
            )));
        }
        Ok(start)
    }
}

impl<F: AddressFamily> Strategy for PrefixStrategy<F> {
    fn name(&self) -> &'static str {
        F::PREFIX_TAG
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let desired = request
            .desired_size()?
            .ok_or_else(|| AllocationError::InvalidRequest("desiredSize is required".to_string()))?;
        if desired < 2 {
            return Err(AllocationError::InvalidRequest(format!(
                "desiredSize {} is below the minimum of 2",
                desired
            )));
        }
        let subnet = request.subnet.unwrap_or(self.subnet);
        // network and broadcast addresses
        let reserved = if subnet { 2 } else { 0 };
        let size = desired.checked_add(reserved).ok_or_else(|| {
            AllocationError::InsufficientCapacity(format!("desiredSize {} does not fit any prefix", desired))
        })?;

        let host_bits = host_bits_for(size);
        if host_bits > self.root.host_bits() {
            return Err(AllocationError::InsufficientCapacity(format!(
                "Requested size {} is larger than root {}",
                size, self.root
            )));
        }

        let allocated = self.allocated(resources)?;
        let start = match request.desired_text()? {
            Some(text) => self.check_desired(&text, host_bits, &allocated)?,
            None => {
                let required = Count::pow2(host_bits).unwrap_or(Count::MAX);
                find_gap(&allocated, required, self.root.interval(), Some(host_bits)).ok_or_else(|| {
                    AllocationError::InsufficientCapacity(format!(
                        "No free /{} left in {}",
                        F::BITS - host_bits,
                        self.root
                    ))
                })?
            }
        };

        let prefix_len = F::BITS - host_bits;
        debug!("Allocated {}/{} for size {} in {}", F::format(start), prefix_len, size, self.root);

        let mut properties = Properties::new();
        properties.insert("address".to_string(), Value::from(F::format(start)));
        properties.insert("prefix".to_string(), Value::from(prefix_len));
        properties.insert("subnet".to_string(), Value::from(subnet));
        Ok(AllocationResult::Single(properties))
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        let allocated = self.allocated(resources)?;
        let total = self.root.width();
        let utilized = capacity(&allocated)
            .filter(|utilized| *utilized <= total)
            .ok_or_else(|| {
                AllocationError::SnapshotInconsistent(format!(
                    "Allocated prefixes cover more than root {}",
                    self.root
                ))
            })?;
        Ok(Capacity::from_total(total, utilized))
    }
}

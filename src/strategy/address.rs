//! Single-address allocation for IPv4 and IPv6 pools.
//!
//! Candidates are scanned in ascending order from the bottom of the root.
//! In subnet mode the network and broadcast addresses are never handed out.

use std::collections::HashSet;

use log::{debug, warn};
use serde_json::Value;

use super::{resource_str, AllocationError, Strategy};
use crate::config::{self, PrefixPoolConfig};
use crate::ip::{AddressFamily, Cidr};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::{Count, Interval, Properties};

/// Largest `resourceCount` served by one bulk call; every address is
/// materialised in the result.
pub const MAX_BULK_COUNT: u128 = 1 << 16;

/// Address allocator over one address family.
#[derive(Debug, Clone)]
pub struct AddressStrategy<F: AddressFamily> {
    root: Cidr<F>,
    subnet: bool,
}

impl<F: AddressFamily> AddressStrategy<F> {
    pub fn new(config: &PrefixPoolConfig) -> Result<Self, AllocationError> {
        Ok(AddressStrategy {
            root: config.root()?,
            subnet: config.subnet,
        })
    }

    pub fn from_properties(properties: &Properties) -> Result<Self, AllocationError> {
        Self::new(&config::from_properties(properties)?)
    }

    /// Addresses that may be handed out; `None` when subnet mode leaves nothing.
    pub fn scan_domain(&self, subnet: bool) -> Option<Interval> {
        let root = self.root.interval();
        if !subnet {
            return Some(root);
        }
        if self.root.host_bits() < 2 {
            return None;
        }
        Interval::new(root.start + 1, root.last - 1)
    }

    fn used(&self, resources: &[AllocatedResource]) -> Result<HashSet<u128>, AllocationError> {
        let root = self.root.interval();
        let mut used = HashSet::with_capacity(resources.len());
        for resource in resources {
            let text = resource_str(resource, "address")?;
            let address = F::parse(text).map_err(|e| AllocationError::MalformedResource(e.to_string()))?;
            if !root.contains(address) {
                warn!("Allocated address {} is outside of root {}", text, self.root);
            }
            used.insert(address);
        }
        Ok(used)
    }

    fn used_in(domain: Option<Interval>, used: &HashSet<u128>) -> Count {
        let inside = domain.map_or(0, |domain| used.iter().filter(|a| domain.contains(**a)).count());
        Count::from(inside)
    }

    fn render(address: u128) -> Properties {
        let mut properties = Properties::new();
        properties.insert("address".to_string(), Value::from(F::format(address)));
        properties
    }
}

impl<F: AddressFamily> Strategy for AddressStrategy<F> {
    fn name(&self) -> &'static str {
        F::ADDRESS_TAG
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let count = request.resource_count()?;
        if count > MAX_BULK_COUNT {
            return Err(AllocationError::InvalidRequest(format!(
                "resourceCount {} is above the bulk limit of {}",
                count, MAX_BULK_COUNT
            )));
        }
        let bulk = request.resource_count.is_some();
        let subnet = request.subnet.unwrap_or(self.subnet);
        let used = self.used(resources)?;
        let domain = self.scan_domain(subnet);

        if let Some(text) = request.desired_text()? {
            if count > 1 {
                return Err(AllocationError::InvalidRequest(
                    "desiredValue cannot be combined with resourceCount above 1".to_string(),
                ));
            }
            let address = F::parse(&text).map_err(AllocationError::request)?;
            if !domain.is_some_and(|domain| domain.contains(address)) {
                return Err(AllocationError::InvalidRequest(format!(
                    "{} is not an allocatable address of {}",
                    text, self.root
                )));
            }
            if used.contains(&address) {
                return Err(AllocationError::AlreadyAllocated(format!("{} is already allocated", text)));
            }
            debug!("Allocated requested address {} in {}", text, self.root);
            let properties = Self::render(address);
            return Ok(if bulk {
                AllocationResult::Bulk(vec![properties])
            } else {
                AllocationResult::Single(properties)
            });
        }

        let domain = domain.ok_or_else(|| {
            AllocationError::InsufficientCapacity(format!("{} has no usable host addresses", self.root))
        })?;
        let free = domain.width().saturating_sub(Self::used_in(Some(domain), &used));
        if Count::new(count) > free {
            return Err(AllocationError::InsufficientCapacity(format!(
                "Requested {} addresses but only {} are free in {}",
                count, free, self.root
            )));
        }

        // the free-count check above guarantees the scan finds enough
        let mut chosen = Vec::new();
        let mut candidate = domain.start;
        while (chosen.len() as u128) < count {
            if !used.contains(&candidate) {
                chosen.push(candidate);
            }
            if candidate == domain.last {
                break;
            }
            candidate += 1;
        }
        if (chosen.len() as u128) < count {
            return Err(AllocationError::InsufficientCapacity(format!(
                "No free address left in {}",
                self.root
            )));
        }

        debug!("Allocated {} address(es) starting at {} in {}", chosen.len(), F::format(chosen[0]), self.root);
        let mut all: Vec<Properties> = chosen.into_iter().map(Self::render).collect();
        if bulk {
            Ok(AllocationResult::Bulk(all))
        } else {
            Ok(AllocationResult::Single(all.remove(0)))
        }
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        let used = self.used(resources)?;
        let domain = self.scan_domain(self.subnet);
        let total = domain.map_or(Count::ZERO, |domain| domain.width());
        Ok(Capacity::from_total(total, Self::used_in(domain, &used)))
    }
}

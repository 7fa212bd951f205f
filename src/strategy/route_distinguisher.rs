//! Route distinguisher construction.
//!
//! Nothing is searched here: the caller supplies every component, and the
//! strategy checks that they form one of the three RD types before joining
//! them with a colon.
//!
//! | type | administrator  | assigned number |
//! |------|----------------|-----------------|
//! | 0    | 2-byte AS      | 4-byte          |
//! | 1    | IPv4 address   | 2-byte          |
//! | 2    | 4-byte AS      | 2-byte          |

use std::collections::HashSet;

use log::debug;
use serde_json::Value;

use super::{resource_str, AllocationError, Strategy};
use crate::ip::{format_ipv4, parse_ipv4};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::properties::value_as_u128;
use crate::utils::{Count, Properties};

const BYTE_2_MAX: u64 = u16::MAX as u64;
const BYTE_4_MAX: u64 = u32::MAX as u64;

/// Administrator half of an RD.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Administrator {
    As(u64),
    Ipv4(u32),
}

/// Read a 1..=2^32-1 number; 0 counts as out of range.
fn four_byte_number(value: &Value, field: &str) -> Result<u64, AllocationError> {
    value_as_u128(value)
        .and_then(|n| u64::try_from(n).ok())
        .filter(|n| (1..=BYTE_4_MAX).contains(n))
        .ok_or_else(|| {
            AllocationError::InvalidRequest(format!("{} {} is not a number in 1-{}", field, value, BYTE_4_MAX))
        })
}

#[derive(Debug, Clone, Default)]
pub struct RouteDistinguisherStrategy;

impl RouteDistinguisherStrategy {
    pub fn new() -> Self {
        RouteDistinguisherStrategy
    }

    /// RD pools carry no configuration of their own.
    pub fn from_properties(_properties: &Properties) -> Result<Self, AllocationError> {
        Ok(RouteDistinguisherStrategy)
    }

    /// Validate the request and build the RD text.
    pub fn compose(request: &AllocationRequest) -> Result<String, AllocationError> {
        let assigned = request
            .assigned_number
            .as_ref()
            .map(|value| four_byte_number(value, "assignedNumber"))
            .transpose()?;
        let as_number = request
            .as_number
            .as_ref()
            .map(|value| four_byte_number(value, "asNumber"))
            .transpose()?;
        let ipv4 = match &request.ipv4 {
            None => None,
            Some(Value::String(text)) => Some(parse_ipv4(text).map_err(AllocationError::request)?),
            Some(other) => {
                return Err(AllocationError::InvalidRequest(format!(
                    "ipv4 {} is not an address",
                    other
                )))
            }
        };

        let administrator = match (as_number, ipv4) {
            (Some(_), Some(_)) => {
                return Err(AllocationError::InvalidRequest(
                    "asNumber and ipv4 are mutually exclusive".to_string(),
                ))
            }
            (Some(as_number), None) => Administrator::As(as_number),
            (None, Some(ip)) => Administrator::Ipv4(ip),
            (None, None) => {
                return Err(AllocationError::InvalidRequest(
                    "one of asNumber or ipv4 is required".to_string(),
                ))
            }
        };
        let assigned = assigned.ok_or_else(|| {
            AllocationError::InvalidRequest("assignedNumber is required".to_string())
        })?;

        let two_byte_assigned = assigned <= BYTE_2_MAX;
        match administrator {
            Administrator::As(as_number) if as_number <= BYTE_2_MAX || two_byte_assigned => {
                Ok(format!("{}:{}", as_number, assigned))
            }
            Administrator::As(as_number) => Err(AllocationError::InvalidRequest(format!(
                "4 byte AS {} cannot be combined with 4 byte assigned number {}",
                as_number, assigned
            ))),
            Administrator::Ipv4(ip) if two_byte_assigned => Ok(format!("{}:{}", format_ipv4(ip), assigned)),
            Administrator::Ipv4(ip) => Err(AllocationError::InvalidRequest(format!(
                "4 byte assigned number {} cannot be combined with IPv4 {}",
                assigned,
                format_ipv4(ip)
            ))),
        }
    }

    fn allocated<'a>(resources: &'a [AllocatedResource]) -> Result<HashSet<&'a str>, AllocationError> {
        resources.iter().map(|resource| resource_str(resource, "rd")).collect()
    }
}

impl Strategy for RouteDistinguisherStrategy {
    fn name(&self) -> &'static str {
        "route_distinguisher"
    }

    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError> {
        let rd = Self::compose(request)?;
        if Self::allocated(resources)?.contains(rd.as_str()) {
            return Err(AllocationError::AlreadyAllocated(format!("RD {} is already allocated", rd)));
        }
        debug!("Allocated RD {}", rd);

        let mut properties = Properties::new();
        properties.insert("rd".to_string(), Value::from(rd));
        Ok(AllocationResult::Single(properties))
    }

    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError> {
        // six bytes of administrator plus assigned number
        let total = Count::pow2(48).unwrap_or(Count::MAX);
        let utilized = Count::from(Self::allocated(resources)?.len());
        Ok(Capacity::from_total(total, utilized))
    }
}

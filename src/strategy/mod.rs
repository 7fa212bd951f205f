//! Allocation strategies.
//!
//! A strategy is built once from a pool's properties, then answers two
//! questions against a snapshot of allocated resources: what to allocate
//! next, and how much of the pool is used. Strategies hold no mutable state,
//! so a single instance can serve concurrent callers.

pub mod address;
pub mod point;
pub mod prefix;
pub mod range;
pub mod route_distinguisher;
pub mod unique_id;

use std::fmt;

use serde::Serialize;

use crate::ip::CodecError;
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::utils::properties::{get_i64, get_str, get_u128};

pub use address::AddressStrategy;
pub use point::{RandomInt32Strategy, VlanStrategy};
pub use prefix::PrefixStrategy;
pub use range::VlanRangeStrategy;
pub use route_distinguisher::RouteDistinguisherStrategy;
pub use unique_id::UniqueIdStrategy;

/// Why an allocation or capacity computation produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("Invalid pool configuration: {0}")]
    MalformedConfig(String),

    #[error("Malformed allocated resource: {0}")]
    MalformedResource(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Already allocated: {0}")]
    AlreadyAllocated(String),

    #[error("Insufficient capacity: {0}")]
    InsufficientCapacity(String),

    #[error("Inconsistent snapshot: {0}")]
    SnapshotInconsistent(String),

    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),
}

impl AllocationError {
    pub fn reason(&self) -> ReasonCode {
        match self {
            AllocationError::MalformedConfig(_)
            | AllocationError::MalformedResource(_)
            | AllocationError::SnapshotInconsistent(_)
            | AllocationError::UnknownResourceType(_) => ReasonCode::MalformedConfig,
            AllocationError::InvalidRequest(_) | AllocationError::AlreadyAllocated(_) => {
                ReasonCode::InvalidRequest
            }
            AllocationError::InsufficientCapacity(_) => ReasonCode::InsufficientCapacity,
        }
    }

    /// Wrap a codec failure on pool properties.
    pub fn config(err: CodecError) -> Self {
        AllocationError::MalformedConfig(err.to_string())
    }

    /// Wrap a codec failure on request parameters.
    pub fn request(err: CodecError) -> Self {
        AllocationError::InvalidRequest(err.to_string())
    }
}

/// Coarse failure class reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    MalformedConfig,
    InvalidRequest,
    InsufficientCapacity,
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            ReasonCode::MalformedConfig => "malformed_config",
            ReasonCode::InvalidRequest => "invalid_request",
            ReasonCode::InsufficientCapacity => "insufficient_capacity",
        };
        f.write_str(code)
    }
}

/// The two operations every pool type supports.
pub trait Strategy: Send + Sync {
    /// Resource-type tag this strategy is registered under.
    fn name(&self) -> &'static str;

    /// Choose the next resource(s) given what is already allocated.
    fn allocate(
        &self,
        resources: &[AllocatedResource],
        request: &AllocationRequest,
    ) -> Result<AllocationResult, AllocationError>;

    /// Utilised and free capacity for the snapshot.
    fn capacity(&self, resources: &[AllocatedResource]) -> Result<Capacity, AllocationError>;
}

// Snapshot accessors. A resource missing the property its strategy wrote is
// reported rather than skipped, since skipping could hand out a used value.

pub(crate) fn resource_str<'a>(
    resource: &'a AllocatedResource,
    key: &str,
) -> Result<&'a str, AllocationError> {
    get_str(&resource.properties, key).ok_or_else(|| missing_property(resource, key))
}

pub(crate) fn resource_u128(resource: &AllocatedResource, key: &str) -> Result<u128, AllocationError> {
    get_u128(&resource.properties, key).ok_or_else(|| missing_property(resource, key))
}

pub(crate) fn resource_i64(resource: &AllocatedResource, key: &str) -> Result<i64, AllocationError> {
    get_i64(&resource.properties, key).ok_or_else(|| missing_property(resource, key))
}

fn missing_property(resource: &AllocatedResource, key: &str) -> AllocationError {
    AllocationError::MalformedResource(format!(
        "property {} missing or mistyped in {}",
        key,
        serde_json::Value::Object(resource.properties.clone())
    ))
}

//! # Strategy Registry
//!
//! Maps resource-type tags to strategy builders and runs the two pool
//! operations on behalf of the host.
//!
//! ## Built-in Resource Types
//!
//! | tag                   | pool properties                   | result            |
//! |-----------------------|-----------------------------------|-------------------|
//! | `ipv4_prefix`         | `address`, `prefix`, `subnet?`    | `address, prefix, subnet` |
//! | `ipv6_prefix`         | `address`, `prefix`, `subnet?`    | `address, prefix, subnet` |
//! | `ipv4`                | `address`, `prefix`, `subnet?`    | `address`         |
//! | `ipv6`                | `address`, `prefix`, `subnet?`    | `address`         |
//! | `vlan_range`          | `from`, `to`                      | `from, to`        |
//! | `vlan`                | `from`, `to`                      | `vlan`            |
//! | `random_signed_int32` | `from`, `to`                      | `int`             |
//! | `route_distinguisher` | none                              | `rd`              |
//! | `unique_id`           | `idFormat`, `from?`, `to?`, ...   | `text, counter`   |
//!
//! ## Call Flow
//!
//! 1. **Build**: the pool properties are validated into a typed strategy
//! 2. **Run**: allocate or capacity against the supplied snapshot
//! 3. **Report**: on failure, the current capacity is attached to the
//!    returned [`AllocationFailure`] and logged
//!
//! Strategies are rebuilt on every call. Nothing survives between calls, so
//! the host is free to serve one registry from many threads.

use std::collections::HashMap;
use std::fmt;

use log::debug;

use crate::diagnostics::{report_failure, AllocationFailure};
use crate::ip::{Ipv4, Ipv6};
use crate::resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
use crate::strategy::{
    AddressStrategy, AllocationError, PrefixStrategy, RandomInt32Strategy, RouteDistinguisherStrategy,
    Strategy, UniqueIdStrategy, VlanRangeStrategy, VlanStrategy,
};
use crate::utils::Properties;

/// Builds a strategy from a pool's properties.
pub type StrategyBuilder = fn(&Properties) -> Result<Box<dyn Strategy>, AllocationError>;

fn boxed<S: Strategy + 'static>(strategy: S) -> Box<dyn Strategy> {
    Box::new(strategy)
}

#[derive(Clone, Default)]
pub struct StrategyRegistry {
    builders: HashMap<String, StrategyBuilder>,
}

impl fmt::Debug for StrategyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyRegistry").field("tags", &self.tags()).finish()
    }
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        StrategyRegistry::default()
    }

    /// A registry with every built-in resource type.
    pub fn with_builtin() -> Self {
        let mut registry = StrategyRegistry::new();
        registry.register("ipv4_prefix", |p| PrefixStrategy::<Ipv4>::from_properties(p).map(boxed));
        registry.register("ipv6_prefix", |p| PrefixStrategy::<Ipv6>::from_properties(p).map(boxed));
        registry.register("ipv4", |p| AddressStrategy::<Ipv4>::from_properties(p).map(boxed));
        registry.register("ipv6", |p| AddressStrategy::<Ipv6>::from_properties(p).map(boxed));
        registry.register("vlan_range", |p| VlanRangeStrategy::from_properties(p).map(boxed));
        registry.register("vlan", |p| VlanStrategy::from_properties(p).map(boxed));
        registry.register("random_signed_int32", |p| RandomInt32Strategy::from_properties(p).map(boxed));
        registry.register("route_distinguisher", |p| {
            RouteDistinguisherStrategy::from_properties(p).map(boxed)
        });
        registry.register("unique_id", |p| UniqueIdStrategy::from_properties(p).map(boxed));
        registry
    }

    /// Register a builder, returning the one it replaced.
    pub fn register(&mut self, tag: &str, builder: StrategyBuilder) -> Option<StrategyBuilder> {
        self.builders.insert(tag.to_string(), builder)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.builders.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build the strategy for a pool.
    pub fn build(&self, tag: &str, pool: &Properties) -> Result<Box<dyn Strategy>, AllocationError> {
        let builder = self
            .builders
            .get(tag)
            .ok_or_else(|| AllocationError::UnknownResourceType(tag.to_string()))?;
        builder(pool)
    }

    /// Allocate from a pool. Failures carry the pool's current capacity when
    /// it can be computed.
    pub fn allocate(
        &self,
        tag: &str,
        pool: &Properties,
        resources: &[AllocatedResource],
        request: &Properties,
    ) -> Result<AllocationResult, AllocationFailure> {
        let strategy = match self.build(tag, pool) {
            Ok(strategy) => strategy,
            Err(error) => return Err(self.fail(tag, error, None)),
        };
        let outcome = AllocationRequest::from_properties(Some(request))
            .and_then(|request| strategy.allocate(resources, &request));
        match outcome {
            Ok(result) => {
                debug!("{} allocation succeeded", strategy.name());
                Ok(result)
            }
            Err(error) => Err(self.fail(tag, error, strategy.capacity(resources).ok())),
        }
    }

    /// Utilised and free capacity of a pool.
    pub fn capacity(
        &self,
        tag: &str,
        pool: &Properties,
        resources: &[AllocatedResource],
    ) -> Result<Capacity, AllocationFailure> {
        self.build(tag, pool)
            .and_then(|strategy| strategy.capacity(resources))
            .map_err(|error| self.fail(tag, error, None))
    }

    fn fail(&self, tag: &str, error: AllocationError, utilization: Option<Capacity>) -> AllocationFailure {
        let failure = AllocationFailure::new(error, utilization);
        report_failure(tag, &failure);
        failure
    }
}

//! # Poolstrat - Allocation strategies for resource pools
//!
//! This library computes the next resource to hand out from a pool, and the
//! pool's utilised and free capacity, for IP address management and network
//! provisioning services.
//!
//! ## Overview
//!
//! Every call is a pure function of three inputs: the pool's properties, the
//! resources already allocated from it, and the request. The library keeps no
//! state between calls and performs no I/O. Persisting pools, serializing
//! concurrent claims on one pool and committing results are left to the host.
//!
//! ## Key Features
//!
//! - **Prefix Allocation**: Best-fit IPv4/IPv6 CIDR blocks aligned on their own mask
//! - **Address Allocation**: Sequential host addresses, in bulk or one at a time
//! - **Integer Pools**: VLAN ranges, VLAN ids and random signed 32-bit integers
//! - **Identifiers**: Route distinguishers and template-rendered unique ids
//! - **Exact Capacity**: Counts up to 2^128 without floating point
//!
//! ## Architecture
//!
//! - `ip`: IPv4/IPv6 text codecs and CIDR prefixes
//! - `utils`: Exact counts, interval arithmetic and property map helpers
//! - `config`: Typed pool configuration parsed from property maps
//! - `resource`: Snapshot, request, result and capacity types
//! - `strategy`: The `Strategy` trait and one implementation per resource type
//! - `registry`: Dispatch by resource-type tag
//! - `diagnostics`: Failure values and utilisation logging
//! - `config_loader`: Invocation files for the `poolstrat` binary
//!
//! ## Example Usage
//!
//! ```rust
//! use poolstrat::registry::StrategyRegistry;
//! use serde_json::json;
//!
//! let registry = StrategyRegistry::with_builtin();
//! let pool = json!({"address": "192.168.1.0", "prefix": 24});
//! let request = json!({"desiredSize": 10});
//!
//! let result = registry
//!     .allocate(
//!         "ipv4_prefix",
//!         pool.as_object().unwrap(),
//!         &[],
//!         request.as_object().unwrap(),
//!     )
//!     .unwrap();
//! assert_eq!(
//!     serde_json::to_value(result).unwrap(),
//!     json!({"address": "192.168.1.0", "prefix": 28, "subnet": false})
//! );
//! ```
//!
//! ## Error Handling
//!
//! Strategies return `AllocationError` (via `thiserror`); the registry wraps
//! it into an `AllocationFailure` carrying the pool's capacity at the time of
//! the call. The binary reports I/O and parse problems with `color_eyre`.

pub mod config;
pub mod config_loader;
pub mod diagnostics;
pub mod ip;
pub mod registry;
pub mod resource;
pub mod strategy;
pub mod utils;

pub use diagnostics::AllocationFailure;
pub use registry::StrategyRegistry;
pub use resource::{AllocatedResource, AllocationRequest, AllocationResult, Capacity};
pub use strategy::{AllocationError, ReasonCode, Strategy};
pub use utils::Count;

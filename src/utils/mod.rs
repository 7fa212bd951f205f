//! Shared utilities: exact counts, interval arithmetic, property map access.

pub mod count;
pub mod interval;
pub mod properties;

pub use count::Count;
pub use interval::{compare_by_end, find_gap, Interval};
pub use properties::Properties;

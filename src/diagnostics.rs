//! Failure reporting.
//!
//! A failed allocation carries the typed error plus, when it could be
//! computed, the pool's capacity at the time of the call. The capacity is
//! side information for operators and never changes the outcome.

use std::fmt;

use log::{debug, error};
use serde::Serialize;

use crate::resource::Capacity;
use crate::strategy::{AllocationError, ReasonCode};

/// Definitive "no allocation" outcome returned at the host boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationFailure {
    pub error: AllocationError,
    pub utilization: Option<Capacity>,
}

impl AllocationFailure {
    pub fn new(error: AllocationError, utilization: Option<Capacity>) -> Self {
        AllocationFailure { error, utilization }
    }

    pub fn reason(&self) -> ReasonCode {
        self.error.reason()
    }
}

impl fmt::Display for AllocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.error, self.reason())
    }
}

impl std::error::Error for AllocationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<AllocationError> for AllocationFailure {
    fn from(error: AllocationError) -> Self {
        AllocationFailure::new(error, None)
    }
}

/// Serializable summary of a failure, for structured logs.
#[derive(Debug, Clone, Serialize)]
pub struct FailureReport {
    pub reason: ReasonCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utilization: Option<Capacity>,
}

impl From<&AllocationFailure> for FailureReport {
    fn from(failure: &AllocationFailure) -> Self {
        FailureReport {
            reason: failure.reason(),
            message: failure.error.to_string(),
            utilization: failure.utilization,
        }
    }
}

/// Utilisation percentage with one decimal; a pool with nothing free is 100%.
pub fn utilisation_percent(capacity: &Capacity) -> String {
    if capacity.free.is_zero() {
        return "100.0".to_string();
    }
    match capacity.total() {
        Some(total) => format!("{:.1}", capacity.utilized.percent_of(total)),
        None => "100.0".to_string(),
    }
}

/// Log a failed allocation for operator visibility.
pub fn report_failure(resource_type: &str, failure: &AllocationFailure) {
    error!(
        "Unable to allocate {} [{}]: {}",
        resource_type,
        failure.reason(),
        failure.error
    );
    if let Some(capacity) = &failure.utilization {
        error!("Remaining capacity: {}", capacity.free);
        error!("Utilised capacity: {}", capacity.utilized);
        error!("Utilisation: {}%", utilisation_percent(capacity));
    }
    if let Ok(report) = serde_json::to_string(&FailureReport::from(failure)) {
        debug!("Failure report for {}: {}", resource_type, report);
    }
}

//! Loading of invocation files for the command line tool.
//!
//! An invocation bundles everything one allocate or capacity call needs:
//!
//! ```yaml
//! resourceType: ipv4_prefix
//! poolProperties:
//!   address: 10.0.0.0
//!   prefix: 8
//! resources:
//!   - properties: {address: 10.0.0.0, prefix: 24}
//! request:
//!   desiredSize: 256
//! ```
//!
//! JSON is accepted too, being a subset of YAML.

use color_eyre::eyre::{bail, WrapErr};
use color_eyre::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

use crate::resource::AllocatedResource;
use crate::utils::Properties;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub resource_type: String,

    #[serde(default)]
    pub pool_properties: Properties,

    #[serde(default)]
    pub resources: Vec<AllocatedResource>,

    #[serde(default)]
    pub request: Properties,
}

/// Load and parse an invocation from a YAML or JSON file
pub fn load_invocation(path: &Path) -> Result<Invocation> {
    info!("Loading invocation from: {:?}", path);

    let file = File::open(path).wrap_err_with(|| format!("Unable to open {:?}", path))?;
    let invocation: Invocation =
        serde_yaml::from_reader(file).wrap_err_with(|| format!("Unable to parse {:?}", path))?;

    if invocation.resource_type.trim().is_empty() {
        bail!("resourceType cannot be empty");
    }
    info!(
        "Loaded {} invocation with {} allocated resources",
        invocation.resource_type,
        invocation.resources.len()
    );

    Ok(invocation)
}

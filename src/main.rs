use clap::Parser;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::info;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;

use poolstrat::config_loader::{self, Invocation};
use poolstrat::registry::StrategyRegistry;

/// Run a resource-pool allocation strategy against a pool snapshot
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the invocation file (YAML or JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Report utilised and free capacity instead of allocating
    #[arg(long)]
    capacity: bool,

    /// Log filter, e.g. "debug" or "poolstrat=info" (overrides RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

/// Run one invocation. `None` means the pool produced no allocation.
fn execute(registry: &StrategyRegistry, invocation: &Invocation, capacity: bool) -> Result<Option<Value>> {
    let tag = invocation.resource_type.as_str();
    let value = if capacity {
        match registry.capacity(tag, &invocation.pool_properties, &invocation.resources) {
            Ok(capacity) => Some(serde_json::to_value(capacity)?),
            Err(_) => None,
        }
    } else {
        match registry.allocate(
            tag,
            &invocation.pool_properties,
            &invocation.resources,
            &invocation.request,
        ) {
            Ok(result) => Some(serde_json::to_value(result)?),
            Err(_) => None,
        }
    };
    Ok(value)
}

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    // Failures are logged at error level; keep the default quiet otherwise
    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if let Some(level) = &args.log_level {
        logger.parse_filters(level);
    }
    logger.init();

    let invocation = config_loader::load_invocation(&args.input)
        .wrap_err_with(|| format!("Failed to load invocation '{}'", args.input.display()))?;
    let registry = StrategyRegistry::with_builtin();

    match execute(&registry, &invocation, args.capacity)? {
        Some(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            info!("{} call completed", invocation.resource_type);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            println!("null");
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn invocation(value: Value) -> Invocation {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["poolstrat", "--input", "pool.yaml"]);
        assert_eq!(args.input, PathBuf::from("pool.yaml"));
        assert!(!args.capacity);
        assert!(args.log_level.is_none());

        let args = Args::parse_from(["poolstrat", "-i", "pool.json", "--capacity", "--log-level", "debug"]);
        assert!(args.capacity);
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_execute_allocate_and_capacity() {
        let registry = StrategyRegistry::with_builtin();
        let call = invocation(json!({
            "resourceType": "vlan_range",
            "poolProperties": {"from": 0, "to": 4095},
            "resources": [{"properties": {"from": 0, "to": 100}}],
            "request": {"desiredSize": 10}
        }));

        let allocated = execute(&registry, &call, false).unwrap();
        assert_eq!(allocated, Some(json!({"from": 101, "to": 110})));

        let capacity = execute(&registry, &call, true).unwrap();
        assert_eq!(
            capacity,
            Some(json!({"utilizedCapacity": "101", "freeCapacity": "3995"}))
        );
    }

    #[test]
    fn test_execute_failure_is_none() {
        let registry = StrategyRegistry::with_builtin();
        let call = invocation(json!({
            "resourceType": "vlan_range",
            "poolProperties": {"from": 0, "to": 10},
            "request": {"desiredSize": 12}
        }));
        assert_eq!(execute(&registry, &call, false).unwrap(), None);
    }
}

//! Configuration validation command
//!
//! Loads a config file through the normal pipeline and reports the
//! resulting signal parameters without starting anything.

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::ConfigLoader;
use crate::error::TrafficLightError;

/// Validate the configuration file named in `args`.
///
/// # Errors
///
/// Returns the loader's `ConfigError` if the file is missing, malformed,
/// or describes an invalid cycle.
pub fn run(args: &ValidateArgs) -> Result<(), TrafficLightError> {
    let config = ConfigLoader::with_defaults().load(&args.config)?;
    let controller = config.controller_config()?;

    match args.format {
        OutputFormat::Human => {
            println!(
                "{}: ok (cycle {}, order {}{})",
                args.config.display(),
                controller.cycle,
                controller.order,
                controller
                    .seed
                    .map_or_else(String::new, |s| format!(", seed {s}"))
            );
        }
        OutputFormat::Json => {
            let report = serde_json::json!({
                "path": args.config.display().to_string(),
                "valid": true,
                "config": config,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

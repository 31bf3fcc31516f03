//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod run;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::{ExitCode, TrafficLightError};

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// Returns the process exit code on success.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<i32, TrafficLightError> {
    match cli.command {
        Commands::Run(args) => run::run(&args, cli.quiet).await,
        Commands::Validate(args) => {
            validate::run(&args)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Version(args) => {
            version::run(&args);
            Ok(ExitCode::SUCCESS)
        }
    }
}

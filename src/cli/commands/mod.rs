//! Command execution coordinating the release pipeline.
//!
//! Every pipeline error surfaces here: the message and its recovery
//! suggestions are printed, and the returned value becomes the process exit
//! code. Nothing deeper in the crate terminates the process.

mod build;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::error::Result;

use build::execute_build;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    let result = match &args.command {
        Command::Build {
            target_dir,
            local_gdal,
            yes,
        } => execute_build(target_dir, *local_gdal, *yes, &config).await,
    };

    match result {
        Ok(()) => Ok(0),
        Err(e) => {
            let output = config.output();
            output.error(&format!(
                "Command '{}' failed: {}",
                args.command.name(),
                e
            ));

            let suggestions = e.recovery_suggestions();
            if !suggestions.is_empty() {
                output.println("\n💡 Recovery suggestions:");
                for suggestion in suggestions {
                    output.indent(&suggestion);
                }
            }

            Ok(1)
        }
    }
}

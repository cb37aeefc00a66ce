//! `rootlet run`: Run a command inside an image's filesystem.

use clap::Args;
use rootlet_common::config::RootletConfig;
use rootlet_common::types::ImageReference;
use rootlet_runtime::pipeline;

use super::stage_error;

/// Arguments for the `run` command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference, e.g. `busybox` or `org/name:tag`.
    pub image: String,

    /// Command to execute inside the image.
    pub command: String,

    /// Arguments passed to the command.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Executes the `run` command.
///
/// On success the process exits with the launched command's exit code.
///
/// # Errors
///
/// Returns an error naming the failing stage if any step before or during
/// launch fails.
pub fn execute(args: RunArgs, config: &RootletConfig) -> anyhow::Result<()> {
    let reference: ImageReference = args.image.parse().map_err(stage_error)?;
    let result =
        pipeline::run_image(config, &reference, &args.command, &args.args).map_err(stage_error)?;

    tracing::debug!(exit_code = result.exit_code, "exiting with command status");
    std::process::exit(result.exit_code);
}

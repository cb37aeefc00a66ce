//! `rootlet pull`: Download an image's layers into the cache.

use clap::Args;
use rootlet_common::config::RootletConfig;
use rootlet_common::types::ImageReference;
use rootlet_runtime::pipeline;

use super::stage_error;

/// Arguments for the `pull` command.
#[derive(Args, Debug)]
pub struct PullArgs {
    /// Image reference, e.g. `busybox` or `org/name:tag`.
    pub image: String,

    /// Re-hash every cached layer against its digest.
    #[arg(long)]
    pub verify: bool,
}

/// Executes the `pull` command.
///
/// Prints one line per layer, in manifest order: digest and cached path.
///
/// # Errors
///
/// Returns an error naming the failing stage.
#[allow(clippy::print_stdout)]
pub fn execute(args: PullArgs, config: &RootletConfig) -> anyhow::Result<()> {
    let reference: ImageReference = args.image.parse().map_err(stage_error)?;
    let layers = pipeline::pull(config, &reference).map_err(stage_error)?;
    if args.verify {
        pipeline::verify_layers(&layers).map_err(stage_error)?;
    }

    for layer in &layers {
        println!("{}\t{}", layer.digest, layer.path.display());
    }
    Ok(())
}

//! The run pipeline.
//!
//! Stages run strictly in sequence and the first error ends the run:
//! token, manifest, layer cache, root assembly, isolation, execution.
//! Nothing touches the local filesystem before the manifest is known, and
//! nothing is isolated before the root is fully assembled.

use std::path::{Path, PathBuf};

use rootlet_common::config::RootletConfig;
use rootlet_common::error::Result;
use rootlet_common::types::{ExecutionResult, ImageReference};
use rootlet_image::hash;
use rootlet_image::registry::RegistryClient;
use rootlet_image::storage::{CachedLayer, LayerCache};

use crate::process;
use crate::rootfs::RootfsBuilder;

/// Resolves `reference` and makes every layer of its manifest available in
/// the cache, returned in manifest order.
///
/// Duplicate digests resolve to the same cached file and are downloaded at
/// most once.
///
/// # Errors
///
/// Returns the first registry or cache error.
pub fn pull(config: &RootletConfig, reference: &ImageReference) -> Result<Vec<CachedLayer>> {
    let client = RegistryClient::new(config.registry.clone())?;
    let token = client.resolve(reference)?;
    let manifest = client.fetch_manifest(reference, &token)?;

    let cache = LayerCache::open(&config.cache_dir)?;
    manifest
        .layers
        .iter()
        .map(|layer| {
            cache.ensure(&layer.digest, |digest| {
                client.fetch_blob(reference, digest, &token)
            })
        })
        .collect()
}

/// Re-hashes the cached blobs of `layers` against their digests.
///
/// Cache hits are otherwise trusted as written; this is the explicit check.
///
/// # Errors
///
/// Returns `RootletError::HashMismatch` for the first corrupt blob.
pub fn verify_layers(layers: &[CachedLayer]) -> Result<()> {
    for layer in layers {
        hash::validate_hash(&layer.path, &layer.digest)?;
        tracing::info!(digest = %layer.digest, "layer verified");
    }
    Ok(())
}

/// Assembles a root from cached layers, ready to be committed.
///
/// `command` is copied from the host when it names a host file; otherwise
/// the image is expected to provide it.
///
/// # Errors
///
/// Returns the first assembly error (`Copy`, `Extract`, `Device`).
pub fn assemble_root(layers: &[CachedLayer], command: &str) -> Result<RootfsBuilder> {
    let archives: Vec<PathBuf> = layers.iter().map(|l| l.path.clone()).collect();
    let executable = Path::new(command);

    let mut builder = RootfsBuilder::new()?;
    if executable.is_file() {
        builder = builder.place_executable(executable)?;
    } else {
        tracing::debug!(command, "command not on host, relying on image");
    }
    builder.extract_layers(&archives)?.create_null_device()
}

/// Runs `command` with `args` inside a root built from `reference`.
///
/// Returns the command's own exit status; a non-zero exit is not an error.
/// The calling process stays inside the new root afterwards.
///
/// # Errors
///
/// Returns the first pipeline error, tagged with its stage.
pub fn run_image(
    config: &RootletConfig,
    reference: &ImageReference,
    command: &str,
    args: &[String],
) -> Result<ExecutionResult> {
    let layers = pull(config, reference)?;
    let isolated = assemble_root(&layers, command)?.commit()?;

    let result = process::run(&isolated, command, args);
    if let Err(e) = isolated.clear() {
        tracing::warn!(error = %e, "failed to clear root contents");
    }
    result
}

//! CLI command definitions and dispatch.

pub mod pull;
pub mod run;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rootlet_common::config::RootletConfig;
use rootlet_common::error::RootletError;

/// rootlet: run a command inside a registry image.
#[derive(Parser, Debug)]
#[command(name = rootlet_common::constants::APP_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true, env = "ROOTLET_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory persisting downloaded layers across runs.
    #[arg(long, global = true, env = "ROOTLET_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Base URL of the registry API.
    #[arg(long, global = true, env = "ROOTLET_REGISTRY")]
    pub registry: Option<String>,

    /// Token endpoint of the registry.
    #[arg(long, global = true, env = "ROOTLET_AUTH_URL")]
    pub auth_url: Option<String>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a command inside an image's filesystem (requires root).
    Run(run::RunArgs),
    /// Download an image's layers into the cache.
    Pull(pull::PullArgs),
}

impl Cli {
    /// Builds the effective configuration: defaults, then the config file,
    /// then command-line and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded.
    pub fn load_config(&self) -> anyhow::Result<RootletConfig> {
        let mut config = match &self.config {
            Some(path) => RootletConfig::from_file(path).map_err(stage_error)?,
            None => RootletConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir.clone_from(dir);
        }
        if let Some(url) = &self.registry {
            config.registry.registry_url.clone_from(url);
        }
        if let Some(url) = &self.auth_url {
            config.registry.auth_url.clone_from(url);
        }
        tracing::debug!(?config, "effective configuration");
        Ok(config)
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.load_config()?;
    match cli.command {
        Command::Run(args) => run::execute(args, &config),
        Command::Pull(args) => pull::execute(args, &config),
    }
}

/// Renders a pipeline error with the stage it failed in.
pub fn stage_error(err: RootletError) -> anyhow::Error {
    anyhow::anyhow!("{} stage failed: {err}", err.stage())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args.iter().copied()).expect("arguments should parse")
    }

    #[test]
    fn run_collects_trailing_arguments() {
        let cli = parse(&["rootlet", "run", "busybox", "/bin/ls", "-la", "/etc"]);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.image, "busybox");
        assert_eq!(args.command, "/bin/ls");
        assert_eq!(args.args, vec!["-la", "/etc"]);
    }

    #[test]
    fn run_requires_command() {
        assert!(Cli::try_parse_from(["rootlet", "run", "busybox"]).is_err());
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let file = dir.path().join("rootlet.json");
        std::fs::write(
            &file,
            r#"{"cache_dir": "/from/file", "registry": {"registry_url": "http://file"}}"#,
        )
        .expect("write config");

        let cli = parse(&[
            "rootlet",
            "pull",
            "busybox",
            "--config",
            file.to_str().expect("utf-8 path"),
            "--cache-dir",
            "/from/flag",
        ]);
        let config = cli.load_config().expect("config");
        assert_eq!(config.cache_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.registry.registry_url, "http://file");
        assert_eq!(
            config.registry.auth_url,
            rootlet_common::constants::DEFAULT_AUTH_URL
        );
    }

    #[test]
    fn unreadable_config_file_is_an_error() {
        let cli = parse(&["rootlet", "pull", "busybox", "--config", "/nonexistent/rootlet.json"]);
        assert!(cli.load_config().is_err());
    }

    #[test]
    fn stage_error_names_the_stage() {
        let err = stage_error(RootletError::Isolation {
            message: "chroot denied".into(),
        });
        assert!(err.to_string().starts_with("isolation stage failed"));
    }
}

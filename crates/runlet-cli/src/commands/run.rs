//! Default command: provision an image and run its shell.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Args;
use runlet_common::config::RunConfig;
use runlet_common::constants::{DEFAULT_IMAGE, ROOTFS_DIR_ENV};
use runlet_runtime::engine::Engine;

use crate::output::{self, BOLD, DIM, GREEN, RESET};

/// Arguments for a container run.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Image reference, or `tar://<path>` for a local layer archive.
    #[arg(long, default_value = DEFAULT_IMAGE)]
    pub image: String,

    /// Also isolate user IDs, mapping the caller to root inside.
    #[arg(long)]
    pub userns: bool,

    /// Directory in which the per-run rootfs directory is created.
    #[arg(long, env = ROOTFS_DIR_ENV)]
    pub rootfs_dir: Option<PathBuf>,
}

impl RunArgs {
    /// Builds the run configuration, defaulting the rootfs parent.
    #[must_use]
    pub fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(self.image);
        config.userns = self.userns;
        if let Some(dir) = self.rootfs_dir {
            config.rootfs_parent = dir;
        }
        config
    }
}

/// Provisions the rootfs, runs the container, and exits with its status.
///
/// # Errors
///
/// Returns an error if provisioning or starting the container fails.
pub fn execute(args: RunArgs) -> anyhow::Result<()> {
    let engine = Engine::new(args.into_config());
    let image = engine.config().image.clone();
    output::print_header();

    let start = Instant::now();
    output::step(&format!("Pulling {BOLD}{image}{RESET}"));
    let rootfs = engine
        .provision()
        .with_context(|| format!("failed to provision {image}"))?;
    output::step(&format!(
        "Unpacked {} layer(s), {} entries ({}) in {}",
        rootfs.layers,
        rootfs.stats.entries(),
        output::format_bytes(rootfs.stats.bytes),
        output::format_elapsed(start.elapsed())
    ));
    eprintln!("     {DIM}{}{RESET}", rootfs.path.display());
    eprintln!();
    eprintln!("  {GREEN}{BOLD}Starting shell{RESET} {DIM}(exit to leave){RESET}");
    eprintln!();

    let code = engine
        .launch(&rootfs.path)
        .context("failed to start container")?;
    tracing::debug!(code, "container finished");
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn explicit_rootfs_dir_overrides_default() {
        let args = RunArgs {
            image: "alpine:3.19".into(),
            userns: true,
            rootfs_dir: Some(PathBuf::from("/srv/roots")),
        };
        let config = args.into_config();
        assert_eq!(config.image, "alpine:3.19");
        assert!(config.userns);
        assert_eq!(config.rootfs_parent, Path::new("/srv/roots"));
    }

    #[test]
    fn missing_rootfs_dir_uses_temp_dir() {
        let args = RunArgs {
            image: DEFAULT_IMAGE.into(),
            userns: false,
            rootfs_dir: None,
        };
        assert_eq!(args.into_config().rootfs_parent, std::env::temp_dir());
    }
}

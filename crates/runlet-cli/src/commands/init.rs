//! `runlet __init`: container init, executed inside the new namespaces.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

/// Arguments for the hidden init command.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Root filesystem to enter.
    pub rootfs: PathBuf,
}

/// Sets up the container and replaces this process with its shell.
///
/// # Errors
///
/// Returns an error if any setup step fails; on success it never returns.
pub fn execute(args: &InitArgs) -> anyhow::Result<()> {
    let never = runlet_runtime::init::run_init(&args.rootfs)
        .with_context(|| format!("container init failed in {}", args.rootfs.display()))?;
    match never {}
}

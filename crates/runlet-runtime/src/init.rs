//! Container init: the first code run inside the new namespaces.
//!
//! Sets the hostname, mounts `/proc` into the rootfs, switches root and
//! replaces itself with the interactive shell, which becomes PID 1.

use std::convert::Infallible;
use std::ffi::CString;
use std::path::Path;

use runlet_common::constants::{CONTAINER_HOSTNAME, CONTAINER_SHELL, CONTAINER_SHELL_ARGV};
use runlet_common::error::{Result, RunletError};
use runlet_core::filesystem::{chroot, mount};
use runlet_core::namespace::uts;

/// Prepares the container and executes the shell.
///
/// Only returns on failure; any error leaves the container unusable and
/// should end the process.
///
/// # Errors
///
/// Returns an error if any setup step or the final `execv(2)` fails.
pub fn run_init(rootfs: &Path) -> Result<Infallible> {
    tracing::debug!(rootfs = %rootfs.display(), pid = std::process::id(), "container init");

    uts::set_hostname(CONTAINER_HOSTNAME)?;
    let proc_dir = mount::mount_proc(rootfs)?;
    tracing::debug!(target = %proc_dir.display(), "mounted proc");
    chroot::enter_root(rootfs)?;

    exec_shell()
}

#[cfg(target_os = "linux")]
fn exec_shell() -> Result<Infallible> {
    let (program, argv) = shell_command()?;
    nix::unistd::execv(&program, &argv).map_err(|e| RunletError::NotFound {
        kind: "shell",
        id: format!("{CONTAINER_SHELL} ({e})"),
    })
}

#[cfg(not(target_os = "linux"))]
fn exec_shell() -> Result<Infallible> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

fn shell_command() -> Result<(CString, Vec<CString>)> {
    let nul = |_| RunletError::Config {
        message: "shell command contains a NUL byte".into(),
    };
    let program = CString::new(CONTAINER_SHELL).map_err(nul)?;
    let argv = CONTAINER_SHELL_ARGV
        .iter()
        .map(|arg| CString::new(*arg).map_err(nul))
        .collect::<Result<Vec<_>>>()?;
    Ok((program, argv))
}

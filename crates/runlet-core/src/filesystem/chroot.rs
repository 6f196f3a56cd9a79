//! Root filesystem switching via `chroot(2)`.

use std::path::Path;

use runlet_common::error::{Result, RunletError};

/// Makes `new_root` the caller's filesystem root and moves into it.
///
/// After this returns, nothing outside `new_root` is reachable by path from
/// the caller or its descendants.
///
/// # Errors
///
/// Returns an error if `chroot(2)` or `chdir(2)` fails.
#[cfg(target_os = "linux")]
pub fn enter_root(new_root: &Path) -> Result<()> {
    nix::unistd::chroot(new_root).map_err(|e| RunletError::PermissionDenied {
        message: format!("chroot({}) failed: {e}", new_root.display()),
    })?;
    nix::unistd::chdir("/").map_err(|e| RunletError::Io {
        path: "/".into(),
        source: e.into(),
    })?;
    tracing::debug!(new_root = %new_root.display(), "entered new root");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because root switching requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn enter_root(_new_root: &Path) -> Result<()> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

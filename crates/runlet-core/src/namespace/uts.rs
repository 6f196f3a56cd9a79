//! UTS namespace isolation.
//!
//! Allows the container to have its own hostname.

use runlet_common::error::{Result, RunletError};

/// Sets the hostname inside the caller's UTS namespace.
///
/// # Errors
///
/// Returns an error if `sethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn set_hostname(hostname: &str) -> Result<()> {
    nix::unistd::sethostname(hostname).map_err(|e| RunletError::Namespace {
        message: format!("sethostname({hostname}) failed: {e}"),
    })?;
    tracing::debug!(hostname, "container hostname set");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because UTS namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn set_hostname(_hostname: &str) -> Result<()> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Returns the hostname visible to the caller.
///
/// # Errors
///
/// Returns an error if `gethostname(2)` fails.
#[cfg(target_os = "linux")]
pub fn hostname() -> Result<String> {
    let name = nix::unistd::gethostname().map_err(|e| RunletError::Namespace {
        message: format!("gethostname failed: {e}"),
    })?;
    Ok(name.to_string_lossy().into_owned())
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;

    #[test]
    fn hostname_is_readable() {
        assert!(!hostname().unwrap().is_empty());
    }
}

//! Mount utilities for container filesystem setup.
//!
//! Handles private mount propagation and mounting `/proc` inside the
//! container's mount namespace.

use std::path::{Path, PathBuf};

use runlet_common::error::{Result, RunletError};

/// Remounts `/` recursively as private.
///
/// Must run in a fresh mount namespace before anything else is mounted, so
/// that no mount or unmount crosses between the container and the host.
///
/// # Errors
///
/// Returns an error if the `mount(2)` syscall fails.
#[cfg(target_os = "linux")]
pub fn make_mounts_private() -> Result<()> {
    use nix::mount::{MsFlags, mount};

    mount(
        None::<&str>,
        "/",
        None::<&str>,
        MsFlags::MS_REC | MsFlags::MS_PRIVATE,
        None::<&str>,
    )
    .map_err(|e| RunletError::PermissionDenied {
        message: format!("making / private failed: {e}"),
    })?;
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because mount namespaces require Linux.
#[cfg(not(target_os = "linux"))]
pub fn make_mounts_private() -> Result<()> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Mounts a fresh `proc` filesystem at `<rootfs>/proc`.
///
/// The mount point is created if absent. Set-UID binaries, execution and
/// device nodes are disabled on the mount. The target is addressed through
/// the old root, so this has to happen before the root change.
///
/// # Errors
///
/// Returns an error if the mount point is not a real directory, cannot be
/// created, or `mount(2)` fails.
#[cfg(target_os = "linux")]
pub fn mount_proc(rootfs: &Path) -> Result<PathBuf> {
    use nix::mount::{MsFlags, mount};

    let target = proc_mount_point(rootfs)?;

    mount(
        Some("proc"),
        &target,
        Some("proc"),
        MsFlags::MS_NOSUID | MsFlags::MS_NOEXEC | MsFlags::MS_NODEV,
        None::<&str>,
    )
    .map_err(|e| RunletError::PermissionDenied {
        message: format!("mounting proc at {} failed: {e}", target.display()),
    })?;

    tracing::debug!(target = %target.display(), "proc mounted");
    Ok(target)
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because `proc` mounts require Linux.
#[cfg(not(target_os = "linux"))]
pub fn mount_proc(_rootfs: &Path) -> Result<PathBuf> {
    Err(RunletError::Config {
        message: "Linux required for native container operations".into(),
    })
}

/// Returns `<rootfs>/proc`, creating it if absent.
///
/// An existing entry must be a directory itself, not a symlink to one.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn proc_mount_point(rootfs: &Path) -> Result<PathBuf> {
    use std::os::unix::fs::DirBuilderExt;

    let target = rootfs.join("proc");
    match std::fs::symlink_metadata(&target) {
        Ok(meta) if meta.file_type().is_dir() => Ok(target),
        Ok(_) => Err(RunletError::Io {
            path: target,
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "proc exists but is not a directory",
            ),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::DirBuilder::new()
                .mode(runlet_common::constants::IMPLICIT_DIR_MODE)
                .create(&target)
                .map_err(|e| RunletError::Io {
                    path: target.clone(),
                    source: e,
                })?;
            Ok(target)
        }
        Err(e) => Err(RunletError::Io {
            path: target,
            source: e,
        }),
    }
}

/// Reports whether `target` appears as a mount point in `mountinfo`.
///
/// `mountinfo` is the content of a `/proc/<pid>/mountinfo` file; the fifth
/// field of every line is the mount point.
#[must_use]
pub fn is_mount_point(mountinfo: &str, target: &Path) -> bool {
    mountinfo
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .any(|mount_point| Path::new(&unescape_mountinfo(mount_point)) == target)
}

/// Decodes the octal escapes (`\040` etc.) the kernel uses in `mountinfo`.
fn unescape_mountinfo(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = std::str::from_utf8(&bytes[i + 1..i + 4]).unwrap_or("");
            if let Ok(value) = u8::from_str_radix(digits, 8) {
                out.push(value);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

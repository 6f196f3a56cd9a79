//! User namespace isolation.
//!
//! Maps the invoking host UID/GID to root inside the container, enabling
//! rootless runs.

use std::fmt;

use runlet_common::error::{Result, RunletError};

/// One contiguous range of a `uid_map` or `gid_map` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMapping {
    /// First ID inside the namespace.
    pub container_id: u32,
    /// First ID on the host.
    pub host_id: u32,
    /// Number of IDs in the range.
    pub size: u32,
}

impl IdMapping {
    /// Maps a single host ID to root inside the namespace.
    #[must_use]
    pub const fn root_for(host_id: u32) -> Self {
        Self {
            container_id: 0,
            host_id,
            size: 1,
        }
    }
}

impl fmt::Display for IdMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.container_id, self.host_id, self.size)
    }
}

/// The UID and GID maps attached to a new user namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdMappings {
    /// Content of `uid_map`.
    pub uid: IdMapping,
    /// Content of `gid_map`.
    pub gid: IdMapping,
}

impl IdMappings {
    /// Decides the mappings for a run.
    ///
    /// Returns `None` unless a user namespace is requested by a caller that
    /// is not already host root; root keeps full rights without a map.
    #[must_use]
    pub const fn for_caller(userns: bool, uid: u32, gid: u32) -> Option<Self> {
        if !userns || uid == 0 {
            return None;
        }
        Some(Self {
            uid: IdMapping::root_for(uid),
            gid: IdMapping::root_for(gid),
        })
    }

    /// Decides the mappings for the current process's real UID and GID.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn for_current_user(userns: bool) -> Option<Self> {
        let uid = nix::unistd::getuid().as_raw();
        let gid = nix::unistd::getgid().as_raw();
        Self::for_caller(userns, uid, gid)
    }
}

/// Writes the UID/GID maps of the process `pid`.
///
/// `setgroups` is denied first, which unprivileged writers need before the
/// kernel accepts a `gid_map`.
///
/// # Errors
///
/// Returns an error if writing to `/proc/[pid]/setgroups`,
/// `/proc/[pid]/uid_map`, or `/proc/[pid]/gid_map` fails.
#[cfg(target_os = "linux")]
pub fn write_id_mappings(pid: i32, mappings: &IdMappings) -> Result<()> {
    use std::fs;
    use std::path::PathBuf;

    let proc_dir = PathBuf::from(format!("/proc/{pid}"));

    let setgroups_path = proc_dir.join("setgroups");
    if setgroups_path.exists() {
        fs::write(&setgroups_path, "deny").map_err(|e| RunletError::Io {
            path: setgroups_path.clone(),
            source: e,
        })?;
    }

    let uid_map_path = proc_dir.join("uid_map");
    fs::write(&uid_map_path, mappings.uid.to_string()).map_err(|e| RunletError::Io {
        path: uid_map_path.clone(),
        source: e,
    })?;

    let gid_map_path = proc_dir.join("gid_map");
    fs::write(&gid_map_path, mappings.gid.to_string()).map_err(|e| RunletError::Io {
        path: gid_map_path.clone(),
        source: e,
    })?;

    tracing::debug!(pid, uid_map = %mappings.uid, gid_map = %mappings.gid, "wrote UID/GID map");
    Ok(())
}

/// Stub for non-Linux platforms.
///
/// # Errors
///
/// Always returns an error because UID/GID mapping requires Linux.
#[cfg(not(target_os = "linux"))]
pub fn write_id_mappings(_pid: i32, _mappings: &IdMappings) -> Result<()> {
    Err(RunletError::Config {
        message: "Linux required for user namespaces".into(),
    })
}

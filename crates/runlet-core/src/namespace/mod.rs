//! Linux namespace selection for container isolation.
//!
//! The namespace set is decided once per run and handed to `clone(2)` as a
//! flag mask, so every namespace exists from the child's first instruction.

pub mod user;
pub mod uts;

use std::fmt;

/// The isolation domains requested for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamespaceSet {
    /// Isolate the mount table.
    pub mount: bool,
    /// Isolate hostname and domain name.
    pub uts: bool,
    /// Isolate the process ID space.
    pub pid: bool,
    /// Isolate user and group IDs.
    pub user: bool,
}

impl NamespaceSet {
    /// Returns the set used for a container run.
    ///
    /// Mount, UTS and PID isolation are always on; user isolation only when
    /// `userns` is requested.
    #[must_use]
    pub const fn for_run(userns: bool) -> Self {
        Self {
            mount: true,
            uts: true,
            pid: true,
            user: userns,
        }
    }

    /// Converts the set into the flag mask passed to `clone(2)`.
    #[cfg(target_os = "linux")]
    #[must_use]
    pub fn clone_flags(&self) -> nix::sched::CloneFlags {
        use nix::sched::CloneFlags;

        let mut flags = CloneFlags::empty();
        if self.mount {
            flags |= CloneFlags::CLONE_NEWNS;
        }
        if self.uts {
            flags |= CloneFlags::CLONE_NEWUTS;
        }
        if self.pid {
            flags |= CloneFlags::CLONE_NEWPID;
        }
        if self.user {
            flags |= CloneFlags::CLONE_NEWUSER;
        }
        flags
    }

    /// Short names of the enabled namespaces, in kernel order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        [
            (self.mount, "mnt"),
            (self.uts, "uts"),
            (self.pid, "pid"),
            (self.user, "user"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect()
    }
}

impl fmt::Display for NamespaceSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(","))
    }
}

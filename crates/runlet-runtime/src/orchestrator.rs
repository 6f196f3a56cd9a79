//! Namespace orchestration for a single container run.
//!
//! Decides the isolation set, re-executes the current binary in hidden init
//! mode inside it, and blocks until the container's shell exits.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use runlet_common::constants::INIT_SUBCOMMAND;
use runlet_common::error::{Result, RunletError};
use runlet_core::namespace::NamespaceSet;
use runlet_core::namespace::user::IdMappings;

use crate::process;

/// Everything decided before the child is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    /// Program re-executed in init mode.
    pub program: PathBuf,
    /// Rootfs handed to the init.
    pub rootfs: PathBuf,
    /// Namespaces created with the child.
    pub namespaces: NamespaceSet,
    /// ID maps written for an unprivileged user namespace.
    pub mappings: Option<IdMappings>,
}

impl LaunchPlan {
    /// Builds the plan for `rootfs`, re-executing the running binary.
    ///
    /// # Errors
    ///
    /// Returns an error if the path of the running executable is unknown.
    pub fn for_current_exe(rootfs: &Path, userns: bool) -> Result<Self> {
        let program = std::env::current_exe().map_err(|e| RunletError::Io {
            path: PathBuf::from("/proc/self/exe"),
            source: e,
        })?;
        Ok(Self::new(program, rootfs, userns, current_mappings(userns)))
    }

    /// Builds a plan with explicit inputs.
    #[must_use]
    pub fn new(
        program: PathBuf,
        rootfs: &Path,
        userns: bool,
        mappings: Option<IdMappings>,
    ) -> Self {
        Self {
            program,
            rootfs: rootfs.to_path_buf(),
            namespaces: NamespaceSet::for_run(userns),
            mappings,
        }
    }

    /// Arguments following `argv[0]` for the re-executed binary.
    #[must_use]
    pub fn init_args(&self) -> [&OsStr; 2] {
        [OsStr::new(INIT_SUBCOMMAND), self.rootfs.as_os_str()]
    }
}

/// Launches the container described by `plan` and waits for it.
///
/// Returns the shell's exit code, or `128 + signal` if it was killed.
///
/// # Errors
///
/// Returns an error if the child cannot be created or waited for.
pub fn launch(plan: &LaunchPlan) -> Result<i32> {
    tracing::info!(
        rootfs = %plan.rootfs.display(),
        namespaces = %plan.namespaces,
        id_mapped = plan.mappings.is_some(),
        "spawning container init"
    );

    let child = process::spawn_isolated(
        &plan.program,
        &plan.init_args(),
        plan.namespaces,
        plan.mappings.as_ref(),
    )?;
    process::ignore_interrupts()?;
    tracing::info!(pid = child.pid(), "container started");

    let code = process::wait_for_exit(child)?;
    tracing::info!(pid = child.pid(), code, "container exited");
    if proc_mount_leaked(&plan.rootfs) {
        tracing::warn!(rootfs = %plan.rootfs.display(), "container proc mount is visible on the host");
    }
    Ok(code)
}

/// Checks the host mount table for the container's `/proc` mount.
fn proc_mount_leaked(rootfs: &Path) -> bool {
    let rootfs = rootfs.canonicalize().unwrap_or_else(|_| rootfs.to_path_buf());
    std::fs::read_to_string("/proc/self/mountinfo").is_ok_and(|mountinfo| {
        runlet_core::filesystem::mount::is_mount_point(&mountinfo, &rootfs.join("proc"))
    })
}

#[cfg(target_os = "linux")]
fn current_mappings(userns: bool) -> Option<IdMappings> {
    IdMappings::for_current_user(userns)
}

#[cfg(not(target_os = "linux"))]
const fn current_mappings(_userns: bool) -> Option<IdMappings> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_without_userns_has_no_user_namespace() {
        let plan = LaunchPlan::new("/usr/bin/runlet".into(), Path::new("/tmp/r"), false, None);
        assert_eq!(plan.namespaces.names(), ["mnt", "uts", "pid"]);
        assert!(plan.mappings.is_none());
    }

    #[test]
    fn plan_with_userns_adds_user_namespace() {
        let mappings = IdMappings::for_caller(true, 1000, 1000);
        let plan = LaunchPlan::new("/usr/bin/runlet".into(), Path::new("/tmp/r"), true, mappings);
        assert!(plan.namespaces.user);
        assert_eq!(plan.mappings.map(|m| m.uid.to_string()).as_deref(), Some("0 1000 1"));
    }

    #[test]
    fn init_args_pass_rootfs_to_hidden_subcommand() {
        let plan = LaunchPlan::new(
            "/usr/bin/runlet".into(),
            Path::new("/tmp/rootfs-1"),
            false,
            None,
        );
        assert_eq!(plan.init_args(), [OsStr::new("__init"), OsStr::new("/tmp/rootfs-1")]);
    }

    #[test]
    fn fresh_directory_has_no_proc_mount() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!proc_mount_leaked(dir.path()));
    }

    #[test]
    fn current_exe_plan_points_at_test_binary() {
        let plan = LaunchPlan::for_current_exe(Path::new("/tmp/r"), false).expect("plan");
        assert!(plan.program.is_absolute());
        assert_eq!(plan.rootfs, Path::new("/tmp/r"));
    }
}

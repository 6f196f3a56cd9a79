//! Runtime engine that drives one container run end to end.

use std::path::Path;

use runlet_common::config::RunConfig;
use runlet_common::error::Result;
use runlet_image::source::{self, ImageSource};

use crate::orchestrator::{self, LaunchPlan};
use crate::rootfs::{self, ProvisionedRootfs};

/// The runtime engine that coordinates a run.
///
/// Provisioning and launching are separate steps so callers can report
/// progress in between; [`Engine::run`] chains them.
#[derive(Debug, Clone)]
pub struct Engine {
    config: RunConfig,
}

impl Engine {
    /// Creates an engine for `config`.
    #[must_use]
    pub const fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// The configuration this engine runs.
    #[must_use]
    pub const fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Provisions the rootfs using the source matching the image reference.
    ///
    /// The source, and with it any HTTP client, is dropped before this
    /// returns, so no helper threads outlive provisioning.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be resolved or unpacked.
    pub fn provision(&self) -> Result<ProvisionedRootfs> {
        let source = source::source_for(&self.config.image)?;
        self.provision_with(source.as_ref())
    }

    /// Provisions the rootfs from an explicit source.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be resolved or unpacked.
    pub fn provision_with(&self, source: &dyn ImageSource) -> Result<ProvisionedRootfs> {
        rootfs::provision_rootfs(source, &self.config.image, &self.config.rootfs_parent)
    }

    /// Starts the container on `rootfs` and waits for its shell to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if the child cannot be created or waited for.
    pub fn launch(&self, rootfs: &Path) -> Result<i32> {
        let plan = LaunchPlan::for_current_exe(rootfs, self.config.userns)?;
        orchestrator::launch(&plan)
    }

    /// Provisions and launches in one go, returning the exit code.
    ///
    /// # Errors
    ///
    /// Returns the first provisioning or launch error.
    pub fn run(&self) -> Result<i32> {
        let rootfs = self.provision()?;
        self.launch(&rootfs.path)
    }
}

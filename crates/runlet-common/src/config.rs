//! Run configuration model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything a single container run needs to know up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Image reference to provision the rootfs from.
    pub image: String,
    /// Whether to isolate the user namespace as well.
    pub userns: bool,
    /// Directory under which the per-run rootfs directory is created.
    pub rootfs_parent: PathBuf,
}

impl RunConfig {
    /// Creates a configuration for `image` with every other field defaulted.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            ..Self::default()
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            image: crate::constants::DEFAULT_IMAGE.to_string(),
            userns: false,
            rootfs_parent: crate::constants::default_rootfs_parent(),
        }
    }
}

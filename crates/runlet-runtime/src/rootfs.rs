//! Rootfs provisioning: turns an image reference into a populated directory.

use std::path::{Path, PathBuf};

use runlet_common::constants::ROOTFS_PREFIX;
use runlet_common::error::{Result, RunletError};
use runlet_image::layer::{self, UnpackStats};
use runlet_image::source::ImageSource;

/// A freshly unpacked root filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedRootfs {
    /// Directory holding the merged image.
    pub path: PathBuf,
    /// Number of layers applied.
    pub layers: usize,
    /// Extraction totals across all layers.
    pub stats: UnpackStats,
}

/// Resolves `reference` through `source` and unpacks it into a new
/// `rootfs-<nanos>` directory under `parent`.
///
/// The directory is created only once the layers are known, so a reference
/// that cannot be resolved leaves nothing behind.
///
/// # Errors
///
/// Returns an error if resolution fails, the directory cannot be created,
/// or any layer fails to unpack.
pub fn provision_rootfs(
    source: &dyn ImageSource,
    reference: &str,
    parent: &Path,
) -> Result<ProvisionedRootfs> {
    let layers = source.layers(reference)?;
    let layer_count = layers.len();
    tracing::info!(reference, layers = layer_count, "resolved image");

    let path = create_rootfs_dir(parent)?;
    let stats = layer::unpack_layers(layers, &path)?;
    tracing::info!(
        rootfs = %path.display(),
        entries = stats.entries(),
        bytes = stats.bytes,
        "rootfs provisioned"
    );

    Ok(ProvisionedRootfs {
        path,
        layers: layer_count,
        stats,
    })
}

/// Creates an exclusive, uniquely named rootfs directory under `parent`.
fn create_rootfs_dir(parent: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(parent).map_err(|e| RunletError::Io {
        path: parent.to_path_buf(),
        source: e,
    })?;

    loop {
        let path = parent.join(rootfs_dir_name(chrono::Utc::now()));
        match std::fs::create_dir(&path) {
            Ok(()) => {
                tracing::debug!(rootfs = %path.display(), "created rootfs directory");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(RunletError::Io { path, source: e }),
        }
    }
}

fn rootfs_dir_name(now: chrono::DateTime<chrono::Utc>) -> String {
    let nanos = now.timestamp_nanos_opt().unwrap_or_else(|| now.timestamp_micros() * 1000);
    format!("{ROOTFS_PREFIX}{nanos}")
}

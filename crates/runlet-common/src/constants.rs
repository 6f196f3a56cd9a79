//! System-wide constants and default paths.

use std::path::PathBuf;
use std::time::Duration;

/// Image run when no reference is given on the command line.
pub const DEFAULT_IMAGE: &str = "alpine:latest";

/// Hostname set inside the container's UTS namespace.
pub const CONTAINER_HOSTNAME: &str = "runlet";

/// Shell executed as PID 1 inside the container.
pub const CONTAINER_SHELL: &str = "/bin/sh";

/// `argv` handed to [`CONTAINER_SHELL`]. The first element is `argv[0]`.
pub const CONTAINER_SHELL_ARGV: &[&str] = &["sh", "-i"];

/// Prefix of every per-run rootfs directory name.
pub const ROOTFS_PREFIX: &str = "rootfs-";

/// Environment variable overriding the parent directory of rootfs directories.
pub const ROOTFS_DIR_ENV: &str = "RUNLET_ROOTFS_DIR";

/// Name of the hidden subcommand the orchestrator re-executes itself with.
pub const INIT_SUBCOMMAND: &str = "__init";

/// Scheme selecting the local archive image source.
pub const TAR_SCHEME: &str = "tar://";

/// Registry host used for references without an explicit registry.
pub const DOCKER_HUB_REGISTRY: &str = "registry-1.docker.io";

/// Registry alias rewritten to [`DOCKER_HUB_REGISTRY`].
pub const DOCKER_HUB_ALIAS: &str = "docker.io";

/// Repository namespace for single-segment Docker Hub names.
pub const DOCKER_HUB_LIBRARY: &str = "library";

/// Tag used when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// Maximum accepted length of an image reference, in bytes.
pub const MAX_IMAGE_REF_LEN: usize = 512;

/// Maximum number of layers in an image.
pub const MAX_IMAGE_LAYERS: usize = 128;

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Upper bound on any single registry request.
pub const REGISTRY_TIMEOUT: Duration = Duration::from_secs(300);

/// Stack handed to the cloned child before it re-executes.
pub const CHILD_STACK_SIZE: usize = 1024 * 1024;

/// Mode for parent directories created implicitly during unpacking.
pub const IMPLICIT_DIR_MODE: u32 = 0o755;

/// Application name used in CLI output.
pub const APP_NAME: &str = "runlet";

/// Returns the default parent directory for rootfs directories.
///
/// Honors `TMPDIR` through [`std::env::temp_dir`].
pub fn default_rootfs_parent() -> PathBuf {
    std::env::temp_dir()
}

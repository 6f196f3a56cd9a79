//! Image source protocol handlers.
//!
//! An [`ImageSource`] turns an image reference into the image's layers,
//! bottom layer first. Two sources exist: `tar://<path>` reads one local
//! layer archive, and everything else is pulled from a registry.

use std::path::{Path, PathBuf};

use runlet_common::constants::TAR_SCHEME;
use runlet_common::error::{Result, RunletError};

use crate::layer::LayerStream;

/// Resolves image references into ordered layer streams.
pub trait ImageSource {
    /// Returns the layers of `reference`, bottom layer first.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference cannot be resolved or any layer
    /// cannot be retrieved.
    fn layers(&self, reference: &str) -> Result<Vec<LayerStream>>;
}

/// Source reading a single local tar archive as a one-layer image.
///
/// Archives ending in `.gz` or `.tgz` are gunzipped on the fly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveSource;

impl ImageSource for ArchiveSource {
    fn layers(&self, reference: &str) -> Result<Vec<LayerStream>> {
        let path = PathBuf::from(reference.strip_prefix(TAR_SCHEME).unwrap_or(reference));
        if !path.is_file() {
            return Err(RunletError::NotFound {
                kind: "tar archive",
                id: path.display().to_string(),
            });
        }

        let digest = crate::hash::hash_file(&path)?;
        let file = std::fs::File::open(&path).map_err(|e| RunletError::Io {
            path: path.clone(),
            source: e,
        })?;
        tracing::info!(path = %path.display(), digest = %digest, "resolved tar:// source");

        let stream = if is_gzip_archive(&path) {
            LayerStream::new(digest.to_string(), flate2::read::GzDecoder::new(file))
        } else {
            LayerStream::new(digest.to_string(), file)
        };
        Ok(vec![stream])
    }
}

/// Picks the source that understands `reference`.
///
/// # Errors
///
/// Returns an error if the registry client cannot be constructed.
pub fn source_for(reference: &str) -> Result<Box<dyn ImageSource>> {
    if reference.starts_with(TAR_SCHEME) {
        Ok(Box::new(ArchiveSource))
    } else {
        Ok(Box::new(crate::registry::RegistrySource::new()?))
    }
}

/// Determines whether the archive is gzip-compressed based on extension.
fn is_gzip_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz") || ext.eq_ignore_ascii_case("tgz"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tar(path: &Path, gzip: bool) {
        let file = std::fs::File::create(path).expect("create archive");
        let data = b"hello from layer";
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        if gzip {
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut builder = tar::Builder::new(encoder);
            builder
                .append_data(&mut header, "hello.txt", &data[..])
                .expect("append");
            let encoder = builder.into_inner().expect("finish tar");
            let _ = encoder.finish().expect("finish gzip");
        } else {
            let mut builder = tar::Builder::new(file);
            builder
                .append_data(&mut header, "hello.txt", &data[..])
                .expect("append");
            builder.finish().expect("finish tar");
        }
    }

    fn unpack_one(reference: &str) -> String {
        let dest = tempfile::tempdir().expect("tempdir");
        let layers = ArchiveSource.layers(reference).expect("resolve");
        assert_eq!(layers.len(), 1);
        assert!(layers[0].digest.starts_with("sha256:"));
        crate::layer::unpack_layers(layers, dest.path()).expect("unpack");
        std::fs::read_to_string(dest.path().join("hello.txt")).expect("read")
    }

    #[test]
    fn plain_archive_resolves_to_one_layer() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("layer.tar");
        write_tar(&path, false);
        assert_eq!(unpack_one(&format!("tar://{}", path.display())), "hello from layer");
    }

    #[test]
    fn gzip_archive_is_decompressed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("layer.tar.gz");
        write_tar(&path, true);
        assert_eq!(unpack_one(&format!("tar://{}", path.display())), "hello from layer");
    }

    #[test]
    fn missing_archive_returns_not_found() {
        let err = ArchiveSource
            .layers("tar:///nonexistent/archive.tar")
            .unwrap_err();
        assert!(matches!(err, RunletError::NotFound { .. }));
    }

    #[test]
    fn is_gzip_archive_detects_extensions() {
        assert!(is_gzip_archive(Path::new("layer.tar.gz")));
        assert!(is_gzip_archive(Path::new("layer.tgz")));
        assert!(!is_gzip_archive(Path::new("layer.tar")));
        assert!(!is_gzip_archive(Path::new("layer.zip")));
    }

    #[test]
    fn tar_scheme_selects_archive_source() {
        assert!(source_for("tar:///tmp/layer.tar").is_ok());
    }
}

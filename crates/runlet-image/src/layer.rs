//! Filesystem layer extraction.
//!
//! An image is an ordered list of tar layers. Layers are applied bottom to
//! top onto one destination directory, so a later layer overwrites what an
//! earlier one wrote at the same path. Whiteout entries get no special
//! treatment: `.wh.*` files are extracted like any other file.
//!
//! Every entry path is confined to the destination: `..` components are
//! rejected and a leading `/` is stripped. Symlinks met in parent
//! directories are resolved as if the destination were `/`, so an absolute
//! link such as `var/run -> /run` points back into the destination.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};

use runlet_common::constants::IMPLICIT_DIR_MODE;
use runlet_common::error::{Result, RunletError};
use tar::EntryType;

/// Symlinks followed while resolving a single path before giving up.
const MAX_SYMLINK_HOPS: usize = 40;

const PARENT_STEP: &str = "..";

/// One layer archive, uncompressed, ready to be applied.
pub struct LayerStream {
    /// Digest or other label identifying the layer in logs.
    pub digest: String,
    reader: Box<dyn Read + Send>,
}

impl LayerStream {
    /// Wraps an uncompressed tar stream.
    pub fn new(digest: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        Self {
            digest: digest.into(),
            reader: Box::new(reader),
        }
    }
}

impl std::fmt::Debug for LayerStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerStream")
            .field("digest", &self.digest)
            .finish_non_exhaustive()
    }
}

/// Counts of what an unpack wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnpackStats {
    /// Directory entries applied.
    pub directories: usize,
    /// Regular files written.
    pub files: usize,
    /// Hard links created.
    pub hard_links: usize,
    /// Symbolic links created.
    pub symlinks: usize,
    /// Entries of unsupported kinds that were skipped.
    pub skipped: usize,
    /// Bytes of regular-file content written.
    pub bytes: u64,
}

impl UnpackStats {
    /// Total number of entries seen, skipped ones included.
    #[must_use]
    pub const fn entries(&self) -> usize {
        self.directories + self.files + self.hard_links + self.symlinks + self.skipped
    }

    fn absorb(&mut self, other: Self) {
        self.directories += other.directories;
        self.files += other.files;
        self.hard_links += other.hard_links;
        self.symlinks += other.symlinks;
        self.skipped += other.skipped;
        self.bytes += other.bytes;
    }
}

/// Applies `layers` onto `dest` in order.
///
/// Stops at the first error. Whatever was extracted before the failure stays
/// on disk.
///
/// # Errors
///
/// Returns an error if any layer cannot be read or any entry cannot be
/// created, or if an entry tries to escape `dest`.
pub fn unpack_layers(
    layers: impl IntoIterator<Item = LayerStream>,
    dest: &Path,
) -> Result<UnpackStats> {
    let mut total = UnpackStats::default();
    for (index, layer) in layers.into_iter().enumerate() {
        let stats = unpack_layer(layer.reader, dest)?;
        tracing::info!(
            index,
            digest = %layer.digest,
            entries = stats.entries(),
            bytes = stats.bytes,
            "layer unpacked"
        );
        total.absorb(stats);
    }
    Ok(total)
}

/// Applies a single uncompressed tar stream onto `dest`.
///
/// `dest` must already exist.
///
/// # Errors
///
/// Returns an error if the archive is malformed, an entry cannot be created,
/// or an entry tries to escape `dest`.
pub fn unpack_layer<R: Read>(reader: R, dest: &Path) -> Result<UnpackStats> {
    let root = dest.canonicalize().map_err(|e| RunletError::Io {
        path: dest.to_path_buf(),
        source: e,
    })?;
    let archive_err = |e| RunletError::Io {
        path: dest.to_path_buf(),
        source: e,
    };

    let mut stats = UnpackStats::default();
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries().map_err(archive_err)? {
        let mut entry = entry.map_err(archive_err)?;
        apply_entry(&mut entry, &root, &mut stats)?;
    }
    Ok(stats)
}

fn apply_entry<R: Read>(
    entry: &mut tar::Entry<'_, R>,
    root: &Path,
    stats: &mut UnpackStats,
) -> Result<()> {
    let entry_path = entry
        .path()
        .map_err(|e| RunletError::Io {
            path: root.to_path_buf(),
            source: e,
        })?
        .into_owned();
    let Some(relative) = confine(&entry_path)? else {
        // The archive root itself, usually `./`.
        return Ok(());
    };
    let mode = entry.header().mode().map_err(|e| RunletError::Io {
        path: root.join(&relative),
        source: e,
    })? & 0o7777;

    match entry.header().entry_type() {
        EntryType::Directory => {
            let dir = resolve_in_root(root, &relative, Missing::Create)?;
            set_mode(&dir, mode)?;
            stats.directories += 1;
        }
        EntryType::Regular | EntryType::Continuous => {
            let target = prepare_slot(root, &relative)?;
            stats.bytes += write_file(entry, &target, mode)?;
            stats.files += 1;
        }
        EntryType::Link => {
            let link = link_name(entry, &root.join(&relative))?;
            let Some(link_relative) = confine(&link)? else {
                return Err(RunletError::PathTraversal {
                    path: link.display().to_string(),
                });
            };
            let original = resolve_leaf_parent(root, &link_relative, Missing::Fail)?;
            let target = prepare_slot(root, &relative)?;
            fs::hard_link(&original, &target).map_err(|e| RunletError::Io {
                path: target.clone(),
                source: e,
            })?;
            stats.hard_links += 1;
        }
        EntryType::Symlink => {
            let link = link_name(entry, &root.join(&relative))?;
            let target = prepare_slot(root, &relative)?;
            std::os::unix::fs::symlink(&link, &target).map_err(|e| RunletError::Io {
                path: target.clone(),
                source: e,
            })?;
            stats.symlinks += 1;
        }
        other => {
            tracing::trace!(path = %entry_path.display(), kind = ?other, "skipping entry");
            stats.skipped += 1;
            return Ok(());
        }
    }

    tracing::trace!(path = %relative.display(), mode = format_args!("{mode:o}"), "entry applied");
    Ok(())
}

/// Normalizes an archive path into a path relative to the destination root.
///
/// Returns `None` for paths naming the root itself.
fn confine(path: &Path) -> Result<Option<PathBuf>> {
    let mut relative = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
            Component::ParentDir => {
                return Err(RunletError::PathTraversal {
                    path: path.display().to_string(),
                });
            }
        }
    }
    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}

/// What [`resolve_in_root`] does with a directory that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Missing {
    Create,
    Fail,
}

/// Resolves `relative` as a directory path, treating `root` as `/`.
///
/// Symlinks are followed one component at a time. An absolute target
/// restarts from `root` and `..` never climbs above it, so the returned path
/// always lies beneath `root`, whatever the links inside it say.
fn resolve_in_root(root: &Path, relative: &Path, missing: Missing) -> Result<PathBuf> {
    let mut resolved = PathBuf::new();
    let mut pending: VecDeque<OsString> = steps(relative).collect();
    let mut hops = 0;

    while let Some(step) = pending.pop_front() {
        if step == PARENT_STEP {
            let _ = resolved.pop();
            continue;
        }
        let current = root.join(&resolved).join(&step);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                hops += 1;
                if hops > MAX_SYMLINK_HOPS {
                    return Err(RunletError::Io {
                        path: current,
                        source: io::Error::new(
                            io::ErrorKind::InvalidData,
                            "too many levels of symbolic links",
                        ),
                    });
                }
                let target = fs::read_link(&current).map_err(|e| RunletError::Io {
                    path: current.clone(),
                    source: e,
                })?;
                if target.has_root() {
                    resolved = PathBuf::new();
                }
                let rest = std::mem::take(&mut pending);
                pending.extend(steps(&target));
                pending.extend(rest);
            }
            Ok(meta) if meta.is_dir() => resolved.push(&step),
            Ok(_) => {
                return Err(RunletError::Io {
                    path: current,
                    source: io::Error::from(io::ErrorKind::NotADirectory),
                });
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && missing == Missing::Create => {
                fs::DirBuilder::new()
                    .mode(IMPLICIT_DIR_MODE)
                    .create(&current)
                    .map_err(|e| RunletError::Io {
                        path: current.clone(),
                        source: e,
                    })?;
                set_mode(&current, IMPLICIT_DIR_MODE)?;
                resolved.push(&step);
            }
            Err(e) => {
                return Err(RunletError::Io {
                    path: current,
                    source: e,
                });
            }
        }
    }
    Ok(root.join(resolved))
}

/// Resolves the parent of `relative` inside `root` and rejoins its final
/// component, which is left unresolved.
fn resolve_leaf_parent(root: &Path, relative: &Path, missing: Missing) -> Result<PathBuf> {
    let parent = relative.parent().unwrap_or_else(|| Path::new(""));
    let dir = resolve_in_root(root, parent, missing)?;
    Ok(relative
        .file_name()
        .map_or_else(|| dir.clone(), |name| dir.join(name)))
}

/// Splits a path into names and `..` steps, dropping `.` and the root.
fn steps(path: &Path) -> impl Iterator<Item = OsString> + '_ {
    path.components().filter_map(|component| match component {
        Component::Normal(part) => Some(part.to_os_string()),
        Component::ParentDir => Some(OsString::from(PARENT_STEP)),
        Component::CurDir | Component::RootDir | Component::Prefix(_) => None,
    })
}

/// Makes `root/relative` ready to receive a new non-directory entry and
/// returns where it goes: parents exist and any previous non-directory at
/// the path is gone.
fn prepare_slot(root: &Path, relative: &Path) -> Result<PathBuf> {
    let target = resolve_leaf_parent(root, relative, Missing::Create)?;
    match fs::symlink_metadata(&target) {
        Ok(meta) if meta.is_dir() => Err(RunletError::Io {
            path: target,
            source: io::Error::from(io::ErrorKind::IsADirectory),
        }),
        Ok(_) => {
            fs::remove_file(&target).map_err(|e| RunletError::Io {
                path: target.clone(),
                source: e,
            })?;
            Ok(target)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(target),
        Err(e) => Err(RunletError::Io {
            path: target,
            source: e,
        }),
    }
}

fn write_file<R: Read>(entry: &mut tar::Entry<'_, R>, target: &Path, mode: u32) -> Result<u64> {
    let io_err = |e| RunletError::Io {
        path: target.to_path_buf(),
        source: e,
    };
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(mode)
        .open(target)
        .map_err(io_err)?;
    let written = io::copy(entry, &mut file).map_err(io_err)?;
    // open(2) masks the mode with the umask.
    file.set_permissions(fs::Permissions::from_mode(mode))
        .map_err(io_err)?;
    Ok(written)
}

fn set_mode(path: &Path, mode: u32) -> Result<()> {
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| RunletError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

fn link_name<R: Read>(entry: &tar::Entry<'_, R>, target: &Path) -> Result<PathBuf> {
    let link = entry.link_name().map_err(|e| RunletError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;
    link.map(std::borrow::Cow::into_owned)
        .ok_or_else(|| RunletError::Io {
            path: target.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "link entry without a target"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(kind: EntryType, mode: u32, size: u64) -> tar::Header {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(kind);
        header.set_mode(mode);
        header.set_size(size);
        header
    }

    fn tar_with(build: impl FnOnce(&mut tar::Builder<Vec<u8>>)) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        build(&mut builder);
        builder.into_inner().expect("finish tar")
    }

    fn add_file(builder: &mut tar::Builder<Vec<u8>>, path: &str, mode: u32, data: &[u8]) {
        let mut h = header(EntryType::Regular, mode, data.len() as u64);
        builder.append_data(&mut h, path, data).expect("append file");
    }

    fn add_dir(builder: &mut tar::Builder<Vec<u8>>, path: &str, mode: u32) {
        let mut h = header(EntryType::Directory, mode, 0);
        builder
            .append_data(&mut h, path, io::empty())
            .expect("append dir");
    }

    fn add_link(builder: &mut tar::Builder<Vec<u8>>, kind: EntryType, path: &str, target: &str) {
        let mut h = header(kind, 0o777, 0);
        builder.append_link(&mut h, path, target).expect("append link");
    }

    fn mode_of(path: &Path) -> u32 {
        fs::symlink_metadata(path).expect("stat").permissions().mode() & 0o7777
    }

    #[test]
    fn directories_and_files_keep_declared_modes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_dir(b, "etc/", 0o750);
            add_file(b, "etc/motd", 0o640, b"welcome\n");
            add_file(b, "usr/bin/tool", 0o755, b"#!/bin/sh\n");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");

        assert_eq!(stats.directories, 1);
        assert_eq!(stats.files, 2);
        assert_eq!(mode_of(&dir.path().join("etc")), 0o750);
        assert_eq!(mode_of(&dir.path().join("etc/motd")), 0o640);
        assert_eq!(mode_of(&dir.path().join("usr/bin/tool")), 0o755);
        assert_eq!(mode_of(&dir.path().join("usr/bin")), IMPLICIT_DIR_MODE);
        assert_eq!(
            fs::read_to_string(dir.path().join("etc/motd")).unwrap(),
            "welcome\n"
        );
    }

    #[test]
    fn hard_link_shares_content_with_its_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_file(b, "bin/busybox", 0o755, b"original");
            add_link(b, EntryType::Link, "bin/ls", "bin/busybox");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(stats.hard_links, 1);

        fs::write(dir.path().join("bin/ls"), b"rewritten").expect("write through link");
        assert_eq!(
            fs::read(dir.path().join("bin/busybox")).unwrap(),
            b"rewritten"
        );
    }

    #[test]
    fn hard_link_target_resolves_inside_destination() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_file(b, "etc/hosts", 0o644, b"127.0.0.1 localhost\n");
            add_link(b, EntryType::Link, "etc/hosts.bak", "/etc/hosts");
        });

        unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(
            fs::read(dir.path().join("etc/hosts.bak")).unwrap(),
            b"127.0.0.1 localhost\n"
        );
    }

    #[test]
    fn symlink_target_is_kept_verbatim_even_if_dangling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_link(b, EntryType::Symlink, "bin/sh", "/bin/busybox");
            add_link(b, EntryType::Symlink, "lib/ghost", "../nowhere/at/all");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(stats.symlinks, 2);
        assert_eq!(
            fs::read_link(dir.path().join("bin/sh")).unwrap(),
            Path::new("/bin/busybox")
        );
        assert_eq!(
            fs::read_link(dir.path().join("lib/ghost")).unwrap(),
            Path::new("../nowhere/at/all")
        );
    }

    #[test]
    fn later_layer_wins_on_the_same_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let lower = tar_with(|b| add_file(b, "etc/os-release", 0o644, b"ID=lower\n"));
        let upper = tar_with(|b| add_file(b, "etc/os-release", 0o600, b"ID=upper\n"));

        let stats = unpack_layers(
            [
                LayerStream::new("lower", io::Cursor::new(lower)),
                LayerStream::new("upper", io::Cursor::new(upper)),
            ],
            dir.path(),
        )
        .expect("unpack");

        assert_eq!(stats.files, 2);
        let path = dir.path().join("etc/os-release");
        assert_eq!(fs::read_to_string(&path).unwrap(), "ID=upper\n");
        assert_eq!(mode_of(&path), 0o600);
    }

    #[test]
    fn file_replaces_symlink_instead_of_writing_through_it() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        let victim = outside.path().join("victim");
        fs::write(&victim, b"untouched").expect("write victim");

        let lower = tar_with(|b| {
            add_link(b, EntryType::Symlink, "etc/passwd", victim.to_str().unwrap());
        });
        let upper = tar_with(|b| add_file(b, "etc/passwd", 0o644, b"root:x:0:0\n"));

        unpack_layers(
            [
                LayerStream::new("lower", io::Cursor::new(lower)),
                LayerStream::new("upper", io::Cursor::new(upper)),
            ],
            dir.path(),
        )
        .expect("unpack");

        assert_eq!(fs::read(&victim).unwrap(), b"untouched");
        assert!(!fs::symlink_metadata(dir.path().join("etc/passwd"))
            .unwrap()
            .file_type()
            .is_symlink());
    }

    #[test]
    fn parent_dir_components_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("rootfs");
        fs::create_dir(&dest).unwrap();

        // tar::Builder refuses `..`, so write the name into the header directly.
        let mut h = header(EntryType::Regular, 0o644, 4);
        h.as_old_mut().name[..13].copy_from_slice(b"../escaped.sh");
        h.set_cksum();
        let layer = tar_with(|b| b.append(&h, &b"boom"[..]).expect("append raw"));

        let err = unpack_layer(&layer[..], &dest).unwrap_err();
        assert!(matches!(err, RunletError::PathTraversal { .. }));
        assert!(!dir.path().join("escaped.sh").exists());
    }

    #[test]
    fn absolute_symlinked_parent_resolves_inside_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_dir(b, "run/", 0o755);
            add_link(b, EntryType::Symlink, "var/run", "/run");
            add_file(b, "var/run/app.pid", 0o644, b"42\n");
        });

        unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(
            fs::read_to_string(dir.path().join("run/app.pid")).unwrap(),
            "42\n"
        );
        assert_eq!(
            fs::read_link(dir.path().join("var/run")).unwrap(),
            Path::new("/run")
        );
    }

    #[test]
    fn hard_link_through_absolute_symlinked_parent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_file(b, "usr/lib/libx.so", 0o644, b"ELF");
            add_link(b, EntryType::Symlink, "lib", "/usr/lib");
            add_link(b, EntryType::Link, "libx-copy.so", "lib/libx.so");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(stats.hard_links, 1);
        assert_eq!(fs::read(dir.path().join("libx-copy.so")).unwrap(), b"ELF");
    }

    #[test]
    fn symlinked_parent_pointing_outside_is_rerooted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outside = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_link(b, EntryType::Symlink, "escape", outside.path().to_str().unwrap());
            add_file(b, "escape/planted", 0o644, b"x");
        });

        unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert!(!outside.path().join("planted").exists());
        let rerooted = outside.path().strip_prefix("/").expect("absolute tempdir");
        assert!(dir.path().join(rerooted).join("planted").is_file());
    }

    #[test]
    fn dot_dot_in_symlink_stops_at_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dest = dir.path().join("rootfs");
        fs::create_dir(&dest).unwrap();
        let layer = tar_with(|b| {
            add_link(b, EntryType::Symlink, "etc/up", "../../../../..");
            add_file(b, "etc/up/planted", 0o644, b"x");
        });

        unpack_layer(&layer[..], &dest).expect("unpack");
        assert!(!dir.path().join("planted").exists());
        assert!(dest.join("planted").is_file());
    }

    #[test]
    fn symlink_loop_in_parent_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_link(b, EntryType::Symlink, "a", "b");
            add_link(b, EntryType::Symlink, "b", "a");
            add_file(b, "a/file", 0o644, b"x");
        });

        let err = unpack_layer(&layer[..], dir.path()).unwrap_err();
        assert!(matches!(err, RunletError::Io { .. }));
    }

    #[test]
    fn archive_root_entry_is_not_counted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut root = header(EntryType::Directory, 0o751, 0);
        root.as_old_mut().name[..2].copy_from_slice(b"./");
        root.set_cksum();
        let layer = tar_with(|b| {
            b.append(&root, io::empty()).expect("append root");
            add_file(b, "etc/hostname", 0o644, b"box\n");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(stats.skipped, 0);
        assert_eq!(stats.entries(), 1);
        assert_ne!(mode_of(dir.path()), 0o751);
    }

    #[test]
    fn symlinked_parent_inside_the_root_is_followed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            add_dir(b, "usr/bin/", 0o755);
            add_link(b, EntryType::Symlink, "bin", "usr/bin");
            add_file(b, "bin/true", 0o755, b"");
        });

        unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert!(dir.path().join("usr/bin/true").is_file());
    }

    #[test]
    fn unsupported_entry_kinds_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| {
            let mut fifo = header(EntryType::Fifo, 0o644, 0);
            b.append_data(&mut fifo, "run/initctl", io::empty())
                .expect("append fifo");
            add_file(b, "etc/hostname", 0o644, b"box\n");
        });

        let stats = unpack_layer(&layer[..], dir.path()).expect("unpack");
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.files, 1);
        assert!(!dir.path().join("run/initctl").exists());
    }

    #[test]
    fn absolute_and_dot_prefixed_paths_land_under_the_root() {
        assert_eq!(
            confine(Path::new("/etc/passwd")).unwrap(),
            Some(PathBuf::from("etc/passwd"))
        );
        assert_eq!(
            confine(Path::new("./usr/./lib")).unwrap(),
            Some(PathBuf::from("usr/lib"))
        );
        assert_eq!(confine(Path::new("./")).unwrap(), None);
        assert!(confine(Path::new("usr/../../etc")).is_err());
    }

    #[test]
    fn corrupt_stream_aborts_unpack() {
        let dir = tempfile::tempdir().expect("tempdir");
        let garbage = vec![0xFFu8; 1024];
        assert!(unpack_layer(&garbage[..], dir.path()).is_err());
    }

    #[test]
    fn missing_destination_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layer = tar_with(|b| add_file(b, "a", 0o644, b"a"));
        assert!(unpack_layer(&layer[..], &dir.path().join("absent")).is_err());
    }
}

//! End-to-end provisioning tests for the runlet runtime.
//!
//! These tests drive the public pipeline without privileges:
//! 1. Build a layer archive on disk
//! 2. Resolve it through the `tar://` source
//! 3. Provision a rootfs through the engine
//! 4. Inspect the unpacked tree

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use runlet_common::config::RunConfig;
use runlet_common::error::RunletError;
use runlet_runtime::engine::Engine;

fn append_file(builder: &mut tar::Builder<impl std::io::Write>, path: &str, mode: u32, data: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(mode);
    builder.append_data(&mut header, path, data).expect("append file");
}

fn append_dir(builder: &mut tar::Builder<impl std::io::Write>, path: &str, mode: u32) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_size(0);
    header.set_mode(mode);
    builder
        .append_data(&mut header, path, std::io::empty())
        .expect("append dir");
}

fn append_link(
    builder: &mut tar::Builder<impl std::io::Write>,
    kind: tar::EntryType,
    path: &str,
    target: &str,
) {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(kind);
    header.set_size(0);
    header.set_mode(0o777);
    builder.append_link(&mut header, path, target).expect("append link");
}

/// A small busybox-style image: a binary, applet links, and config.
fn write_image(path: &Path) {
    let file = std::fs::File::create(path).expect("create image");
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);

    append_dir(&mut builder, "bin/", 0o755);
    append_file(&mut builder, "bin/busybox", 0o755, b"#!fake busybox\n");
    append_link(&mut builder, tar::EntryType::Symlink, "bin/sh", "busybox");
    append_link(&mut builder, tar::EntryType::Link, "bin/ls", "bin/busybox");
    append_dir(&mut builder, "tmp/", 0o1777);
    append_file(&mut builder, "etc/hostname", 0o644, b"image\n");
    append_link(&mut builder, tar::EntryType::Symlink, "etc/mtab", "/proc/mounts");

    let encoder = builder.into_inner().expect("finish tar");
    let _ = encoder.finish().expect("finish gzip");
}

#[test]
fn tar_image_provisions_complete_rootfs() {
    let work = tempfile::tempdir().expect("tempdir");
    let image = work.path().join("image.tar.gz");
    write_image(&image);

    let engine = Engine::new(RunConfig {
        image: format!("tar://{}", image.display()),
        userns: false,
        rootfs_parent: work.path().join("roots"),
    });
    let rootfs = engine.provision().expect("provision");
    let root = &rootfs.path;

    assert_eq!(rootfs.layers, 1);
    assert!(
        root.file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("rootfs-")
    );

    let busybox = std::fs::metadata(root.join("bin/busybox")).expect("busybox");
    assert_eq!(busybox.permissions().mode() & 0o7777, 0o755);

    assert_eq!(
        std::fs::read_link(root.join("bin/sh")).expect("sh link"),
        Path::new("busybox")
    );
    assert_eq!(
        std::fs::read_link(root.join("etc/mtab")).expect("mtab link"),
        Path::new("/proc/mounts")
    );

    let tmp = std::fs::metadata(root.join("tmp")).expect("tmp");
    assert_eq!(tmp.permissions().mode() & 0o7777, 0o1777);

    assert_eq!(
        std::fs::read(root.join("bin/ls")).expect("ls"),
        b"#!fake busybox\n"
    );
    assert_eq!(rootfs.stats.hard_links, 1);
    assert_eq!(rootfs.stats.symlinks, 2);
}

#[test]
fn unresolvable_image_leaves_no_rootfs() {
    let work = tempfile::tempdir().expect("tempdir");
    let roots = work.path().join("roots");

    let engine = Engine::new(RunConfig {
        image: format!("tar://{}", work.path().join("missing.tar").display()),
        userns: false,
        rootfs_parent: roots.clone(),
    });
    let err = engine.provision().unwrap_err();
    assert!(matches!(err, RunletError::NotFound { .. }));
    assert!(!roots.exists());
}

#[test]
fn corrupt_archive_is_fatal() {
    let work = tempfile::tempdir().expect("tempdir");
    let image = work.path().join("broken.tar.gz");
    std::fs::write(&image, b"definitely not gzip").expect("write");

    let engine = Engine::new(RunConfig {
        image: format!("tar://{}", image.display()),
        userns: false,
        rootfs_parent: work.path().join("roots"),
    });
    assert!(engine.provision().is_err());
}

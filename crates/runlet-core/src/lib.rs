//! # runlet-core
//!
//! Low-level Linux isolation primitives for the runlet runtime.
//!
//! This crate provides safe abstractions over:
//! - **Namespaces**: selecting mount, UTS, PID and user isolation, writing
//!   user-namespace ID maps, and setting the container hostname.
//! - **Filesystem**: private mount propagation, the `/proc` mount, and the
//!   `chroot` + `chdir` root change.
//!
//! Every wrapper returns [`runlet_common::error::Result`] so callers decide
//! how fatal a failure is.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod filesystem;
pub mod namespace;

//! Filesystem management for container isolation.
//!
//! Provides mount propagation control, the `/proc` mount, and the
//! `chroot`-based root switch.

pub mod chroot;
pub mod mount;

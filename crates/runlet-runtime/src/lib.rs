//! Container run orchestration for runlet.
//!
//! - [`rootfs`]: image reference to populated rootfs directory.
//! - [`orchestrator`] and [`process`]: namespaced child creation and waiting.
//! - [`init`]: the in-container setup that ends in the shell.
//! - [`engine`]: ties the steps together for the CLI.

#![allow(unsafe_code)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
pub mod init;
pub mod orchestrator;
pub mod process;
pub mod rootfs;

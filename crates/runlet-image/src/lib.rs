//! # runlet-image
//!
//! Container image acquisition and layer unpacking for runlet.
//!
//! Handles:
//! - **Layers**: applying ordered tar layer streams onto a rootfs directory.
//! - **Sources**: the [`source::ImageSource`] seam, with registry and local
//!   `tar://` implementations.
//! - **References**: Docker-style image reference parsing.
//! - **Hashing**: SHA-256 content verification of downloaded blobs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod hash;
pub mod layer;
pub mod reference;
pub mod registry;
pub mod source;

//! # rootlet-image
//!
//! Image resolution and layer management for rootlet.
//!
//! Handles:
//! - **Registry**: token exchange, manifest and blob retrieval.
//! - **Storage**: the digest-keyed layer cache shared across runs.
//! - **Hashing**: SHA-256 content verification.
//! - **Layers**: ordered extraction of layer archives into a root.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod hash;
pub mod layer;
pub mod registry;
pub mod storage;

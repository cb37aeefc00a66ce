//! Run pipeline for rootlet.
//!
//! Chains the image stages (token, manifest, layer cache) into root
//! assembly, isolation, and execution of a single command.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod pipeline;
pub mod process;
pub mod rootfs;

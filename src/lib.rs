//! asml-sfx - self-extracting launcher for ASM-Lang programs
//!
//! A bundle is an ordinary executable with a gzip compressed tar payload
//! and a fixed 48-byte footer appended to its image. At run time the stub
//! locates the payload through the footer, verifies its SHA-256 digest
//! while carving it out, expands it into an ephemeral workspace, resolves
//! the bundled interpreter and main script, runs the interpreter, and
//! removes the workspace on every exit path. The companion builder
//! produces such bundles.

// Enforce strict code quality and reliability
#![deny(
    // Safety
    unsafe_code,

    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,
)]
#![warn(
    // Documentation
    missing_docs,

    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,

    // Performance
    clippy::inefficient_to_string,

    // Best practices
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::needless_continue,
)]

pub mod api;
pub mod builder;
pub mod exceptions;
pub mod exit_codes;
pub mod logger;
pub mod sfx;
pub mod version;

// Re-export main API functions
pub use api::{build_bundle, launch_bundle, verify_bundle};
pub use builder::BuildOptions;
pub use exceptions::SfxError;

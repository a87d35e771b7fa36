//! High-level API for bundle operations

use std::fs::File;
use std::path::Path;

use crate::builder::{self, BuildOptions};
use crate::exceptions::{Result, SfxError};
use crate::sfx::carver;
use crate::sfx::footer::Footer;
use crate::sfx::launcher;

/// Run the full stub pipeline against the bundle at `exe_path`
///
/// On success returns the interpreter's exit code. The ephemeral
/// workspace is removed before this returns, on success and failure
/// alike.
pub fn launch_bundle(exe_path: &Path) -> Result<i32> {
    launcher::run(exe_path)
}

/// Verify a bundle's footer and payload digest without expanding it
///
/// Returns the payload length on success.
///
/// # Errors
///
/// Returns `Format` for a malformed footer and `Integrity` when the
/// payload bytes do not hash to the stored digest.
pub fn verify_bundle(bundle_path: &Path) -> Result<i64> {
    let mut image = File::open(bundle_path)?;
    let footer = Footer::read_from(&mut image)?;

    let actual = carver::payload_digest(&mut image, &footer)?;
    if actual != footer.digest {
        return Err(SfxError::Integrity(format!(
            "payload corrupted: footer digest sha256:{}, payload hashes to sha256:{}",
            hex::encode(footer.digest),
            hex::encode(actual)
        )));
    }

    Ok(footer.payload_length)
}

/// Build a self-extracting bundle
pub fn build_bundle(options: &BuildOptions) -> Result<()> {
    builder::build(options)
}

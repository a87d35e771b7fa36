//! Archive expansion
//!
//! The verified payload is a gzip compressed POSIX tar archive. Expansion
//! is delegated to the tar/flate2 stack; before unpacking, each entry path
//! is checked for containment in the destination, so an archive cannot
//! plant files outside the workspace.

use flate2::read::GzDecoder;
use log::{debug, trace};
use std::fs::{self, File};
use std::path::{Component, Path};
use tar::Archive;

use crate::exceptions::{Result, SfxError};

/// Expand a gzip'd tar archive into `dest_dir`
///
/// # Errors
///
/// Returns `Io` for structurally invalid archives or filesystem failures,
/// and `Format` for entries whose path would escape the destination.
pub fn expand_archive(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    debug!("expanding {archive_path:?} into {dest_dir:?}");

    let file = File::open(archive_path)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let rel = entry.path()?.into_owned();
        ensure_contained(&rel)?;

        let target = dest_dir.join(&rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }

        trace!("unpacking {rel:?}");
        entry.unpack(&target)?;
    }

    Ok(())
}

/// Reject entry paths that would land outside the destination
fn ensure_contained(rel: &Path) -> Result<()> {
    for component in rel.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(SfxError::Format(format!(
                    "archive entry {rel:?} escapes the destination directory"
                )));
            }
        }
    }
    Ok(())
}

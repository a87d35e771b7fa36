//! Manifest resolution
//!
//! After expansion the bundle root holds a single well-known text file
//! whose trimmed contents are the main script's path relative to the
//! workspace, and a fixed-named interpreter binary.

use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{INTERPRETER_NAME, MANIFEST_NAME};
use crate::exceptions::{Result, SfxError};

/// Paths resolved from an expanded workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    /// Absolute path of the main script (existence is the interpreter's concern)
    pub script: PathBuf,
    /// Absolute path of the bundled interpreter
    pub interpreter: PathBuf,
}

/// Resolve the main script and interpreter from the workspace root
///
/// # Errors
///
/// Returns `MissingResource` if the manifest is absent, its trimmed
/// content is empty, or the interpreter binary is missing. All of these
/// indicate a corrupt or incompatible bundle.
pub fn resolve(workspace_root: &Path) -> Result<ResolvedEntry> {
    let manifest_path = workspace_root.join(MANIFEST_NAME);
    if !manifest_path.is_file() {
        return Err(SfxError::MissingResource(format!(
            "manifest {MANIFEST_NAME} not found in expanded bundle"
        )));
    }

    let raw = fs::read_to_string(&manifest_path)?;
    let main_rel = raw.trim();
    if main_rel.is_empty() {
        return Err(SfxError::MissingResource(format!(
            "manifest {MANIFEST_NAME} names no main script"
        )));
    }

    let interpreter = workspace_root.join(INTERPRETER_NAME);
    if !interpreter.is_file() {
        return Err(SfxError::MissingResource(format!(
            "bundled interpreter {INTERPRETER_NAME} is missing from the bundle root"
        )));
    }

    let script = workspace_root.join(main_rel);
    debug!("resolved main script {script:?} via {MANIFEST_NAME}");

    Ok(ResolvedEntry {
        script,
        interpreter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace_with(manifest: Option<&str>, interpreter: bool) -> TempDir {
        let dir = TempDir::new().unwrap();
        if let Some(content) = manifest {
            fs::write(dir.path().join(MANIFEST_NAME), content).unwrap();
        }
        if interpreter {
            fs::write(dir.path().join(INTERPRETER_NAME), b"#!/bin/sh\n").unwrap();
        }
        dir
    }

    #[test]
    fn resolves_trimmed_relative_path() {
        let dir = workspace_with(Some("  scripts/main.asml \n"), true);
        let entry = resolve(dir.path()).unwrap();
        assert_eq!(entry.script, dir.path().join("scripts/main.asml"));
        assert_eq!(entry.interpreter, dir.path().join(INTERPRETER_NAME));
    }

    #[test]
    fn missing_manifest_is_missing_resource() {
        let dir = workspace_with(None, true);
        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, SfxError::MissingResource(_)));
        assert!(err.to_string().contains("manifest"), "got {err}");
    }

    #[test]
    fn blank_manifest_is_missing_resource() {
        let dir = workspace_with(Some("   \n\t"), true);
        let err = resolve(dir.path()).unwrap_err();
        assert!(matches!(err, SfxError::MissingResource(_)));
    }

    #[test]
    fn missing_interpreter_is_missing_resource() {
        let dir = workspace_with(Some("main.asml"), false);
        let err = resolve(dir.path()).unwrap_err();
        assert!(err.to_string().contains(INTERPRETER_NAME), "got {err}");
    }

    #[test]
    fn script_existence_is_not_checked() {
        let dir = workspace_with(Some("does/not/exist.asml"), true);
        assert!(resolve(dir.path()).is_ok());
    }
}

//! Ephemeral workspace management
//!
//! One uniquely named directory per invocation under the system temporary
//! root. Concurrent invocations of the same bundle never share a
//! workspace, so no locking is needed between instances.

use log::debug;
use std::path::Path;
use tempfile::TempDir;

use crate::exceptions::Result;

/// Prefix for workspace directory names under the temp root
const WORKSPACE_PREFIX: &str = "asml-sfx-";

/// Handle to the per-invocation extraction directory
///
/// Dropping the handle removes the tree recursively on every exit path,
/// success or failure. Removal failures are swallowed so cleanup can never
/// mask the pipeline's own result.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named workspace under the system temp root
    pub fn create() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix(WORKSPACE_PREFIX).tempdir()?;
        debug!("workspace created at {:?}", dir.path());
        Ok(Self { dir })
    }

    /// Root directory of the workspace
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

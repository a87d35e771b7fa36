//! Pipeline driver and process launcher
//!
//! Control flow is strictly sequential: workspace → footer → carve →
//! expand → resolve → launch. The workspace handle is held across every
//! stage so its drop removes the directory no matter where the pipeline
//! stops.

use log::{debug, info};
use std::fs::{self, File};
use std::path::Path;
use std::process::Command;

use super::carver::carve_payload;
use super::constants::PAYLOAD_FILE_NAME;
use super::expand::expand_archive;
use super::footer::Footer;
use super::manifest::{self, ResolvedEntry};
use super::workspace::Workspace;
use crate::exceptions::{Result, SfxError};

/// Run the whole stub pipeline for the bundle image at `exe_path`
///
/// Returns the interpreter's exit code on success.
///
/// # Errors
///
/// Any stage failure is returned unchanged; the workspace is removed on
/// every exit path regardless.
pub fn run(exe_path: &Path) -> Result<i32> {
    let workspace = Workspace::create()?;
    // Cleanup rides on the workspace handle's drop, so every early return
    // below still tears the directory down.
    run_stages(exe_path, &workspace)
}

fn run_stages(exe_path: &Path, workspace: &Workspace) -> Result<i32> {
    let mut image = File::open(exe_path)?;
    let footer = Footer::read_from(&mut image)?;
    info!("bundle payload: {} bytes", footer.payload_length);

    let payload_path = workspace.root().join(PAYLOAD_FILE_NAME);
    carve_payload(&mut image, &footer, &payload_path)?;
    drop(image);

    expand_archive(&payload_path, workspace.root())?;
    if let Err(e) = fs::remove_file(&payload_path) {
        debug!("could not remove carved payload: {e}");
    }

    let entry = manifest::resolve(workspace.root())?;
    launch(&entry, workspace.root())
}

/// Start the interpreter and wait for it, propagating its exit status
///
/// The interpreter gets the absolute script path as its sole argument and
/// the workspace root as its working directory; the environment is
/// inherited unmodified.
fn launch(entry: &ResolvedEntry, workdir: &Path) -> Result<i32> {
    info!("launching {:?} {:?}", entry.interpreter, entry.script);

    let mut child = Command::new(&entry.interpreter)
        .arg(&entry.script)
        .current_dir(workdir)
        .spawn()
        .map_err(|e| {
            SfxError::Launch(format!("failed to start {:?}: {e}", entry.interpreter))
        })?;

    let status = child.wait()?;
    debug!("interpreter exited with {status:?}");

    // A signal-terminated child has no code; report failure in that case.
    Ok(status.code().unwrap_or(1))
}

//! End-to-end scenarios against synthetic bundles
//!
//! Bundles are assembled by hand here (stub prefix + gzip'd tar payload +
//! footer) so every failure mode of the container format can be staged
//! precisely.

use anyhow::Result;
use asml_sfx::sfx::constants::{FOOTER_SIZE, INTERPRETER_NAME, MANIFEST_NAME, MARKER};
use asml_sfx::sfx::footer::Footer;
use asml_sfx::{SfxError, launch_bundle, verify_bundle};
use flate2::{Compression, write::GzEncoder};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

/// Serializes tests that create workspaces, so the temp-root snapshots
/// below only ever see their own directories.
static WORKSPACE_LOCK: Mutex<()> = Mutex::new(());

const STUB_PREFIX: &[u8] = b"\x7fELF fake stub bytes for testing\0\0\0";

fn lock() -> std::sync::MutexGuard<'static, ()> {
    WORKSPACE_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a gzip'd tar archive from `(path, data, mode)` entries
fn make_archive(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, data, mode) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(*mode);
        header.set_cksum();
        builder.append_data(&mut header, path, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Assemble `stub + payload + footer` into a file under `dir`
fn write_bundle(dir: &Path, payload: &[u8]) -> PathBuf {
    let footer = Footer {
        payload_length: payload.len() as i64,
        digest: Sha256::digest(payload).into(),
    };

    let mut image = STUB_PREFIX.to_vec();
    image.extend_from_slice(payload);
    image.extend_from_slice(&footer.to_bytes());

    let path = dir.join("bundle");
    fs::write(&path, image).unwrap();
    path
}

/// Payload with an interpreter that echoes its argument and exits 0
fn echoing_payload() -> Vec<u8> {
    make_archive(&[
        (INTERPRETER_NAME, b"#!/bin/sh\necho \"$1\"\nexit 0\n", 0o755),
        (MANIFEST_NAME, b"main.txt\n", 0o644),
        ("main.txt", b"hello from the bundle\n", 0o644),
    ])
}

fn workspace_snapshot() -> HashSet<PathBuf> {
    let mut seen = HashSet::new();
    if let Ok(entries) = fs::read_dir(std::env::temp_dir()) {
        for entry in entries.flatten() {
            if entry
                .file_name()
                .to_string_lossy()
                .starts_with("asml-sfx-")
            {
                seen.insert(entry.path());
            }
        }
    }
    seen
}

fn surviving_workspaces(before: &HashSet<PathBuf>) -> Vec<PathBuf> {
    workspace_snapshot().difference(before).cloned().collect()
}

#[cfg(unix)]
#[test]
fn scenario_a_valid_bundle_runs_to_success() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let bundle = write_bundle(dir.path(), &echoing_payload());

    let before = workspace_snapshot();
    let code = launch_bundle(&bundle)?;
    assert_eq!(code, 0);
    assert!(
        surviving_workspaces(&before).is_empty(),
        "workspace must be removed on the success path too"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn scenario_b_corrupted_payload_byte() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let bundle = write_bundle(dir.path(), &echoing_payload());

    // Flip one byte inside the payload region.
    let mut image = fs::read(&bundle)?;
    let payload_middle = STUB_PREFIX.len() + (image.len() - STUB_PREFIX.len() - FOOTER_SIZE) / 2;
    image[payload_middle] ^= 0x01;
    fs::write(&bundle, image)?;

    let before = workspace_snapshot();
    let err = launch_bundle(&bundle).unwrap_err();
    assert!(matches!(err, SfxError::Integrity(_)), "got {err}");
    assert!(err.to_string().contains("integrity"), "got {err}");
    assert!(
        surviving_workspaces(&before).is_empty(),
        "workspace must not survive an integrity failure"
    );
    Ok(())
}

#[test]
fn scenario_c_overwritten_marker() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let bundle = write_bundle(dir.path(), &echoing_payload());

    let mut image = fs::read(&bundle)?;
    let marker_start = image.len() - MARKER.len();
    image[marker_start..].copy_from_slice(b"XXXXXXXX");
    fs::write(&bundle, image)?;

    let err = launch_bundle(&bundle).unwrap_err();
    assert!(matches!(err, SfxError::Format(_)), "got {err}");
    assert!(err.to_string().contains("marker"), "got {err}");
    Ok(())
}

#[cfg(unix)]
#[test]
fn scenario_d_missing_manifest() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let payload = make_archive(&[
        (INTERPRETER_NAME, b"#!/bin/sh\nexit 0\n", 0o755),
        ("main.txt", b"no manifest here\n", 0o644),
    ]);
    let bundle = write_bundle(dir.path(), &payload);

    let err = launch_bundle(&bundle).unwrap_err();
    assert!(matches!(err, SfxError::MissingResource(_)), "got {err}");
    assert!(err.to_string().contains("manifest"), "got {err}");
    Ok(())
}

#[test]
fn file_shorter_than_footer_is_format_error() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let short = dir.path().join("short");
    fs::write(&short, b"way too small")?;

    let err = launch_bundle(&short).unwrap_err();
    assert!(matches!(err, SfxError::Format(_)), "got {err}");
    Ok(())
}

#[test]
fn bad_length_fields_are_format_errors() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let payload = echoing_payload();

    for bad_length in [0i64, -1, i64::MAX] {
        let digest: [u8; 32] = Sha256::digest(&payload).into();
        let footer = Footer {
            payload_length: bad_length,
            digest,
        };
        let mut image = STUB_PREFIX.to_vec();
        image.extend_from_slice(&payload);
        image.extend_from_slice(&footer.to_bytes());

        let path = dir.path().join(format!("bundle-{bad_length}"));
        fs::write(&path, image)?;

        let err = launch_bundle(&path).unwrap_err();
        assert!(
            matches!(err, SfxError::Format(_)),
            "length {bad_length}: got {err}"
        );
    }
    Ok(())
}

#[cfg(unix)]
#[test]
fn interpreter_exit_code_is_propagated() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let payload = make_archive(&[
        (INTERPRETER_NAME, b"#!/bin/sh\nexit 7\n", 0o755),
        (MANIFEST_NAME, b"main.txt\n", 0o644),
        ("main.txt", b"x\n", 0o644),
    ]);
    let bundle = write_bundle(dir.path(), &payload);

    assert_eq!(launch_bundle(&bundle)?, 7);
    Ok(())
}

#[cfg(unix)]
#[test]
fn concurrent_invocations_are_independent() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    // The interpreter proves it sees its own workspace's manifest.
    let payload = make_archive(&[
        (
            INTERPRETER_NAME,
            b"#!/bin/sh\ntest -f __main_path.txt || exit 3\ntest -f \"$1\" || exit 4\nexit 0\n",
            0o755,
        ),
        (MANIFEST_NAME, b"main.txt\n", 0o644),
        ("main.txt", b"x\n", 0o644),
    ]);
    let bundle = write_bundle(dir.path(), &payload);

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..2)
            .map(|_| scope.spawn(|| launch_bundle(&bundle)))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("launch thread panicked"))
            .collect()
    });

    for result in results {
        assert_eq!(result?, 0);
    }
    Ok(())
}

#[test]
fn verify_bundle_reports_payload_length() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let payload = echoing_payload();
    let bundle = write_bundle(dir.path(), &payload);

    assert_eq!(verify_bundle(&bundle)?, payload.len() as i64);
    Ok(())
}

#[test]
fn verify_bundle_catches_corruption() -> Result<()> {
    let _guard = lock();
    let dir = TempDir::new()?;
    let bundle = write_bundle(dir.path(), &echoing_payload());

    let mut image = fs::read(&bundle)?;
    image[STUB_PREFIX.len()] ^= 0xFF;
    fs::write(&bundle, image)?;

    let err = verify_bundle(&bundle).unwrap_err();
    assert!(matches!(err, SfxError::Integrity(_)), "got {err}");
    Ok(())
}

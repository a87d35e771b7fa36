//! Bundle builder
//!
//! Stages the payload tree (interpreter runtime, main script, extra
//! includes), writes the manifest, packs a gzip'd tar payload, and appends
//! payload plus footer to a copy of the stub executable. The stub itself
//! never depends on any of this; it only consumes finished bundles.

use flate2::{Compression, write::GzEncoder};
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::exceptions::{Result, SfxError};
use crate::sfx::constants::{CARVE_CHUNK_SIZE, INTERPRETER_NAME, MANIFEST_NAME};
use crate::sfx::footer::Footer;

/// Options for building a bundle
#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Interpreter binary to bundle; its `lib/` directory must sit next to it
    pub interpreter: PathBuf,
    /// Main script to run on startup
    pub main_script: PathBuf,
    /// Destination directory inside the bundle for the main script (`.` = root)
    pub main_dest: String,
    /// Extra single-file includes, `source;dest_in_bundle` mappings
    pub includes: Vec<String>,
    /// Extra folder includes, `source;dest_in_bundle` mappings
    pub include_folders: Vec<String>,
    /// Stub executable the payload is appended to
    pub stub: PathBuf,
    /// Output path for the generated bundle
    pub output: PathBuf,
    /// Skip the post-build verification pass
    pub skip_verification: bool,
}

/// Build a self-extracting bundle
///
/// # Errors
///
/// Returns `Build` for missing or malformed inputs and `Io` for
/// filesystem failures while staging or assembling.
pub fn build(options: &BuildOptions) -> Result<()> {
    if !options.main_script.is_file() {
        return Err(SfxError::Build(format!(
            "main script not found: {:?}",
            options.main_script
        )));
    }
    if !options.stub.is_file() {
        return Err(SfxError::Build(format!(
            "stub executable not found: {:?}",
            options.stub
        )));
    }

    let staging = tempfile::Builder::new().prefix("asml-sfx-build-").tempdir()?;
    let payload_root = staging.path().join("payload");
    fs::create_dir_all(&payload_root)?;

    stage_runtime(&options.interpreter, &payload_root)?;
    let main_rel = stage_main(&options.main_script, &options.main_dest, &payload_root)?;
    debug!("main script placed at {main_rel}");

    for entry in &options.includes {
        stage_include(entry, &payload_root)?;
    }
    for entry in &options.include_folders {
        stage_include_folder(entry, &payload_root)?;
    }

    fs::write(payload_root.join(MANIFEST_NAME), format!("{main_rel}\n"))?;

    let archive_path = staging.path().join("payload.tar.gz");
    pack_payload(&payload_root, &archive_path)?;
    assemble(&options.stub, &archive_path, &options.output)?;

    if options.skip_verification {
        debug!("skipping post-build verification");
    } else {
        let payload_length = crate::api::verify_bundle(&options.output)?;
        debug!("verified bundle payload ({payload_length} bytes)");
    }

    info!("built bundle at {:?}", options.output);
    Ok(())
}

/// Copy the interpreter and its adjacent `lib/` directory to the bundle root
fn stage_runtime(interpreter: &Path, payload_root: &Path) -> Result<()> {
    if !interpreter.is_file() {
        return Err(SfxError::Build(format!(
            "interpreter not found: {interpreter:?}"
        )));
    }
    let runtime_dir = interpreter.parent().unwrap_or_else(|| Path::new("."));
    let lib_dir = runtime_dir.join("lib");
    if !lib_dir.is_dir() {
        return Err(SfxError::Build(format!(
            "runtime lib/ directory not found next to {interpreter:?}"
        )));
    }

    fs::copy(interpreter, payload_root.join(INTERPRETER_NAME))?;
    copy_dir_all(&lib_dir, &payload_root.join("lib"))?;
    debug!("staged interpreter runtime from {runtime_dir:?}");
    Ok(())
}

/// Copy the main script into the bundle, returning its bundle-relative path
fn stage_main(main_script: &Path, dest_rel: &str, payload_root: &Path) -> Result<String> {
    let name = main_script
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| SfxError::Build(format!("main script has no file name: {main_script:?}")))?;

    let dest_rel = dest_rel.trim();
    let (target_dir, rel) = if dest_rel.is_empty() || dest_rel == "." {
        (payload_root.to_path_buf(), name.to_string())
    } else {
        (payload_root.join(dest_rel), format!("{dest_rel}/{name}"))
    };

    fs::create_dir_all(&target_dir)?;
    fs::copy(main_script, target_dir.join(name))?;
    Ok(rel)
}

/// Parse a `source;dest_in_bundle` mapping
fn parse_mapping(raw: &str) -> Result<(PathBuf, String)> {
    let Some((src_raw, dest_raw)) = raw.split_once(';') else {
        return Err(SfxError::Build(format!(
            "mapping must be of form 'source;dest_in_bundle': {raw:?}"
        )));
    };
    let src = PathBuf::from(src_raw);
    if !src.exists() {
        return Err(SfxError::Build(format!("included path does not exist: {src:?}")));
    }
    let dest = dest_raw.trim();
    let dest = if dest.is_empty() { "." } else { dest };
    Ok((src, dest.to_string()))
}

fn stage_include(entry: &str, payload_root: &Path) -> Result<()> {
    let (src, dest_rel) = parse_mapping(entry)?;
    if !src.is_file() {
        return Err(SfxError::Build(format!("included file is not a file: {src:?}")));
    }
    let name = src
        .file_name()
        .ok_or_else(|| SfxError::Build(format!("included file has no file name: {src:?}")))?;

    let target_dir = if dest_rel == "." {
        payload_root.to_path_buf()
    } else {
        payload_root.join(&dest_rel)
    };
    fs::create_dir_all(&target_dir)?;
    debug!("including file {src:?} -> {dest_rel}/{}", name.to_string_lossy());
    fs::copy(&src, target_dir.join(name))?;
    Ok(())
}

fn stage_include_folder(entry: &str, payload_root: &Path) -> Result<()> {
    let (src, dest_rel) = parse_mapping(entry)?;
    if !src.is_dir() {
        return Err(SfxError::Build(format!(
            "included folder is not a directory: {src:?}"
        )));
    }

    // A '.' destination places the folder under the bundle root by name.
    let target_dir = if dest_rel == "." {
        let name = src
            .file_name()
            .ok_or_else(|| SfxError::Build(format!("included folder has no name: {src:?}")))?;
        payload_root.join(name)
    } else {
        payload_root.join(&dest_rel)
    };
    debug!("including folder {src:?} -> {target_dir:?}");
    copy_dir_all(&src, &target_dir)
}

/// Recursively copy a directory
fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Pack the staged payload tree into a gzip'd tar archive
fn pack_payload(payload_root: &Path, archive_path: &Path) -> Result<()> {
    let encoder = GzEncoder::new(
        BufWriter::new(File::create(archive_path)?),
        Compression::default(),
    );
    let mut builder = tar::Builder::new(encoder);
    append_tree(&mut builder, payload_root, payload_root)?;
    builder.into_inner()?.finish()?.flush()?;
    Ok(())
}

fn append_tree<W: Write>(builder: &mut tar::Builder<W>, root: &Path, dir: &Path) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let rel = path
            .strip_prefix(root)
            .map_err(|_| SfxError::Build(format!("staged path {path:?} left the payload root")))?
            .to_path_buf();

        if path.is_dir() {
            builder.append_dir(&rel, &path)?;
            append_tree(builder, root, &path)?;
        } else {
            builder.append_path_with_name(&path, &rel)?;
        }
    }
    Ok(())
}

/// Emit `stub + payload + footer`, hashing the payload as it streams
fn assemble(stub: &Path, archive: &Path, output: &Path) -> Result<()> {
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut out = BufWriter::new(File::create(output)?);
    io::copy(&mut BufReader::new(File::open(stub)?), &mut out)?;

    let mut payload = BufReader::new(File::open(archive)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CARVE_CHUNK_SIZE];
    let mut payload_length: i64 = 0;
    loop {
        let read = payload.read(&mut buf)?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        out.write_all(&buf[..read])?;
        payload_length += read as i64;
    }

    let footer = Footer {
        payload_length,
        digest: hasher.finalize().into(),
    };
    out.write_all(&footer.to_bytes())?;
    out.flush()?;
    drop(out);

    // The bundle must itself be runnable.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(output, fs::Permissions::from_mode(0o755))?;
    }

    Ok(())
}

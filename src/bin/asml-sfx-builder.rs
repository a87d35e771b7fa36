//! Bundle builder binary
//!
//! Stages an ASM-Lang runtime, a main script, and optional extra includes
//! into a payload, then appends it with a footer to a copy of the stub
//! executable.

use asml_sfx::exit_codes::{EXIT_FAILURE, EXIT_PANIC, EXIT_SUCCESS};
use asml_sfx::{BuildOptions, build_bundle, logger};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::{env, panic, process};

const VERSION: &str = asml_sfx::version::VERSION;

#[cfg(windows)]
const STUB_BIN_NAME: &str = "asml-sfx-launcher.exe";
#[cfg(not(windows))]
const STUB_BIN_NAME: &str = "asml-sfx-launcher";

#[derive(Parser, Debug)]
#[command(version = VERSION, about = "Build a self-extracting ASM-Lang executable")]
struct Args {
    /// Path to the asmln interpreter to bundle (its lib/ folder must sit next to it)
    interpreter: PathBuf,

    /// Path to the main ASM-Lang script to run on startup
    main_script: PathBuf,

    /// Include a single file, 'source;dest_in_bundle' ('.' means bundle root)
    #[arg(long = "include", value_name = "SRC;DEST")]
    includes: Vec<String>,

    /// Include a folder recursively; a '.' destination places it under the
    /// bundle root using the folder name
    #[arg(long = "include-folder", value_name = "SRC;DEST")]
    include_folders: Vec<String>,

    /// Destination directory inside the bundle for the main script
    #[arg(long, default_value = ".")]
    main_dest: String,

    /// Stub executable to append the payload to (defaults to the
    /// asml-sfx-launcher next to this binary)
    #[arg(long)]
    stub: Option<PathBuf>,

    /// Output path for the generated bundle
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip post-build verification
    #[arg(long)]
    skip_verification: bool,

    /// Log level (trace, debug, info, warn, error, or json:<level>)
    #[arg(long)]
    log_level: Option<String>,
}

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {panic_info}");
        process::exit(EXIT_PANIC);
    }));

    process::exit(run());
}

fn run() -> i32 {
    let args = Args::parse();

    if let Some(ref level) = args.log_level {
        logger::init_with_level(level);
    } else {
        logger::init();
    }

    let stub = match args.stub.map_or_else(default_stub, Ok) {
        Ok(path) => path,
        Err(msg) => {
            eprintln!("asml-sfx-builder: {msg}");
            return EXIT_FAILURE;
        }
    };

    let output = args.output.unwrap_or_else(|| default_output(&args.main_script));

    let options = BuildOptions {
        interpreter: args.interpreter,
        main_script: args.main_script,
        main_dest: args.main_dest,
        includes: args.includes,
        include_folders: args.include_folders,
        stub,
        output: output.clone(),
        skip_verification: args.skip_verification,
    };

    match build_bundle(&options) {
        Ok(()) => {
            println!("Built self-extracting bundle: {}", output.display());
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("asml-sfx-builder: {e}");
            EXIT_FAILURE
        }
    }
}

/// Look for the stub launcher next to this binary
fn default_stub() -> Result<PathBuf, String> {
    let own = env::current_exe()
        .map_err(|e| format!("cannot determine own executable path: {e}"))?;
    let candidate = own
        .parent()
        .map(|dir| dir.join(STUB_BIN_NAME))
        .filter(|p| p.is_file());

    candidate.ok_or_else(|| {
        format!("no --stub given and {STUB_BIN_NAME} was not found next to this binary")
    })
}

/// Default output path: the main script's stem in the current directory
fn default_output(main_script: &Path) -> PathBuf {
    let stem = main_script
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "bundle".to_string());

    #[cfg(windows)]
    let name = format!("{stem}.exe");
    #[cfg(not(windows))]
    let name = stem;

    PathBuf::from(name)
}

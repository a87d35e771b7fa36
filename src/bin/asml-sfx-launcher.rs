//! The self-extracting stub binary
//!
//! Takes no command-line flags and no functional environment inputs: it
//! reads its own executable image, verifies and expands the appended
//! payload, and runs the bundled program, propagating its exit code.

use asml_sfx::exit_codes::{EXIT_FAILURE, EXIT_PANIC};
use asml_sfx::{launch_bundle, logger};
use std::{env, panic, process};

fn main() {
    // Set up panic handler to return specific exit code
    panic::set_hook(Box::new(|panic_info| {
        eprintln!("PANIC: {panic_info}");
        process::exit(EXIT_PANIC);
    }));

    process::exit(run());
}

fn run() -> i32 {
    // Diagnostics only; a bare run logs nothing.
    logger::init();
    log::debug!("stub process started");

    let exe_path = match env::current_exe() {
        Ok(path) => {
            log::debug!("executable path: {path:?}");
            path
        }
        Err(e) => {
            eprintln!("asml-sfx: cannot determine own executable path: {e}");
            return EXIT_FAILURE;
        }
    };

    match launch_bundle(&exe_path) {
        Ok(code) => {
            log::debug!("bundled program exited with code {code}");
            code
        }
        Err(e) => {
            log::error!("pipeline failed: {e}");
            eprintln!("asml-sfx: {e}");
            EXIT_FAILURE
        }
    }
}

//! Standard exit codes for the asml-sfx binaries
//!
//! The stub propagates the interpreter's own exit code on success; every
//! pipeline failure maps to `EXIT_FAILURE` with a diagnostic on stderr.

/// Successful execution (the stub instead returns the child's exit code)
pub const EXIT_SUCCESS: i32 = 0;

/// Any pipeline or build failure (format, integrity, missing resource, launch)
pub const EXIT_FAILURE: i32 = 1;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

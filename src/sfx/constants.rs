//! Core container format constants that never change

/// Format signature, the last 8 bytes of a bundle
pub const MARKER: &[u8; 8] = b"ASMLSFX1";

/// Size of the payload length field (i64, little-endian)
pub const LENGTH_SIZE: usize = 8;

/// Size of the payload digest field (SHA-256)
pub const DIGEST_SIZE: usize = 32;

/// Total footer size: length (8) + digest (32) + marker (8)
pub const FOOTER_SIZE: usize = LENGTH_SIZE + DIGEST_SIZE + MARKER.len();

/// Well-known manifest entry naming the main script, at the bundle root
pub const MANIFEST_NAME: &str = "__main_path.txt";

/// Fixed name of the bundled interpreter, at the bundle root
#[cfg(windows)]
pub const INTERPRETER_NAME: &str = "asmln.exe";

/// Fixed name of the bundled interpreter, at the bundle root
#[cfg(not(windows))]
pub const INTERPRETER_NAME: &str = "asmln";

/// Chunk size for streaming payload copy and hashing
///
/// Bounds memory use independent of payload size.
pub const CARVE_CHUNK_SIZE: usize = 64 * 1024;

/// Name of the carved payload file inside the workspace, removed after expansion
pub const PAYLOAD_FILE_NAME: &str = "payload.tar.gz";

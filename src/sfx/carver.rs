//! Payload carving and integrity verification
//!
//! The payload byte range is streamed out of the bundle image in fixed-size
//! chunks while a SHA-256 digest is updated incrementally, so memory use is
//! bounded independent of payload size. No downstream stage ever sees a
//! payload whose digest has not been checked.

use log::{debug, trace};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::constants::CARVE_CHUNK_SIZE;
use super::footer::Footer;
use crate::exceptions::{Result, SfxError};

/// Copy the payload range into a new file at `dest`, verifying its digest
///
/// # Errors
///
/// Returns `Io` (unexpected end of input) if the image holds fewer bytes
/// than the footer declares, and `Integrity` if the streamed bytes do not
/// hash to the stored digest. In both cases the partial output file is
/// removed best-effort.
pub fn carve_payload<R: Read + Seek>(image: &mut R, footer: &Footer, dest: &Path) -> Result<()> {
    let image_len = image.seek(SeekFrom::End(0))?;
    let offset = footer.payload_offset(image_len)?;
    image.seek(SeekFrom::Start(offset))?;

    debug!(
        "carving {} payload bytes from offset {offset} into {dest:?}",
        footer.payload_length
    );

    let mut out = BufWriter::new(File::create(dest)?);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CARVE_CHUNK_SIZE];
    let mut remaining = footer.payload_length as u64;

    while remaining > 0 {
        let want = remaining.min(CARVE_CHUNK_SIZE as u64) as usize;
        let read = match image.read(&mut buf[..want]) {
            Ok(0) => {
                drop(out);
                let _ = fs::remove_file(dest);
                return Err(SfxError::Io(std::io::Error::new(
                    ErrorKind::UnexpectedEof,
                    format!("payload truncated with {remaining} bytes left to copy"),
                )));
            }
            Ok(n) => n,
            Err(e) => {
                drop(out);
                let _ = fs::remove_file(dest);
                return Err(SfxError::Io(e));
            }
        };
        hasher.update(&buf[..read]);
        out.write_all(&buf[..read])?;
        remaining -= read as u64;
    }
    out.flush()?;
    drop(out);

    let actual: [u8; 32] = hasher.finalize().into();
    if actual != footer.digest {
        let _ = fs::remove_file(dest);
        return Err(SfxError::Integrity(format!(
            "payload corrupted: footer digest sha256:{}, payload hashes to sha256:{}",
            hex::encode(footer.digest),
            hex::encode(actual)
        )));
    }
    trace!("payload digest verified (sha256:{})", hex::encode(actual));
    Ok(())
}

/// Hash the payload range without writing it anywhere
///
/// Used for verification without extraction. The comparison against the
/// stored digest is the caller's concern.
pub fn payload_digest<R: Read + Seek>(image: &mut R, footer: &Footer) -> Result<[u8; 32]> {
    let image_len = image.seek(SeekFrom::End(0))?;
    let offset = footer.payload_offset(image_len)?;
    image.seek(SeekFrom::Start(offset))?;

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CARVE_CHUNK_SIZE];
    let mut remaining = footer.payload_length as u64;

    while remaining > 0 {
        let want = remaining.min(CARVE_CHUNK_SIZE as u64) as usize;
        let read = image.read(&mut buf[..want])?;
        if read == 0 {
            return Err(SfxError::Io(std::io::Error::new(
                ErrorKind::UnexpectedEof,
                format!("payload truncated with {remaining} bytes left to hash"),
            )));
        }
        hasher.update(&buf[..read]);
        remaining -= read as u64;
    }

    Ok(hasher.finalize().into())
}

//! Footer location and validation
//!
//! The footer is the fixed-size trailer at the end of a bundle image:
//! payload length (i64 LE), SHA-256 digest of the payload bytes, and the
//! `ASMLSFX1` marker. The marker is the format's self-identification
//! check, not a security boundary.

use log::trace;
use std::io::{Read, Seek, SeekFrom};

use super::constants::{DIGEST_SIZE, FOOTER_SIZE, LENGTH_SIZE, MARKER};
use crate::exceptions::{Result, SfxError};

/// Decoded bundle footer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    /// Byte count of the payload, from the footer's length field
    pub payload_length: i64,
    /// SHA-256 digest of the payload's exact bytes
    pub digest: [u8; DIGEST_SIZE],
}

impl Footer {
    /// Read and validate the footer from the end of a bundle image
    ///
    /// # Errors
    ///
    /// Returns `Format` if the image is shorter than the footer, the marker
    /// does not match, the length field is non-positive or exceeds the
    /// image length, or the computed payload offset would be negative.
    pub fn read_from<R: Read + Seek>(image: &mut R) -> Result<Self> {
        let image_len = image.seek(SeekFrom::End(0))?;
        if image_len < FOOTER_SIZE as u64 {
            return Err(SfxError::Format(format!(
                "image is {image_len} bytes, smaller than the {FOOTER_SIZE}-byte footer"
            )));
        }

        image.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut raw = [0u8; FOOTER_SIZE];
        image.read_exact(&mut raw)?;

        let marker = &raw[FOOTER_SIZE - MARKER.len()..];
        if marker != MARKER {
            return Err(SfxError::Format(format!(
                "footer marker mismatch: expected {:?}, found {:02x?}",
                String::from_utf8_lossy(MARKER),
                marker
            )));
        }

        let mut length_bytes = [0u8; LENGTH_SIZE];
        length_bytes.copy_from_slice(&raw[..LENGTH_SIZE]);
        let payload_length = i64::from_le_bytes(length_bytes);
        if payload_length <= 0 || payload_length as u64 > image_len {
            return Err(SfxError::Format(format!(
                "invalid payload length {payload_length} in footer (image is {image_len} bytes)"
            )));
        }

        let mut digest = [0u8; DIGEST_SIZE];
        digest.copy_from_slice(&raw[LENGTH_SIZE..LENGTH_SIZE + DIGEST_SIZE]);

        let footer = Self {
            payload_length,
            digest,
        };
        // The offset non-negativity check is the safety net for length
        // values that would reach into the footer region.
        footer.payload_offset(image_len)?;
        trace!("footer: payload_length={payload_length}");
        Ok(footer)
    }

    /// Start of the payload within an image of `image_len` bytes
    ///
    /// # Errors
    ///
    /// Returns `Format` if `image_len - FOOTER_SIZE - payload_length` is
    /// negative.
    pub fn payload_offset(&self, image_len: u64) -> Result<u64> {
        let offset = image_len as i64 - FOOTER_SIZE as i64 - self.payload_length;
        if offset < 0 {
            return Err(SfxError::Format(format!(
                "payload length {} leaves no room before the footer",
                self.payload_length
            )));
        }
        Ok(offset as u64)
    }

    /// Encode the footer, the builder-side inverse of `read_from`
    pub fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let mut raw = [0u8; FOOTER_SIZE];
        raw[..LENGTH_SIZE].copy_from_slice(&self.payload_length.to_le_bytes());
        raw[LENGTH_SIZE..LENGTH_SIZE + DIGEST_SIZE].copy_from_slice(&self.digest);
        raw[FOOTER_SIZE - MARKER.len()..].copy_from_slice(MARKER);
        raw
    }
}

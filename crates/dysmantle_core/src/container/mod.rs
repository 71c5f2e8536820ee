//! The save container: fixed header, zlib payload, embedded document span.
//!
//! Load order: header split, payload decompression, region location, layout
//! validation. Save order: overflow gate, space padding to the original
//! span, splice, length assertion, recompression, header length rewrite.
//! Header bytes 0..8 are opaque and carried through verbatim in both
//! directions.

pub mod compress;
pub mod region;

use crate::core_api::{CoreError, CoreErrorCode};
use crate::layout::{BufferLayout, ByteRange};

/// Fixed container header length.
pub const HEADER_LEN: usize = 12;
/// Offset of the little-endian payload length field inside the header.
pub const PAYLOAD_LEN_OFFSET: usize = 8;
/// Pad byte for a region that shrank below its original span.
const PADDING_BYTE: u8 = b' ';

#[derive(Debug, Clone)]
pub struct Container {
    header: [u8; HEADER_LEN],
    payload: Vec<u8>,
    decompressed: Vec<u8>,
    region: ByteRange,
}

impl Container {
    pub fn parse(bytes: &[u8]) -> Result<Self, CoreError> {
        if bytes.len() < HEADER_LEN {
            return Err(CoreError::new(
                CoreErrorCode::TooShort,
                format!(
                    "save file is {} bytes, the header alone is {HEADER_LEN}",
                    bytes.len()
                ),
            ));
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        let payload = bytes[HEADER_LEN..].to_vec();
        let decompressed = compress::decompress(&payload)?;
        let region = region::locate(&decompressed)?;
        BufferLayout::around_region(decompressed.len(), region).validate()?;
        Ok(Self {
            header,
            payload,
            decompressed,
            region,
        })
    }

    /// Payload length declared by header bytes 8..12. Surfaced for
    /// diagnosis only; decompression is the authoritative corruption check.
    pub fn declared_payload_len(&self) -> u32 {
        let mut field = [0u8; 4];
        field.copy_from_slice(&self.header[PAYLOAD_LEN_OFFSET..]);
        u32::from_le_bytes(field)
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn decompressed_len(&self) -> usize {
        self.decompressed.len()
    }

    pub fn region(&self) -> ByteRange {
        self.region
    }

    pub fn region_bytes(&self) -> &[u8] {
        &self.decompressed[self.region.start..self.region.end]
    }

    /// The original file bytes, byte for byte.
    pub fn to_bytes_unmodified(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&self.payload);
        out
    }

    /// Splices a re-serialized document region into the original buffer and
    /// emits a complete save file. The new region must fit the original
    /// span; a shorter region is padded with spaces so the decompressed
    /// length never changes.
    pub fn to_bytes_modified(&self, new_region: &[u8]) -> Result<Vec<u8>, CoreError> {
        let span = self.region.len();
        if new_region.len() > span {
            return Err(CoreError::new(
                CoreErrorCode::RegionOverflow,
                format!(
                    "edited document is {} bytes but the region at offset {} holds only {span}",
                    new_region.len(),
                    self.region.start
                ),
            ));
        }
        let mut padded = new_region.to_vec();
        padded.resize(span, PADDING_BYTE);

        let mut buffer = Vec::with_capacity(self.decompressed.len());
        buffer.extend_from_slice(&self.decompressed[..self.region.start]);
        buffer.extend_from_slice(&padded);
        buffer.extend_from_slice(&self.decompressed[self.region.end..]);
        if buffer.len() != self.decompressed.len() {
            return Err(CoreError::new(
                CoreErrorCode::LengthMismatch,
                format!(
                    "reassembled buffer is {} bytes, expected {}",
                    buffer.len(),
                    self.decompressed.len()
                ),
            ));
        }
        BufferLayout::around_region(buffer.len(), self.region).validate()?;

        let compressed = compress::compress(&buffer)?;
        let declared = u32::try_from(compressed.len()).map_err(|_| {
            CoreError::new(
                CoreErrorCode::LengthMismatch,
                format!(
                    "compressed payload of {} bytes exceeds the 32-bit header field",
                    compressed.len()
                ),
            )
        })?;
        let mut header = self.header;
        header[PAYLOAD_LEN_OFFSET..].copy_from_slice(&declared.to_le_bytes());

        let mut out = Vec::with_capacity(HEADER_LEN + compressed.len());
        out.extend_from_slice(&header);
        out.extend_from_slice(&compressed);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack(header: &[u8; HEADER_LEN], decompressed: &[u8]) -> Vec<u8> {
        let payload = compress::compress(decompressed).expect("failed to compress fixture");
        let mut bytes = header.to_vec();
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[test]
    fn too_short_input_is_rejected() {
        let err = Container::parse(&[0u8; 11]).expect_err("11 bytes should be too short");
        assert_eq!(err.code, CoreErrorCode::TooShort);
        assert!(err.message.contains("11 bytes"), "message was: {}", err.message);
    }

    #[test]
    fn header_fields_are_little_endian() {
        let mut header = [0u8; HEADER_LEN];
        header[8] = 0x01;
        header[9] = 0x02;
        let bytes = pack(&header, b"PRE<?xml version=\"1.0\"?><r><n/></r>POST");
        let container = Container::parse(&bytes).expect("failed to parse fixture");
        assert_eq!(container.declared_payload_len(), 0x0201);
        assert_eq!(container.region_bytes(), b"<?xml version=\"1.0\"?><r><n/></r>");
        assert_eq!(container.decompressed_len(), 39);
    }

    #[test]
    fn unmodified_bytes_match_input() {
        let header = [7u8; HEADER_LEN];
        let bytes = pack(&header, b"<?xml version=\"1.0\"?><r><n/></r>");
        let container = Container::parse(&bytes).expect("failed to parse fixture");
        assert_eq!(container.to_bytes_unmodified(), bytes);
    }
}

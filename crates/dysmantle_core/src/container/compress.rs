//! Zlib adapter for the container payload.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::core_api::{CoreError, CoreErrorCode};

/// Decompresses the container payload. Any stream or checksum violation is
/// reported as `CorruptPayload`.
pub fn decompress(payload: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut decoder = ZlibDecoder::new(payload);
    let mut buffer = Vec::new();
    decoder.read_to_end(&mut buffer).map_err(|e| {
        CoreError::new(
            CoreErrorCode::CorruptPayload,
            format!("failed to decompress {} byte payload: {e}", payload.len()),
        )
    })?;
    Ok(buffer)
}

/// Compresses a reassembled buffer at maximum level.
pub fn compress(buffer: &[u8]) -> Result<Vec<u8>, CoreError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(buffer).map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to compress {} byte buffer: {e}", buffer.len()),
        )
    })?;
    encoder.finish().map_err(|e| {
        CoreError::new(
            CoreErrorCode::Io,
            format!("failed to finish compressing {} byte buffer: {e}", buffer.len()),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_api::CoreErrorCode;

    #[test]
    fn compress_then_decompress_is_identity() {
        let original = b"opaque bytes <?xml?> more opaque bytes".to_vec();
        let packed = compress(&original).expect("failed to compress test buffer");
        let unpacked = decompress(&packed).expect("failed to decompress test buffer");
        assert_eq!(unpacked, original);
    }

    #[test]
    fn decompress_rejects_non_zlib_bytes() {
        let err = decompress(b"definitely not a zlib stream")
            .expect_err("garbage bytes should not decompress");
        assert_eq!(err.code, CoreErrorCode::CorruptPayload);
    }

    #[test]
    fn compress_handles_empty_input() {
        let packed = compress(&[]).expect("failed to compress empty buffer");
        let unpacked = decompress(&packed).expect("failed to decompress empty buffer");
        assert!(unpacked.is_empty());
    }
}

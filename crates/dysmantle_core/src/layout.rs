//! Byte-range bookkeeping for the decompressed save buffer.

use crate::core_api::{CoreError, CoreErrorCode};

/// Half-open byte range `[start, end)` within one buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The three contiguous segments of a decompressed save buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentId {
    /// Opaque bytes before the document region, preserved verbatim.
    Prefix,
    /// The embedded XML document span.
    Region,
    /// Opaque bytes after the document region, preserved verbatim.
    Suffix,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub id: SegmentId,
    pub range: ByteRange,
}

/// Segment layout of one decompressed buffer, in buffer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    pub buffer_len: usize,
    pub segments: [Segment; 3],
}

impl BufferLayout {
    /// Builds the prefix/region/suffix layout around a located region.
    pub fn around_region(buffer_len: usize, region: ByteRange) -> Self {
        Self {
            buffer_len,
            segments: [
                Segment {
                    id: SegmentId::Prefix,
                    range: ByteRange::new(0, region.start),
                },
                Segment {
                    id: SegmentId::Region,
                    range: region,
                },
                Segment {
                    id: SegmentId::Suffix,
                    range: ByteRange::new(region.end, buffer_len),
                },
            ],
        }
    }

    pub fn region(&self) -> ByteRange {
        self.segments[1].range
    }

    /// Checks that the segments start at byte 0, are contiguous, have no
    /// inverted ranges, and cover the buffer exactly.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut expected = 0usize;
        for segment in &self.segments {
            if segment.range.end < segment.range.start {
                return Err(CoreError::new(
                    CoreErrorCode::LengthMismatch,
                    format!(
                        "segment {:?} has inverted range {}..{}",
                        segment.id, segment.range.start, segment.range.end
                    ),
                ));
            }
            if segment.range.start != expected {
                return Err(CoreError::new(
                    CoreErrorCode::LengthMismatch,
                    format!(
                        "segment {:?} starts at byte {} but the previous segment ends at byte {}",
                        segment.id, segment.range.start, expected
                    ),
                ));
            }
            expected = segment.range.end;
        }
        if expected != self.buffer_len {
            return Err(CoreError::new(
                CoreErrorCode::LengthMismatch,
                format!(
                    "segments cover {expected} bytes but the buffer is {} bytes",
                    self.buffer_len
                ),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_range_len_is_saturating() {
        assert_eq!(ByteRange::new(4, 10).len(), 6);
        assert_eq!(ByteRange::new(10, 4).len(), 0);
        assert!(ByteRange::new(3, 3).is_empty());
    }

    #[test]
    fn layout_around_region_validates() {
        let layout = BufferLayout::around_region(100, ByteRange::new(20, 80));
        layout
            .validate()
            .expect("contiguous full-cover layout should validate");
        assert_eq!(layout.region(), ByteRange::new(20, 80));
    }

    #[test]
    fn layout_with_region_past_buffer_end_is_rejected() {
        let layout = BufferLayout::around_region(50, ByteRange::new(20, 80));
        let err = layout
            .validate()
            .expect_err("region past buffer end should fail validation");
        assert_eq!(err.code, CoreErrorCode::LengthMismatch);
    }

    #[test]
    fn empty_prefix_and_suffix_are_valid() {
        let layout = BufferLayout::around_region(64, ByteRange::new(0, 64));
        layout
            .validate()
            .expect("region spanning the whole buffer should validate");
    }
}

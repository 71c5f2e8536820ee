//! Literal-signature scan that delimits the embedded XML document.

use memchr::{memchr, memmem};

use crate::core_api::{CoreError, CoreErrorCode};
use crate::layout::ByteRange;

const DECLARATION_OPEN: &[u8] = b"<?xml";
const DECLARATION_CLOSE: &[u8] = b"?>";

/// Locates the embedded XML document span within a decompressed buffer.
///
/// Both delimiters are found by literal byte search, not by parsing: the
/// declaration and the closing root tag are guaranteed ASCII sequences even
/// though the surrounding bytes are arbitrary binary. The returned range
/// starts at the first byte of `<?xml` and ends just past the `>` of the
/// first closing tag matching the root element name.
pub fn locate(buffer: &[u8]) -> Result<ByteRange, CoreError> {
    let start = memmem::find(buffer, DECLARATION_OPEN).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::RegionNotFound,
            format!("no XML declaration in {} decompressed bytes", buffer.len()),
        )
    })?;
    let close_rel = memmem::find(&buffer[start..], DECLARATION_CLOSE).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::MalformedRegion,
            format!("unterminated XML declaration at offset {start}"),
        )
    })?;
    let after_declaration = start + close_rel + DECLARATION_CLOSE.len();

    let root = root_name(&buffer[after_declaration..]).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::MalformedRegion,
            format!("no root element after the declaration at offset {start}"),
        )
    })?;

    let mut closing = Vec::with_capacity(root.len() + 3);
    closing.extend_from_slice(b"</");
    closing.extend_from_slice(root);
    closing.push(b'>');

    let closing_rel = memmem::find(&buffer[after_declaration..], &closing).ok_or_else(|| {
        CoreError::new(
            CoreErrorCode::MalformedRegion,
            format!(
                "missing closing tag {} for the document starting at offset {start}",
                String::from_utf8_lossy(&closing)
            ),
        )
    })?;
    let end = after_declaration + closing_rel + closing.len();
    Ok(ByteRange::new(start, end))
}

/// Name of the first element opened after the declaration. Skips `<` bytes
/// that do not open an element (comments, stray binary).
fn root_name(bytes: &[u8]) -> Option<&[u8]> {
    let mut from = 0;
    while from < bytes.len() {
        let lt = memchr(b'<', &bytes[from..])? + from;
        let name_start = lt + 1;
        if name_start < bytes.len() && is_name_start(bytes[name_start]) {
            let mut name_end = name_start;
            while name_end < bytes.len() && is_name_byte(bytes[name_end]) {
                name_end += 1;
            }
            return Some(&bytes[name_start..name_end]);
        }
        from = lt + 1;
    }
    None
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.' | b':')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_document_between_opaque_bytes() {
        let buffer = b"\x00\x01BIN<?xml version=\"1.0\"?><root><a/></root>\xfftrailer";
        let range = locate(buffer).expect("failed to locate document span");
        assert_eq!(&buffer[range.start..range.start + 5], b"<?xml");
        assert!(buffer[range.start..range.end].ends_with(b"</root>"));
        assert_eq!(&buffer[range.end..], b"\xfftrailer");
    }

    #[test]
    fn root_name_skips_comment_before_root() {
        let buffer = b"<?xml version=\"1.0\"?><!-- c --><save><n/></save>";
        let range = locate(buffer).expect("failed to locate document span");
        assert_eq!(range.start, 0);
        assert_eq!(range.end, buffer.len());
    }

    #[test]
    fn missing_declaration_is_region_not_found() {
        let err = locate(b"no markup here at all").expect_err("span should not be found");
        assert_eq!(err.code, CoreErrorCode::RegionNotFound);
    }

    #[test]
    fn unterminated_declaration_is_malformed() {
        let err = locate(b"junk<?xml version=\"1.0\"").expect_err("span should be malformed");
        assert_eq!(err.code, CoreErrorCode::MalformedRegion);
        assert!(err.message.contains("offset 4"), "message was: {}", err.message);
    }

    #[test]
    fn missing_closing_tag_is_malformed() {
        let err = locate(b"<?xml version=\"1.0\"?><root><open>").expect_err("span should be malformed");
        assert_eq!(err.code, CoreErrorCode::MalformedRegion);
        assert!(err.message.contains("</root>"), "message was: {}", err.message);
    }

    #[test]
    fn declaration_with_no_element_is_malformed() {
        let err = locate(b"<?xml version=\"1.0\"?>   ").expect_err("span should be malformed");
        assert_eq!(err.code, CoreErrorCode::MalformedRegion);
    }
}

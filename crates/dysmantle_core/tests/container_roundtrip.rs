use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use dysmantle_core::container::{Container, HEADER_LEN, PAYLOAD_LEN_OFFSET};
use dysmantle_core::core_api::CoreErrorCode;

const DOC: &[u8] = b"<?xml version=\"1.0\"?><root><array id=\"PLAYER_STATE\"><node id=\"respawn\" location=\"1,2,3\" stage=\"s\" enabled=\"0\"/></array></root>";

fn pack(header_front: [u8; 8], decompressed: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(decompressed)
        .expect("failed to compress fixture buffer");
    let payload = encoder
        .finish()
        .expect("failed to finish fixture compression");
    let mut bytes = header_front.to_vec();
    bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}

fn build_save(prefix: &[u8], doc: &[u8], suffix: &[u8]) -> Vec<u8> {
    let mut decompressed = Vec::new();
    decompressed.extend_from_slice(prefix);
    decompressed.extend_from_slice(doc);
    decompressed.extend_from_slice(suffix);
    pack([0; 8], &decompressed)
}

fn unpack(file_bytes: &[u8]) -> Vec<u8> {
    let mut decoder = ZlibDecoder::new(&file_bytes[HEADER_LEN..]);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .expect("failed to decompress emitted payload");
    decompressed
}

#[test]
fn parse_splits_header_and_locates_region() {
    let bytes = build_save(b"PREFIX", DOC, b"SUFFIX");
    let container = Container::parse(&bytes).expect("failed to parse fixture save");
    assert_eq!(container.region_bytes(), DOC);
    assert_eq!(container.region().start, 6);
    assert_eq!(container.region().end, 6 + DOC.len());
    assert_eq!(container.decompressed_len(), DOC.len() + 12);
    assert_eq!(container.payload_len(), bytes.len() - HEADER_LEN);
    assert_eq!(
        container.declared_payload_len() as usize,
        container.payload_len()
    );
}

#[test]
fn corrupt_payload_is_rejected() {
    let mut bytes = vec![0u8; HEADER_LEN];
    bytes.extend_from_slice(b"this is not a zlib stream");
    let err = Container::parse(&bytes).expect_err("garbage payload should not parse");
    assert_eq!(err.code, CoreErrorCode::CorruptPayload);
}

#[test]
fn buffer_without_declaration_is_region_not_found() {
    let bytes = pack([0; 8], b"just opaque bytes, no document anywhere");
    let err = Container::parse(&bytes).expect_err("missing declaration should not parse");
    assert_eq!(err.code, CoreErrorCode::RegionNotFound);
}

#[test]
fn truncated_document_is_malformed_region() {
    let bytes = pack([0; 8], b"PRE<?xml version=\"1.0\"?><root><a>");
    let err = Container::parse(&bytes).expect_err("truncated document should not parse");
    assert_eq!(err.code, CoreErrorCode::MalformedRegion);
}

#[test]
fn unmodified_bytes_are_byte_identical_to_input() {
    let bytes = build_save(b"PREFIX", DOC, b"SUFFIX");
    let container = Container::parse(&bytes).expect("failed to parse fixture save");
    assert_eq!(container.to_bytes_unmodified(), bytes);
}

#[test]
fn modified_roundtrip_pads_region_and_preserves_surroundings() {
    let bytes = build_save(b"PREFIX", DOC, b"SUFFIX");
    let container = Container::parse(&bytes).expect("failed to parse fixture save");

    let new_region = b"<?xml version=\"1.0\"?><root/>";
    assert!(new_region.len() < DOC.len());
    let out = container
        .to_bytes_modified(new_region)
        .expect("failed to emit modified save");

    let decompressed = unpack(&out);
    assert_eq!(decompressed.len(), container.decompressed_len());
    assert_eq!(&decompressed[..6], b"PREFIX");
    assert_eq!(&decompressed[decompressed.len() - 6..], b"SUFFIX");

    let region = &decompressed[6..6 + DOC.len()];
    assert_eq!(&region[..new_region.len()], new_region);
    assert!(
        region[new_region.len()..].iter().all(|&b| b == b' '),
        "shrunken region must be space-padded to the original span"
    );
}

#[test]
fn modified_header_declares_the_new_payload_length() {
    let front = *b"DYSMHDR1";
    let mut decompressed = Vec::new();
    decompressed.extend_from_slice(b"\x00\x01\x02");
    decompressed.extend_from_slice(DOC);
    decompressed.extend_from_slice(b"\xfe\xff");
    let bytes = pack(front, &decompressed);

    let container = Container::parse(&bytes).expect("failed to parse fixture save");
    let out = container
        .to_bytes_modified(b"<?xml version=\"1.0\"?><r/>")
        .expect("failed to emit modified save");

    assert_eq!(&out[..8], &front, "opaque header bytes must carry through");
    let declared = u32::from_le_bytes([
        out[PAYLOAD_LEN_OFFSET],
        out[PAYLOAD_LEN_OFFSET + 1],
        out[PAYLOAD_LEN_OFFSET + 2],
        out[PAYLOAD_LEN_OFFSET + 3],
    ]);
    assert_eq!(declared as usize, out.len() - HEADER_LEN);
}

#[test]
fn region_growing_past_its_span_is_rejected() {
    let bytes = build_save(b"PREFIX", DOC, b"SUFFIX");
    let container = Container::parse(&bytes).expect("failed to parse fixture save");

    let mut grown = DOC.to_vec();
    grown.extend_from_slice(b"<!-- one byte too many -->");
    let err = container
        .to_bytes_modified(&grown)
        .expect_err("grown region should be refused");
    assert_eq!(err.code, CoreErrorCode::RegionOverflow);
}

#[test]
fn region_may_fill_the_whole_buffer() {
    let bytes = build_save(b"", DOC, b"");
    let container = Container::parse(&bytes).expect("failed to parse fixture save");
    assert_eq!(container.region().start, 0);
    assert_eq!(container.region().end, container.decompressed_len());

    let out = container
        .to_bytes_modified(DOC)
        .expect("failed to emit same-length save");
    assert_eq!(unpack(&out), DOC);
}

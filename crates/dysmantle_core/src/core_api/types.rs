use serde::{Deserialize, Serialize};

use crate::document::rules::AttributeKind;

/// Byte span of the document region within the decompressed buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionSpan {
    pub start: usize,
    pub end: usize,
}

/// Container-level facts captured when a session opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub root_name: String,
    /// Payload length claimed by header bytes 8..12; may disagree with
    /// `payload_len` on a file another tool truncated or extended.
    pub declared_payload_len: u32,
    pub payload_len: usize,
    pub decompressed_len: usize,
    pub region: RegionSpan,
    pub node_count: usize,
    pub editable_node_count: usize,
}

/// One attribute as exposed to the editing surface. A composite location
/// attribute appears as three entries named by its virtual fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeEntry {
    pub name: String,
    pub value: String,
    pub kind: AttributeKind,
}

/// One child of the player-state array. `attributes` excludes `id`, which
/// is hoisted here and never editable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeEntry {
    pub id: String,
    pub editable: bool,
    pub attributes: Vec<AttributeEntry>,
}

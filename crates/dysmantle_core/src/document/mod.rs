//! In-memory model of the embedded XML document.
//!
//! Region bytes are treated as single-byte-per-character text: byte value
//! `b` decodes to the char with code point `b` and re-encodes to the same
//! byte, so transcoding can never corrupt a byte of the region. The XML
//! declaration and any whitespace before the root element are kept as a raw
//! prolog and re-emitted verbatim, so an unmodified round trip does not
//! drift in length.

pub mod rules;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::core_api::{CoreError, CoreErrorCode};

/// One XML element: ordered attributes, ordered children, text before the
/// first child, and tail text between this element's close and the next
/// sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: String,
    pub tail: String,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Replaces an existing attribute in place or appends a new one, so
    /// attribute order is stable across edits.
    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Deletes an attribute entirely. Returns false if it was not present.
    pub fn remove_attribute(&mut self, name: &str) -> bool {
        let before = self.attributes.len();
        self.attributes.retain(|(key, _)| key != name);
        self.attributes.len() != before
    }

    pub fn id(&self) -> Option<&str> {
        self.attribute("id")
    }
}

/// A parsed document region: raw prolog plus the element tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub prolog: String,
    pub root: Element,
}

impl Document {
    /// Parses region bytes as produced by the region locator.
    pub fn parse(region: &[u8]) -> Result<Self, CoreError> {
        let text = decode_latin1(region);
        let prolog_len = prolog_len(&text)?;
        let prolog = text[..prolog_len].to_string();

        let mut reader = Reader::from_str(&text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    stack.push(element_from_start(&e)?);
                }
                Ok(Event::Empty(e)) => {
                    let element = element_from_start(&e)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::End(_)) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| invalid("closing tag without a matching open"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Ok(Event::Text(e)) => {
                    let unescaped = e
                        .unescape()
                        .map_err(|e| invalid(format!("failed to decode text: {e}")))?;
                    if let Some(current) = stack.last_mut() {
                        match current.children.last_mut() {
                            Some(last_child) => last_child.tail.push_str(&unescaped),
                            None => current.text.push_str(&unescaped),
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(invalid(format!(
                        "XML parse error at byte {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
        }
        if !stack.is_empty() {
            return Err(invalid(format!(
                "unclosed element <{}> at end of region",
                stack[stack.len() - 1].name
            )));
        }
        let root = root.ok_or_else(|| invalid("no root element in region"))?;
        Ok(Self { prolog, root })
    }

    /// Serializes the prolog verbatim followed by the element tree in
    /// canonical form (double-quoted attributes, `<e/>` for childless
    /// textless elements).
    pub fn serialize(&self) -> Result<Vec<u8>, CoreError> {
        let mut writer = Writer::new(Vec::new());
        write_element(&mut writer, &self.root)?;
        let body = String::from_utf8(writer.into_inner())
            .map_err(|e| CoreError::new(CoreErrorCode::Io, format!("serializer produced invalid UTF-8: {e}")))?;
        let mut text = String::with_capacity(self.prolog.len() + body.len());
        text.push_str(&self.prolog);
        text.push_str(&body);
        encode_latin1(&text)
    }

    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    /// First `array` element with the given `id`, in document order.
    pub fn find_array(&self, id: &str) -> Option<&Element> {
        find_in(&self.root, "array", id)
    }

    pub fn find_array_mut(&mut self, id: &str) -> Option<&mut Element> {
        find_in_mut(&mut self.root, "array", id)
    }

    /// First `node` element with the given `id`, in document order.
    pub fn find_node(&self, id: &str) -> Option<&Element> {
        find_in(&self.root, "node", id)
    }
}

fn find_in<'a>(element: &'a Element, name: &str, id: &str) -> Option<&'a Element> {
    if element.name == name && element.id() == Some(id) {
        return Some(element);
    }
    for child in &element.children {
        if let Some(found) = find_in(child, name, id) {
            return Some(found);
        }
    }
    None
}

fn find_in_mut<'a>(element: &'a mut Element, name: &str, id: &str) -> Option<&'a mut Element> {
    if element.name == name && element.attribute("id") == Some(id) {
        return Some(element);
    }
    for child in element.children.iter_mut() {
        if let Some(found) = find_in_mut(child, name, id) {
            return Some(found);
        }
    }
    None
}

/// Byte length of the raw prolog: the XML declaration, if present, plus any
/// whitespace run that follows it.
fn prolog_len(text: &str) -> Result<usize, CoreError> {
    if !text.starts_with("<?xml") {
        return Ok(0);
    }
    let close = text
        .find("?>")
        .ok_or_else(|| invalid("unterminated XML declaration"))?;
    let mut end = close + 2;
    for c in text[end..].chars() {
        if !c.is_ascii_whitespace() {
            break;
        }
        end += c.len_utf8();
    }
    Ok(end)
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, CoreError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr =
            attr.map_err(|e| invalid(format!("bad attribute in <{}>: {e}", element.name)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| invalid(format!("failed to decode attribute {key}: {e}")))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut Vec<Element>,
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CoreError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(invalid(format!(
            "second top-level element <{}> after the root closed",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn write_element(writer: &mut Writer<Vec<u8>>, element: &Element) -> Result<(), CoreError> {
    let mut start = BytesStart::new(element.name.as_str());
    for (name, value) in &element.attributes {
        start.push_attribute((name.as_str(), value.as_str()));
    }
    if element.children.is_empty() && element.text.is_empty() {
        writer
            .write_event(Event::Empty(start))
            .map_err(|e| emit_error(&element.name, e))?;
    } else {
        writer
            .write_event(Event::Start(start))
            .map_err(|e| emit_error(&element.name, e))?;
        if !element.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&element.text)))
                .map_err(|e| emit_error(&element.name, e))?;
        }
        for child in &element.children {
            write_element(writer, child)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(element.name.as_str())))
            .map_err(|e| emit_error(&element.name, e))?;
    }
    if !element.tail.is_empty() {
        writer
            .write_event(Event::Text(BytesText::new(&element.tail)))
            .map_err(|e| emit_error(&element.name, e))?;
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::new(CoreErrorCode::InvalidDocument, message)
}

fn emit_error(element_name: &str, e: impl std::fmt::Display) -> CoreError {
    CoreError::new(
        CoreErrorCode::Io,
        format!("failed to serialize element <{element_name}>: {e}"),
    )
}

pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

pub(crate) fn encode_latin1(text: &str) -> Result<Vec<u8>, CoreError> {
    let mut bytes = Vec::with_capacity(text.len());
    for c in text.chars() {
        let cp = c as u32;
        if cp > 0xFF {
            return Err(CoreError::new(
                CoreErrorCode::InvalidDocument,
                format!("character {c:?} (U+{cp:04X}) does not fit the save encoding"),
            ));
        }
        bytes.push(cp as u8);
    }
    Ok(bytes)
}

pub(crate) fn fits_latin1(text: &str) -> bool {
    text.chars().all(|c| (c as u32) <= 0xFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE: &[u8] =
        b"<?xml version=\"1.0\"?>\n<root><array id=\"PLAYER_STATE\">\n  <node id=\"respawn\" location=\"1,2,3\"/>\n</array></root>";

    #[test]
    fn parses_prolog_elements_and_attributes() {
        let doc = Document::parse(SIMPLE).expect("failed to parse document");
        assert_eq!(doc.prolog, "<?xml version=\"1.0\"?>\n");
        assert_eq!(doc.root_name(), "root");
        let array = doc.find_array("PLAYER_STATE").expect("missing array");
        assert_eq!(array.children.len(), 1);
        let node = doc.find_node("respawn").expect("missing node");
        assert_eq!(node.attribute("location"), Some("1,2,3"));
        assert_eq!(node.attribute("missing"), None);
    }

    #[test]
    fn serialization_keeps_prolog_and_whitespace_between_elements() {
        let doc = Document::parse(SIMPLE).expect("failed to parse document");
        let bytes = doc.serialize().expect("failed to serialize document");
        let text = decode_latin1(&bytes);
        assert!(text.starts_with("<?xml version=\"1.0\"?>\n<root>"));
        assert!(text.contains("<array id=\"PLAYER_STATE\">\n  <node"));
        assert!(text.ends_with("</array></root>"));
    }

    #[test]
    fn reserialized_document_reparses_to_the_same_tree() {
        let doc = Document::parse(SIMPLE).expect("failed to parse document");
        let bytes = doc.serialize().expect("failed to serialize document");
        let again = Document::parse(&bytes).expect("failed to reparse serialized bytes");
        assert_eq!(again, doc);
    }

    #[test]
    fn high_bytes_round_trip_through_the_tree() {
        let region = b"<?xml version=\"1.0\"?><root><node id=\"n\" name=\"caf\xe9\"/></root>";
        let doc = Document::parse(region).expect("failed to parse high-byte document");
        let node = doc.find_node("n").expect("missing node");
        assert_eq!(node.attribute("name"), Some("caf\u{e9}"));
        let bytes = doc.serialize().expect("failed to serialize high-byte document");
        assert!(bytes.windows(4).any(|w| w == b"caf\xe9"));
    }

    #[test]
    fn escaped_attribute_values_round_trip() {
        let region = b"<?xml version=\"1.0\"?><root><node id=\"n\" v=\"a&amp;b&lt;c\"/></root>";
        let doc = Document::parse(region).expect("failed to parse escaped document");
        assert_eq!(
            doc.find_node("n").expect("missing node").attribute("v"),
            Some("a&b<c")
        );
        let bytes = doc.serialize().expect("failed to serialize escaped document");
        let again = Document::parse(&bytes).expect("failed to reparse escaped bytes");
        assert_eq!(again.root, doc.root);
    }

    #[test]
    fn element_text_is_kept() {
        let region = b"<?xml version=\"1.0\"?><root><v id=\"x\">12</v></root>";
        let doc = Document::parse(region).expect("failed to parse document with text");
        assert_eq!(doc.root.children[0].text, "12");
        let bytes = doc.serialize().expect("failed to serialize document with text");
        let text = decode_latin1(&bytes);
        assert!(text.contains("<v id=\"x\">12</v>"));
    }

    #[test]
    fn unbalanced_tags_are_invalid() {
        let err = Document::parse(b"<?xml version=\"1.0\"?><root><a></root>")
            .expect_err("unbalanced tags should not parse");
        assert_eq!(err.code, CoreErrorCode::InvalidDocument);
    }

    #[test]
    fn empty_region_is_invalid() {
        let err = Document::parse(b"").expect_err("empty region should not parse");
        assert_eq!(err.code, CoreErrorCode::InvalidDocument);
    }

    #[test]
    fn set_attribute_preserves_order_and_remove_deletes() {
        let mut element = Element::new("node");
        element.set_attribute("id", "slot_1");
        element.set_attribute("amount", "4");
        element.set_attribute("material", "WOOD");
        element.set_attribute("amount", "9");
        assert_eq!(
            element.attributes,
            vec![
                ("id".to_string(), "slot_1".to_string()),
                ("amount".to_string(), "9".to_string()),
                ("material".to_string(), "WOOD".to_string()),
            ]
        );
        assert!(element.remove_attribute("material"));
        assert!(!element.remove_attribute("material"));
        assert_eq!(element.attribute("material"), None);
    }

    #[test]
    fn encode_rejects_characters_outside_the_save_encoding() {
        let err = encode_latin1("snowman \u{2603}").expect_err("U+2603 should not encode");
        assert_eq!(err.code, CoreErrorCode::InvalidDocument);
        assert!(fits_latin1("caf\u{e9}"));
        assert!(!fits_latin1("\u{2603}"));
    }
}

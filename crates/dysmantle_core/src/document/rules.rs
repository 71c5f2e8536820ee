//! Pure classification and lexical validation for node attributes.
//!
//! Nothing here touches the tree or does I/O; the editing session decides
//! what to do with a classification, and the save pipeline applies the
//! normalization rules (location rejoining, zero-amount slot cleanup).

use serde::{Deserialize, Serialize};

use crate::catalog;
use super::Element;

/// Name of the composite coordinate attribute.
pub const LOCATION_ATTR: &str = "location";

/// Virtual field names the editing surface exposes for one `location`
/// attribute, in component order.
pub const LOCATION_FIELDS: [&str; 3] = ["location_x", "location_y", "location_z"];

/// Attribute-name fragments, matched case-insensitively, that mark a value
/// as boolean-coded when the current value is a 0/1 bit.
const BOOLEAN_NAME_HINTS: [&str; 6] = ["enabled", "active", "is_", "has_", "allow_", "use_"];

/// How an attribute value is interpreted and validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// `"0"`/`"1"` flag.
    Boolean,
    /// Integer or single-dot decimal text, optionally negative.
    Numeric,
    /// Material quantity on the quantity-keyed container node.
    Quantity,
    /// Material identifier on a slot node.
    Material,
    /// Comma-joined three-component coordinate.
    Location,
    /// Free text, copied through unchanged.
    Text,
}

/// Classifies one attribute from its owning node id, its name, and its
/// current value. The current value participates because the name
/// heuristics only apply to values that already look like the kind.
pub fn classify(node_id: &str, name: &str, value: &str) -> AttributeKind {
    if catalog::is_always_boolean_id(node_id) && name != "id" {
        return AttributeKind::Boolean;
    }
    if node_id == catalog::MATERIAL_STORAGE_ID && catalog::is_material(name) {
        return AttributeKind::Quantity;
    }
    if node_id.starts_with(catalog::SLOT_ID_PREFIX) && name == "material" {
        return AttributeKind::Material;
    }
    if name == LOCATION_ATTR && split_location(value).is_some() {
        return AttributeKind::Location;
    }
    if name_hints_boolean(name) && is_bit_text(value) {
        return AttributeKind::Boolean;
    }
    if is_numeric_text(value) {
        return AttributeKind::Numeric;
    }
    AttributeKind::Text
}

/// Whether a player-state node accepts edits. Inert nodes are engine
/// bookkeeping and must round-trip untouched.
pub fn is_editable(element: &Element) -> bool {
    let Some(id) = element.id() else {
        return false;
    };
    if id.is_empty() || element.attributes.len() <= 1 {
        return false;
    }
    if catalog::is_inert_id(id) {
        return false;
    }
    if id.starts_with("stages/") && element.attribute("leave_position").is_some() {
        return false;
    }
    true
}

/// Index of a virtual location field name, if `name` is one.
pub fn location_field_index(name: &str) -> Option<usize> {
    LOCATION_FIELDS.iter().position(|field| *field == name)
}

/// Exactly `"0"` or `"1"`, the only boolean texts the format uses. Spellings
/// that merely parse to 0 or 1 (`"+1"`, `"01"`, `"-0"`) are not bits.
pub fn is_bit_text(value: &str) -> bool {
    matches!(value, "0" | "1")
}

/// Integer or decimal text: optional leading `-`, ASCII digits, at most one
/// `.`, no `,`, at least one digit.
pub fn is_numeric_text(value: &str) -> bool {
    let rest = value.strip_prefix('-').unwrap_or(value);
    if rest.is_empty() {
        return false;
    }
    let mut dots = 0usize;
    for c in rest.chars() {
        match c {
            '0'..='9' => {}
            '.' => {
                dots += 1;
                if dots > 1 {
                    return false;
                }
            }
            _ => return false,
        }
    }
    rest.chars().any(|c| c.is_ascii_digit())
}

/// Non-negative integer text, the only quantity form the format uses.
pub fn is_quantity_text(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Splits a composite location value into its three components, or `None`
/// if the value is not three comma-joined numeric texts.
pub fn split_location(value: &str) -> Option<[String; 3]> {
    let mut parts = value.split(',');
    let x = parts.next()?;
    let y = parts.next()?;
    let z = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    if !(is_numeric_text(x) && is_numeric_text(y) && is_numeric_text(z)) {
        return None;
    }
    Some([x.to_string(), y.to_string(), z.to_string()])
}

/// Rejoins location components in fixed X,Y,Z order.
pub fn join_location(components: &[String; 3]) -> String {
    components.join(",")
}

fn name_hints_boolean(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    BOOLEAN_NAME_HINTS.iter().any(|hint| name.contains(hint))
}

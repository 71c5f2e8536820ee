use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::catalog;
use crate::container::Container;
use crate::document::rules::{self, AttributeKind};
use crate::document::{self, Document, Element};

use super::error::{CoreError, CoreErrorCode};
use super::types::{AttributeEntry, NodeEntry, RegionSpan, Snapshot};

/// Stateless entry point that opens editing sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }

    /// Opens a session from in-memory bytes. No backup is taken; hosts that
    /// hold a file on disk should use [`Engine::open_path`].
    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let container = Container::parse(bytes.as_ref())?;
        let document = Document::parse(container.region_bytes())?;
        if document.find_array(catalog::PLAYER_STATE_ID).is_none() {
            return Err(CoreError::new(
                CoreErrorCode::PlayerStateMissing,
                format!(
                    "document <{}> has no array with id \"{}\"",
                    document.root_name(),
                    catalog::PLAYER_STATE_ID
                ),
            ));
        }
        let snapshot = build_snapshot(&container, &document);
        Ok(Session {
            container,
            document,
            snapshot,
            staging: BTreeMap::new(),
            backup_path: None,
        })
    }

    /// Opens a session from a file and copies the original bytes into
    /// `backup_dir`. The copy is made only after the container parses, so
    /// unreadable files leave no backup litter, and a copy failure aborts
    /// the open: no session exists without its backup.
    pub fn open_path(&self, path: &Path, backup_dir: &Path) -> Result<Session, CoreError> {
        let bytes = fs::read(path).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to read {}: {e}", path.display()),
            )
        })?;
        let mut session = self.open_bytes(&bytes)?;
        session.backup_path = Some(write_backup(path, backup_dir)?);
        Ok(session)
    }
}

/// Staged change to one attribute; raw text until save applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StagedEdit {
    Set(String),
    Remove,
}

/// One open save: parsed container and document plus edits staged this
/// session. Staged values are raw text keyed by (node id, attribute name);
/// normalization (location rejoining, slot cleanup) happens once, at save.
#[derive(Debug, Clone)]
pub struct Session {
    container: Container,
    document: Document,
    snapshot: Snapshot,
    staging: BTreeMap<(String, String), StagedEdit>,
    backup_path: Option<PathBuf>,
}

impl Session {
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Where the original file was backed up, when opened via `open_path`.
    pub fn backup_path(&self) -> Option<&Path> {
        self.backup_path.as_deref()
    }

    pub fn has_edits(&self) -> bool {
        !self.staging.is_empty()
    }

    /// All children of the player-state array in document order, staged
    /// values merged in.
    pub fn nodes(&self) -> Vec<NodeEntry> {
        let Some(array) = self.document.find_array(catalog::PLAYER_STATE_ID) else {
            return Vec::new();
        };
        array
            .children
            .iter()
            .map(|child| self.node_entry(child))
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<NodeEntry> {
        let array = self.document.find_array(catalog::PLAYER_STATE_ID)?;
        let element = array.children.iter().find(|child| child.id() == Some(id))?;
        Some(self.node_entry(element))
    }

    /// Current value of one attribute, staged edits winning over the tree.
    /// Virtual location fields resolve to their component.
    pub fn get_value(&self, node_id: &str, name: &str) -> Option<String> {
        match self.staged(node_id, name) {
            Some(StagedEdit::Set(value)) => return Some(value.clone()),
            Some(StagedEdit::Remove) => return None,
            None => {}
        }
        let array = self.document.find_array(catalog::PLAYER_STATE_ID)?;
        let element = array
            .children
            .iter()
            .find(|child| child.id() == Some(node_id))?;
        if let Some(index) = rules::location_field_index(name) {
            let location = element.attribute(rules::LOCATION_ATTR)?;
            let parts = rules::split_location(location)?;
            return Some(parts[index].clone());
        }
        element.attribute(name).map(str::to_string)
    }

    /// Stages one attribute edit after validating it against the attribute's
    /// kind. Rejections leave the session and all other staged edits intact.
    pub fn set_value(&mut self, node_id: &str, name: &str, value: &str) -> Result<(), CoreError> {
        if name == "id" {
            return Err(invalid_edit("the id attribute is not editable"));
        }
        if !document::fits_latin1(value) {
            return Err(invalid_edit(format!(
                "value {value:?} does not fit the save encoding"
            )));
        }
        let element = self.editable_element(node_id)?;
        if rules::location_field_index(name).is_some() {
            let has_location = element
                .attribute(rules::LOCATION_ATTR)
                .and_then(rules::split_location)
                .is_some();
            if !has_location {
                return Err(invalid_edit(format!(
                    "node \"{node_id}\" has no composite location attribute"
                )));
            }
            if !rules::is_numeric_text(value) {
                return Err(invalid_edit(format!(
                    "location component expects numeric text, got {value:?}"
                )));
            }
        } else {
            // Staged state wins: a material added this session is editable
            // even though the tree does not carry it yet, and a removed one
            // is not.
            let current = match self.staged(node_id, name) {
                Some(StagedEdit::Set(staged)) => Some(staged.clone()),
                Some(StagedEdit::Remove) => None,
                None => element.attribute(name).map(str::to_string),
            };
            let Some(current) = current else {
                return Err(invalid_edit(format!(
                    "node \"{node_id}\" has no attribute \"{name}\""
                )));
            };
            match rules::classify(node_id, name, &current) {
                AttributeKind::Boolean => {
                    if !rules::is_bit_text(value) {
                        return Err(invalid_edit(format!(
                            "attribute \"{name}\" expects 0 or 1, got {value:?}"
                        )));
                    }
                }
                AttributeKind::Numeric => {
                    if !rules::is_numeric_text(value) {
                        return Err(invalid_edit(format!(
                            "attribute \"{name}\" expects integer or decimal text, got {value:?}"
                        )));
                    }
                }
                AttributeKind::Quantity => {
                    if !rules::is_quantity_text(value) {
                        return Err(invalid_edit(format!(
                            "attribute \"{name}\" expects a non-negative integer, got {value:?}"
                        )));
                    }
                }
                AttributeKind::Material => {
                    if !catalog::is_material(value) {
                        return Err(invalid_edit(format!("unknown material {value:?}")));
                    }
                }
                AttributeKind::Location => {
                    if rules::split_location(value).is_none() {
                        return Err(invalid_edit(format!(
                            "attribute \"{name}\" expects three comma-joined numeric components, got {value:?}"
                        )));
                    }
                }
                AttributeKind::Text => {}
            }
        }
        self.staging.insert(
            (node_id.to_string(), name.to_string()),
            StagedEdit::Set(value.to_string()),
        );
        Ok(())
    }

    /// Stages a new material entry on the storage container at quantity 0.
    pub fn add_material(&mut self, node_id: &str, material: &str) -> Result<(), CoreError> {
        if node_id != catalog::MATERIAL_STORAGE_ID {
            return Err(invalid_edit(format!(
                "node \"{node_id}\" is not the material storage container"
            )));
        }
        if material.is_empty() || !catalog::is_material(material) {
            return Err(invalid_edit(format!("unknown material {material:?}")));
        }
        let element = self.editable_element(node_id)?;
        let on_element = element.attribute(material).is_some();
        let staged_set = matches!(self.staged(node_id, material), Some(StagedEdit::Set(_)));
        let staged_removed = matches!(self.staged(node_id, material), Some(StagedEdit::Remove));
        if (on_element && !staged_removed) || staged_set {
            return Err(invalid_edit(format!("material {material} is already tracked")));
        }
        self.staging.insert(
            (node_id.to_string(), material.to_string()),
            StagedEdit::Set("0".to_string()),
        );
        Ok(())
    }

    /// Stages removal of a material entry; the attribute is deleted at save,
    /// not set to zero.
    pub fn remove_material(&mut self, node_id: &str, material: &str) -> Result<(), CoreError> {
        if node_id != catalog::MATERIAL_STORAGE_ID {
            return Err(invalid_edit(format!(
                "node \"{node_id}\" is not the material storage container"
            )));
        }
        let element = self.editable_element(node_id)?;
        let on_element = element.attribute(material).is_some();
        let staged_set = matches!(self.staged(node_id, material), Some(StagedEdit::Set(_)));
        if !on_element && !staged_set {
            return Err(invalid_edit(format!("material {material:?} is not tracked")));
        }
        if !on_element {
            // The add never reached the tree; dropping the staged entry is
            // the whole removal.
            self.staging
                .remove(&(node_id.to_string(), material.to_string()));
            return Ok(());
        }
        self.staging.insert(
            (node_id.to_string(), material.to_string()),
            StagedEdit::Remove,
        );
        Ok(())
    }

    /// The original file bytes, byte for byte.
    pub fn to_bytes_unmodified(&self) -> Vec<u8> {
        self.container.to_bytes_unmodified()
    }

    /// Applies staged edits and save-time normalization to a copy of the
    /// document, then re-encodes the full container.
    pub fn to_bytes_modified(&self) -> Result<Vec<u8>, CoreError> {
        let document = self.edited_document()?;
        let region = document.serialize()?;
        self.container.to_bytes_modified(&region)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CoreError> {
        let bytes = self.to_bytes_modified()?;
        fs::write(path, &bytes).map_err(|e| {
            CoreError::new(
                CoreErrorCode::WriteFailed,
                format!("failed to write {}: {e}", path.display()),
            )
        })
    }

    fn staged(&self, node_id: &str, name: &str) -> Option<&StagedEdit> {
        self.staging.get(&(node_id.to_string(), name.to_string()))
    }

    fn editable_element(&self, node_id: &str) -> Result<&Element, CoreError> {
        let array = self
            .document
            .find_array(catalog::PLAYER_STATE_ID)
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::PlayerStateMissing,
                    format!("no array with id \"{}\"", catalog::PLAYER_STATE_ID),
                )
            })?;
        let element = array
            .children
            .iter()
            .find(|child| child.id() == Some(node_id))
            .ok_or_else(|| invalid_edit(format!("no node with id \"{node_id}\"")))?;
        if !rules::is_editable(element) {
            return Err(invalid_edit(format!("node \"{node_id}\" is not editable")));
        }
        Ok(element)
    }

    fn node_entry(&self, element: &Element) -> NodeEntry {
        let id = element.id().unwrap_or("").to_string();
        let editable = rules::is_editable(element);
        let mut attributes = Vec::new();
        for (name, value) in &element.attributes {
            if name == "id" {
                continue;
            }
            match rules::classify(&id, name, value) {
                AttributeKind::Location => {
                    if let Some(parts) = rules::split_location(value) {
                        for (field, part) in rules::LOCATION_FIELDS.iter().zip(parts.iter()) {
                            let value = match self.staged(&id, field) {
                                Some(StagedEdit::Set(staged)) => staged.clone(),
                                _ => part.clone(),
                            };
                            attributes.push(AttributeEntry {
                                name: field.to_string(),
                                value,
                                kind: AttributeKind::Location,
                            });
                        }
                    }
                }
                kind => match self.staged(&id, name) {
                    Some(StagedEdit::Remove) => {}
                    Some(StagedEdit::Set(staged)) => attributes.push(AttributeEntry {
                        name: name.clone(),
                        value: staged.clone(),
                        kind,
                    }),
                    None => attributes.push(AttributeEntry {
                        name: name.clone(),
                        value: value.clone(),
                        kind,
                    }),
                },
            }
        }
        // Materials staged onto the container this session, not yet in the
        // tree.
        for ((node_id, name), edit) in &self.staging {
            if node_id != &id {
                continue;
            }
            if let StagedEdit::Set(value) = edit {
                if element.attribute(name).is_none() && rules::location_field_index(name).is_none()
                {
                    attributes.push(AttributeEntry {
                        name: name.clone(),
                        value: value.clone(),
                        kind: rules::classify(&id, name, value),
                    });
                }
            }
        }
        NodeEntry {
            id,
            editable,
            attributes,
        }
    }

    /// Clones the tree and applies, per node: staged location components
    /// rejoined into the composite attribute, staged sets and removals, and
    /// the zero-amount slot cleanup. Slot cleanup runs for every slot node,
    /// edited or not.
    fn edited_document(&self) -> Result<Document, CoreError> {
        let mut document = self.document.clone();
        let array = document
            .find_array_mut(catalog::PLAYER_STATE_ID)
            .ok_or_else(|| {
                CoreError::new(
                    CoreErrorCode::PlayerStateMissing,
                    format!("no array with id \"{}\"", catalog::PLAYER_STATE_ID),
                )
            })?;
        for element in array.children.iter_mut() {
            let Some(id) = element.attribute("id").map(str::to_string) else {
                continue;
            };

            let current_location = element.attribute(rules::LOCATION_ATTR).map(str::to_string);
            if let Some(current) = current_location {
                if let Some(mut parts) = rules::split_location(&current) {
                    let mut changed = false;
                    for (index, field) in rules::LOCATION_FIELDS.iter().enumerate() {
                        if let Some(StagedEdit::Set(value)) = self.staged(&id, field) {
                            parts[index] = value.clone();
                            changed = true;
                        }
                    }
                    if changed {
                        element.set_attribute(rules::LOCATION_ATTR, rules::join_location(&parts));
                    }
                }
            }

            for ((node_id, name), edit) in &self.staging {
                if node_id != &id || rules::location_field_index(name).is_some() {
                    continue;
                }
                match edit {
                    StagedEdit::Set(value) => element.set_attribute(name, value.clone()),
                    StagedEdit::Remove => {
                        element.remove_attribute(name);
                    }
                }
            }

            if id.starts_with(catalog::SLOT_ID_PREFIX) {
                let amount = element.attribute("amount").map(str::to_string);
                if let Some(amount) = amount {
                    // Numeric comparison: "00" and "-0" are zero too.
                    if amount.is_empty() || matches!(amount.parse::<i64>(), Ok(0)) {
                        element.remove_attribute("material");
                    }
                }
            }
        }
        Ok(document)
    }
}

fn build_snapshot(container: &Container, document: &Document) -> Snapshot {
    let region = container.region();
    let (node_count, editable_node_count) = match document.find_array(catalog::PLAYER_STATE_ID) {
        Some(array) => (
            array.children.len(),
            array
                .children
                .iter()
                .filter(|child| rules::is_editable(child))
                .count(),
        ),
        None => (0, 0),
    };
    Snapshot {
        root_name: document.root_name().to_string(),
        declared_payload_len: container.declared_payload_len(),
        payload_len: container.payload_len(),
        decompressed_len: container.decompressed_len(),
        region: RegionSpan {
            start: region.start,
            end: region.end,
        },
        node_count,
        editable_node_count,
    }
}

fn write_backup(path: &Path, backup_dir: &Path) -> Result<PathBuf, CoreError> {
    fs::create_dir_all(backup_dir).map_err(|e| {
        CoreError::new(
            CoreErrorCode::BackupFailed,
            format!(
                "failed to create backup directory {}: {e}",
                backup_dir.display()
            ),
        )
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "save".to_string());
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let backup_path = backup_dir.join(format!("{file_name}_{stamp}.save"));
    fs::copy(path, &backup_path).map_err(|e| {
        CoreError::new(
            CoreErrorCode::BackupFailed,
            format!(
                "failed to copy {} to {}: {e}",
                path.display(),
                backup_path.display()
            ),
        )
    })?;
    Ok(backup_path)
}

fn invalid_edit(message: impl Into<String>) -> CoreError {
    CoreError::new(CoreErrorCode::InvalidEdit, message)
}

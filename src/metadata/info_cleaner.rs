//! Info dictionary cleaner for PDF metadata
//! Author: kartik4091
//! Created: 2025-06-05

use std::collections::BTreeMap;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, instrument};

use super::directives::{DirectiveSet, MetadataAction};
use crate::error::Result;

/// Applies a [`DirectiveSet`] to a document's `/Info` dictionary
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoCleaner;

impl InfoCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Removes and sets keys in order. Returns how many entries changed.
    ///
    /// `Remove` deletes the entry from the dictionary outright; it does not
    /// leave the key behind with an empty string. Keys without a directive are
    /// left alone, and an info dictionary is only created when a value has to
    /// be written.
    #[instrument(skip_all)]
    pub fn apply(&self, doc: &mut Document, directives: &DirectiveSet) -> Result<usize> {
        let actions: Vec<_> = directives
            .actions()
            .into_iter()
            .filter(|(_, action)| *action != MetadataAction::NoOp)
            .collect();
        if actions.is_empty() {
            return Ok(0);
        }

        let needs_dict = actions
            .iter()
            .any(|(_, action)| matches!(action, MetadataAction::Set(_)));
        let id = match info_dictionary_id(doc) {
            Some(id) => id,
            None if needs_dict => create_info_dictionary(doc),
            None => return Ok(0),
        };

        let info = doc.get_object_mut(id)?.as_dict_mut()?;
        let mut changed = 0;
        for (key, action) in actions {
            match action {
                MetadataAction::Remove => {
                    if info.remove(key.as_bytes()).is_some() {
                        changed += 1;
                    }
                }
                MetadataAction::Set(value) => {
                    info.set(key, encode_text(&value));
                    changed += 1;
                }
                MetadataAction::NoOp => {}
            }
        }

        debug!("Info dictionary: {} entries changed", changed);
        Ok(changed)
    }
}

/// Locates the info dictionary, moving a direct trailer dictionary into an object.
/// A dangling or non-dictionary `/Info` counts as absent.
fn info_dictionary_id(doc: &mut Document) -> Option<ObjectId> {
    let direct = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => {
            let id = *id;
            return match doc.get_object(id).and_then(Object::as_dict) {
                Ok(_) => Some(id),
                Err(_) => None,
            };
        }
        Ok(Object::Dictionary(dict)) => dict.clone(),
        _ => return None,
    };
    let id = doc.add_object(direct);
    doc.trailer.set("Info", Object::Reference(id));
    Some(id)
}

fn create_info_dictionary(doc: &mut Document) -> ObjectId {
    let id = doc.add_object(Dictionary::new());
    doc.trailer.set("Info", Object::Reference(id));
    id
}

/// Info dictionary as bare key → decoded text
pub fn read_info(doc: &Document) -> BTreeMap<String, String> {
    let info = match doc.trailer.get(b"Info") {
        Ok(Object::Reference(id)) => doc.get_object(*id).and_then(Object::as_dict).ok(),
        Ok(Object::Dictionary(dict)) => Some(dict),
        _ => None,
    };

    let mut entries = BTreeMap::new();
    if let Some(info) = info {
        for (key, value) in info.iter() {
            entries.insert(
                String::from_utf8_lossy(key).into_owned(),
                object_text(doc, value),
            );
        }
    }
    entries
}

/// Keys present in the document at `path` that `directives` does not list
#[instrument(skip(directives))]
pub fn discover_extra_keys(path: &Path, directives: &DirectiveSet) -> Result<Vec<String>> {
    let doc = Document::load(path)?;
    Ok(read_info(&doc)
        .into_keys()
        .filter(|key| !directives.contains_field(key))
        .collect())
}

fn object_text(doc: &Document, value: &Object) -> String {
    match value {
        Object::String(bytes, _) => decode_text(bytes),
        Object::Name(name) => String::from_utf8_lossy(name).into_owned(),
        Object::Integer(n) => n.to_string(),
        Object::Real(r) => r.to_string(),
        Object::Boolean(b) => b.to_string(),
        Object::Reference(id) => match doc.get_object(*id) {
            Ok(Object::Reference(_)) | Err(_) => String::new(),
            Ok(inner) => object_text(doc, inner),
        },
        _ => String::new(),
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with a byte-order mark otherwise
pub fn encode_text(value: &str) -> Object {
    if value.is_ascii() {
        Object::String(value.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in value.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// UTF-16BE when a BOM is present, then UTF-8, then Latin-1
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

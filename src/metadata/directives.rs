//! Metadata directives: what to do with each info-dictionary key
//! Author: kartik4091
//! Created: 2025-06-05

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;

use crate::error::{Error, Result};

/// Standard document-information fields offered by the editor
pub const STANDARD_FIELDS: [&str; 19] = [
    "Title",
    "Author",
    "Subject",
    "Keywords",
    "Creator",
    "Producer",
    "CreationDate",
    "ModDate",
    "Trapped",
    "Company",
    "Manager",
    "Category",
    "Format",
    "Source",
    "Language",
    "Version",
    "Custom1",
    "Custom2",
    "Custom3",
];

const RANDOM_VALUE_LEN: usize = 12;

/// What happens to one key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MetadataAction {
    NoOp,
    Remove,
    Set(String),
}

/// Per-key editor state: a remove toggle and a replacement value
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldDirective {
    pub remove: bool,
    pub value: String,
}

impl FieldDirective {
    pub fn removed() -> Self {
        Self {
            remove: true,
            value: String::new(),
        }
    }

    pub fn set(value: impl Into<String>) -> Self {
        Self {
            remove: false,
            value: value.into(),
        }
    }

    /// A non-empty value wins over removal
    pub fn action(&self) -> MetadataAction {
        let value = self.value.trim();
        if !value.is_empty() {
            MetadataAction::Set(value.to_string())
        } else if self.remove {
            MetadataAction::Remove
        } else {
            MetadataAction::NoOp
        }
    }
}

/// Bare key name: trims and drops the leading `/`, rejects characters a PDF name cannot hold raw
pub fn normalize_key(key: &str) -> Result<String> {
    let bare = key.trim().trim_start_matches('/');
    if bare.is_empty() {
        return Err(Error::DirectiveError(format!("empty metadata key '{}'", key)));
    }
    if let Some(bad) = bare
        .chars()
        .find(|c| c.is_whitespace() || "()<>[]{}/%#".contains(*c) || !c.is_ascii_graphic())
    {
        return Err(Error::DirectiveError(format!(
            "metadata key '{}' contains unsupported character {:?}",
            key, bad
        )));
    }
    Ok(bare.to_string())
}

/// `KEY=VALUE` as given on the command line
pub fn parse_pair(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = normalize_key(key).map_err(|e| e.to_string())?;
    Ok((key, value.to_string()))
}

/// Ordered directives for standard/discovered keys plus ad hoc custom keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectiveSet {
    fields: Vec<(String, FieldDirective)>,
    custom: Vec<(String, FieldDirective)>,
}

impl DirectiveSet {
    /// Every standard field marked for removal
    pub fn standard() -> Self {
        Self {
            fields: STANDARD_FIELDS
                .iter()
                .map(|k| (k.to_string(), FieldDirective::removed()))
                .collect(),
            custom: Vec::new(),
        }
    }

    /// Directives from `--remove-meta`, `--edit-meta` and `--custom-meta`.
    /// An edit of the same key overrides its removal.
    pub fn from_cli(
        remove: &[String],
        edit: &[(String, String)],
        custom: &[(String, String)],
    ) -> Result<Self> {
        let mut set = Self::default();
        for key in remove {
            set.remove(key)?;
        }
        for (key, value) in edit {
            set.set(key, value)?;
        }
        for (key, value) in custom {
            set.add_custom(key, value, false)?;
        }
        Ok(set)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.custom.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDirective)> {
        self.fields.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn custom(&self) -> impl Iterator<Item = (&str, &FieldDirective)> {
        self.custom.iter().map(|(k, d)| (k.as_str(), d))
    }

    pub fn contains_field(&self, key: &str) -> bool {
        let bare = key.trim_start_matches('/');
        self.fields.iter().any(|(k, _)| k == bare)
    }

    pub fn field(&self, key: &str) -> Option<&FieldDirective> {
        let bare = key.trim_start_matches('/');
        self.fields.iter().find(|(k, _)| k == bare).map(|(_, d)| d)
    }

    fn field_entry(&mut self, key: &str) -> Result<&mut FieldDirective> {
        let key = normalize_key(key)?;
        let index = match self.fields.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.fields.push((key, FieldDirective::default()));
                self.fields.len() - 1
            }
        };
        Ok(&mut self.fields[index].1)
    }

    /// Mark `key` for removal and clear any replacement value.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        *self.field_entry(key)? = FieldDirective::removed();
        Ok(())
    }

    /// Leave `key` untouched.
    pub fn keep(&mut self, key: &str) -> Result<()> {
        *self.field_entry(key)? = FieldDirective::default();
        Ok(())
    }

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        *self.field_entry(key)? = FieldDirective::set(value);
        Ok(())
    }

    /// Adds or replaces a custom entry.
    pub fn add_custom(&mut self, key: &str, value: &str, remove: bool) -> Result<()> {
        let key = normalize_key(key)?;
        let directive = FieldDirective {
            remove,
            value: value.to_string(),
        };
        match self.custom.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = directive,
            None => self.custom.push((key, directive)),
        }
        Ok(())
    }

    pub fn drop_custom(&mut self, key: &str) -> bool {
        let bare = key.trim().trim_start_matches('/');
        let before = self.custom.len();
        self.custom.retain(|(k, _)| k != bare);
        self.custom.len() != before
    }

    /// Adds discovered keys the schema does not list yet, marked for removal.
    /// Returns the keys that were added.
    pub fn extend_schema<I, S>(&mut self, keys: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = Vec::new();
        for key in keys {
            let Ok(key) = normalize_key(key.as_ref()) else {
                continue;
            };
            if !self.contains_field(&key) {
                self.fields.push((key.clone(), FieldDirective::removed()));
                added.push(key);
            }
        }
        added
    }

    /// Neutral placeholder values for every key
    pub fn fill_neutral(&mut self) {
        for (key, directive) in self.fields.iter_mut() {
            directive.value = match key.as_str() {
                "Author" => "Anonymous",
                "Title" => "Document",
                _ => "Redacted",
            }
            .to_string();
        }
        for (_, directive) in self.custom.iter_mut() {
            directive.value = "Redacted".to_string();
        }
    }

    /// Random alphanumeric values for every key
    pub fn fill_random<R: Rng>(&mut self, rng: &mut R) {
        for (_, directive) in self.fields.iter_mut().chain(self.custom.iter_mut()) {
            directive.value = (0..RANDOM_VALUE_LEN)
                .map(|_| rng.sample(Alphanumeric) as char)
                .collect();
        }
    }

    /// Clears every replacement value, keeping the remove toggles.
    pub fn reset_values(&mut self) {
        for (_, directive) in self.fields.iter_mut().chain(self.custom.iter_mut()) {
            directive.value.clear();
        }
    }

    /// Resolved actions in application order: schema keys, then custom keys
    pub fn actions(&self) -> Vec<(String, MetadataAction)> {
        self.fields
            .iter()
            .chain(self.custom.iter())
            .map(|(k, d)| (k.clone(), d.action()))
            .collect()
    }

    pub fn has_effect(&self) -> bool {
        self.actions()
            .iter()
            .any(|(_, a)| *a != MetadataAction::NoOp)
    }
}

//! School setup form data models.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Every field the school setup wizard collects.
///
/// Serialized names are the multipart part names the backend expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldName {
    Name,
    Email,
    PhoneNumber,
    Address,
    Prefix,
    LogoUrl,
    StampUrl,
}

impl FieldName {
    /// All fields in payload order.
    pub const ALL: [FieldName; 7] = [
        Self::Name,
        Self::Email,
        Self::PhoneNumber,
        Self::Address,
        Self::Prefix,
        Self::LogoUrl,
        Self::StampUrl,
    ];

    /// Multipart part name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::PhoneNumber => "phoneNumber",
            Self::Address => "address",
            Self::Prefix => "prefix",
            Self::LogoUrl => "logoUrl",
            Self::StampUrl => "stampUrl",
        }
    }

    /// Look up a field by its multipart part name.
    pub fn from_wire(name: &str) -> Option<FieldName> {
        Self::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    /// Human-readable label shown next to the input.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "School Name",
            Self::Email => "School Email",
            Self::PhoneNumber => "School Phone Number",
            Self::Address => "School Address",
            Self::Prefix => "Prefix",
            Self::LogoUrl => "School Logo",
            Self::StampUrl => "School Stamp",
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::LogoUrl | Self::StampUrl => FieldKind::File,
            _ => FieldKind::Text,
        }
    }

    /// Fields copied from the registration step; read-only in the wizard.
    pub fn is_seeded(&self) -> bool {
        matches!(self, Self::Name | Self::Email)
    }
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// Whether a field holds text or a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    File,
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::File => write!(f, "file"),
        }
    }
}

/// A file picked by the user. Contents are shared, so clones are cheap.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub mime_type: String,
    data: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Lowercased extension, if the name has one.
    pub fn extension(&self) -> Option<String> {
        let (stem, ext) = self.name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

impl std::fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size())
            .finish()
    }
}

/// Current value of a form field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    File(Option<SelectedFile>),
}

impl FieldValue {
    /// The empty value for a field kind.
    pub fn empty(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => Self::Text(String::new()),
            FieldKind::File => Self::File(None),
        }
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            Self::Text(_) => FieldKind::Text,
            Self::File(_) => FieldKind::File,
        }
    }

    /// An empty string or no selected file.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::File(f) => f.is_none(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&SelectedFile> {
        match self {
            Self::File(f) => f.as_ref(),
            Self::Text(_) => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<SelectedFile> for FieldValue {
    fn from(file: SelectedFile) -> Self {
        Self::File(Some(file))
    }
}

/// A declared form field.
#[derive(Debug, Clone)]
pub struct FormField {
    pub name: FieldName,
    pub kind: FieldKind,
    pub value: FieldValue,
    pub required: bool,
    /// Rank of the step this field gates, if any.
    pub gates_step: Option<u32>,
}

impl FormField {
    pub fn new(name: FieldName, gates_step: Option<u32>) -> Self {
        Self {
            name,
            kind: name.kind(),
            value: FieldValue::empty(name.kind()),
            required: true,
            gates_step,
        }
    }
}

/// Immutable read of all field values at a point in time.
///
/// Every declared field is always present; unset fields hold their empty value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormSnapshot {
    values: BTreeMap<FieldName, FieldValue>,
}

impl Default for FormSnapshot {
    fn default() -> Self {
        Self {
            values: FieldName::ALL
                .into_iter()
                .map(|f| (f, FieldValue::empty(f.kind())))
                .collect(),
        }
    }
}

impl FormSnapshot {
    /// Build a snapshot from explicit values. Unlisted fields stay empty and
    /// values of the wrong kind are ignored.
    pub fn from_values(values: impl IntoIterator<Item = (FieldName, FieldValue)>) -> Self {
        let mut snapshot = Self::default();
        for (field, value) in values {
            if value.kind() == field.kind() {
                snapshot.values.insert(field, value);
            }
        }
        snapshot
    }

    pub fn with_text(mut self, field: FieldName, value: impl Into<String>) -> Self {
        if field.kind() == FieldKind::Text {
            self.values.insert(field, FieldValue::Text(value.into()));
        }
        self
    }

    pub fn with_file(mut self, field: FieldName, file: SelectedFile) -> Self {
        if field.kind() == FieldKind::File {
            self.values.insert(field, FieldValue::File(Some(file)));
        }
        self
    }

    pub fn get(&self, field: FieldName) -> &FieldValue {
        // Default populates every field, so the map is total.
        &self.values[&field]
    }

    /// Text value, or `""` for file fields.
    pub fn text(&self, field: FieldName) -> &str {
        self.get(field).as_text().unwrap_or("")
    }

    pub fn file(&self, field: FieldName) -> Option<&SelectedFile> {
        self.get(field).as_file()
    }

    pub fn is_filled(&self, field: FieldName) -> bool {
        !self.get(field).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &FieldValue)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }
}

/// The two fields carried over from the registration step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationSeed {
    pub name: String,
    pub email: String,
}

impl RegistrationSeed {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

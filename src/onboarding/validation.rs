//! Validation collaborator: maps a snapshot to per-field error messages.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use super::attachment::is_accepted_type;
use super::model::{FieldKind, FieldName, FormField, FormSnapshot};

/// Field → message for every invalid field. Absent entries are valid.
pub type FieldErrors = BTreeMap<FieldName, String>;

/// Validates a full form snapshot.
pub trait Validator: Send + Sync {
    fn validate(&self, snapshot: &FormSnapshot) -> FieldErrors;
}

/// Rules for the school setup form: required fields must be non-empty, the
/// email must be well formed, and logo/stamp must be accepted image types.
pub struct SchoolSetupSchema {
    email: Regex,
    required: BTreeSet<FieldName>,
}

impl SchoolSetupSchema {
    /// Schema with every field required.
    pub fn new() -> Self {
        let fields: Vec<FormField> = FieldName::ALL
            .into_iter()
            .map(|name| FormField::new(name, None))
            .collect();
        Self::from_fields(&fields)
    }

    /// Schema honouring each field's `required` flag.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a FormField>) -> Self {
        Self {
            email: Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap(),
            required: fields
                .into_iter()
                .filter(|f| f.required)
                .map(|f| f.name)
                .collect(),
        }
    }

    pub fn is_required(&self, field: FieldName) -> bool {
        self.required.contains(&field)
    }

    fn required_message(field: FieldName) -> String {
        match field {
            FieldName::LogoUrl => "School logo is required".to_string(),
            FieldName::StampUrl => "School stamp is required".to_string(),
            other => format!("{} is required", other.label()),
        }
    }
}

impl Default for SchoolSetupSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for SchoolSetupSchema {
    fn validate(&self, snapshot: &FormSnapshot) -> FieldErrors {
        let mut errors = FieldErrors::new();

        for field in FieldName::ALL {
            match field.kind() {
                FieldKind::Text => {
                    let value = snapshot.text(field).trim();
                    if value.is_empty() {
                        if self.is_required(field) {
                            errors.insert(field, Self::required_message(field));
                        }
                    } else if field == FieldName::Email && !self.email.is_match(value) {
                        errors.insert(field, "Enter a valid email address".to_string());
                    }
                }
                FieldKind::File => match snapshot.file(field) {
                    None if self.is_required(field) => {
                        errors.insert(field, Self::required_message(field));
                    }
                    None => {}
                    Some(file) if !is_accepted_type(file) => {
                        errors.insert(
                            field,
                            "Only *.jpeg, *.webp and *.png images will be accepted".to_string(),
                        );
                    }
                    Some(_) => {}
                },
            }
        }

        errors
    }
}

//! Field state store: current value of every wizard field.

use std::collections::BTreeMap;

use tokio::sync::broadcast;
use tracing::debug;

use crate::error::FieldError;

use super::model::{FieldName, FieldValue, FormField, FormSnapshot, RegistrationSeed};
use super::steps::StepInferenceEngine;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// A single field mutation, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: FieldName,
    pub value: FieldValue,
}

/// Holds one `FormField` per declared field and fans out changes.
///
/// `name` and `email` are seeded at construction and never change afterwards.
pub struct FieldStateStore {
    fields: BTreeMap<FieldName, FormField>,
    tx: broadcast::Sender<FieldChange>,
}

impl FieldStateStore {
    pub fn new(seed: RegistrationSeed, engine: &StepInferenceEngine) -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        let mut fields: BTreeMap<FieldName, FormField> = FieldName::ALL
            .into_iter()
            .map(|name| (name, FormField::new(name, engine.gate_rank(name))))
            .collect();

        if let Some(field) = fields.get_mut(&FieldName::Name) {
            field.value = FieldValue::Text(seed.name);
        }
        if let Some(field) = fields.get_mut(&FieldName::Email) {
            field.value = FieldValue::Text(seed.email);
        }

        Self { fields, tx }
    }

    /// Subscribe to field changes.
    pub fn subscribe(&self) -> broadcast::Receiver<FieldChange> {
        self.tx.subscribe()
    }

    /// Replace one field's value and notify subscribers before returning.
    ///
    /// Writes to seeded fields are ignored.
    pub fn set(&mut self, field: FieldName, value: FieldValue) -> Result<(), FieldError> {
        if field.is_seeded() {
            debug!(field = %field, "Ignoring write to seeded field");
            return Ok(());
        }

        if value.kind() != field.kind() {
            return Err(FieldError::KindMismatch {
                field: field.to_string(),
                expected: field.kind().to_string(),
                actual: value.kind().to_string(),
            });
        }

        if let Some(slot) = self.fields.get_mut(&field) {
            slot.value = value.clone();
        }
        debug!(field = %field, empty = value.is_empty(), "Field updated");

        // ok if nobody is listening
        let _ = self.tx.send(FieldChange { field, value });
        Ok(())
    }

    pub fn set_text(
        &mut self,
        field: FieldName,
        value: impl Into<String>,
    ) -> Result<(), FieldError> {
        self.set(field, FieldValue::Text(value.into()))
    }

    /// Reset a field to its empty value.
    pub fn clear(&mut self, field: FieldName) -> Result<(), FieldError> {
        self.set(field, FieldValue::empty(field.kind()))
    }

    pub fn get(&self, field: FieldName) -> &FieldValue {
        &self.fields[&field].value
    }

    pub fn field(&self, field: FieldName) -> &FormField {
        &self.fields[&field]
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.values()
    }

    /// Immutable snapshot of every field.
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot::from_values(self.fields.values().map(|f| (f.name, f.value.clone())))
    }
}

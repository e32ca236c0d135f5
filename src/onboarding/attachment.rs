//! Attachment manager: file-valued fields and their preview handles.
//!
//! Preview handles are object URLs in a process-wide registry. Each file
//! field owns at most one live handle: selecting a new file revokes the old
//! handle before a new one is issued, and removal revokes it outright.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AttachmentError;

use super::model::{FieldKind, FieldName, SelectedFile};

/// Extensions accepted for logo and stamp uploads.
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "webp"];

/// MIME types accepted when a file name carries no extension.
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Whether a file is an accepted image type.
///
/// The extension decides when present; otherwise the MIME type does.
pub fn is_accepted_type(file: &SelectedFile) -> bool {
    match file.extension() {
        Some(ext) => ACCEPTED_EXTENSIONS.contains(&ext.as_str()),
        None => {
            let mime = file.mime_type.to_ascii_lowercase();
            ACCEPTED_MIME_TYPES.contains(&mime.as_str())
        }
    }
}

/// Human-readable size in base-1024 units, two decimals at most.
///
/// The unit is `floor(log1024(bytes))` clamped to GB, computed on integers.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut unit = 0;
    let mut threshold: u64 = 1024;
    while unit < SIZE_UNITS.len() - 1 && bytes >= threshold {
        unit += 1;
        threshold = threshold.saturating_mul(1024);
    }

    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

/// An issued preview handle. Not `Clone`: the holder must hand it back to
/// the provider to release it.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    id: Uuid,
    url: String,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Issues and revokes preview handles.
pub trait PreviewProvider: Send + Sync {
    fn create(&self, file: &SelectedFile) -> PreviewHandle;

    fn revoke(&self, handle: PreviewHandle);
}

/// In-process object URL registry.
#[derive(Debug, Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashSet<Uuid>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of handles issued and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_live(&self, id: Uuid) -> bool {
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&id)
    }
}

impl PreviewProvider for ObjectUrlRegistry {
    fn create(&self, file: &SelectedFile) -> PreviewHandle {
        let id = Uuid::new_v4();
        self.live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id);
        debug!(preview = %id, file = %file.name, "Preview handle issued");
        PreviewHandle {
            id,
            url: format!("blob:onboarding/{id}"),
        }
    }

    fn revoke(&self, handle: PreviewHandle) {
        let removed = self
            .live
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&handle.id);
        if !removed {
            warn!(preview = %handle.id, "Revoked an unknown preview handle");
        }
    }
}

/// The file currently selected for a field, with its metadata and preview.
#[derive(Debug)]
pub struct Attachment {
    pub field: FieldName,
    pub file_name: String,
    pub size: u64,
    pub mime_type: String,
    preview: PreviewHandle,
    file: SelectedFile,
}

impl Attachment {
    pub fn preview_url(&self) -> &str {
        self.preview.url()
    }

    pub fn preview_id(&self) -> Uuid {
        self.preview.id()
    }

    pub fn display_size(&self) -> String {
        format_size(self.size)
    }

    pub fn file(&self) -> &SelectedFile {
        &self.file
    }
}

/// Owns the attachment slot of every file-valued field.
///
/// A slot doubles as the field's file input: an empty slot is an empty input.
pub struct AttachmentManager {
    previews: Arc<dyn PreviewProvider>,
    slots: BTreeMap<FieldName, Attachment>,
}

impl AttachmentManager {
    pub fn new(previews: Arc<dyn PreviewProvider>) -> Self {
        Self {
            previews,
            slots: BTreeMap::new(),
        }
    }

    /// Attach `file` to `field`, replacing any previous attachment.
    ///
    /// Rejected files leave the existing attachment in place.
    pub fn select(
        &mut self,
        field: FieldName,
        file: SelectedFile,
    ) -> Result<&Attachment, AttachmentError> {
        if field.kind() != FieldKind::File {
            return Err(AttachmentError::NotAFileField {
                field: field.to_string(),
            });
        }

        if !is_accepted_type(&file) {
            warn!(
                field = %field,
                file = %file.name,
                mime = %file.mime_type,
                "Rejected unsupported file type"
            );
            return Err(AttachmentError::UnsupportedFileType {
                field: field.to_string(),
                file_name: file.name,
            });
        }

        if let Some(previous) = self.slots.remove(&field) {
            debug!(field = %field, file = %previous.file_name, "Replacing attachment");
            self.previews.revoke(previous.preview);
        }

        let preview = self.previews.create(&file);
        info!(
            field = %field,
            file = %file.name,
            size = %format_size(file.size()),
            "File attached"
        );

        let attachment = Attachment {
            field,
            file_name: file.name.clone(),
            size: file.size(),
            mime_type: file.mime_type.clone(),
            preview,
            file,
        };
        Ok(self.slots.entry(field).or_insert(attachment))
    }

    /// Drop the attachment for `field` and revoke its preview.
    ///
    /// Returns whether anything was removed; an empty field is a no-op.
    pub fn remove(&mut self, field: FieldName) -> bool {
        match self.slots.remove(&field) {
            Some(attachment) => {
                self.previews.revoke(attachment.preview);
                info!(field = %field, "Attachment removed");
                true
            }
            None => false,
        }
    }

    /// Remove every attachment.
    pub fn clear_all(&mut self) {
        for (_, attachment) in std::mem::take(&mut self.slots) {
            self.previews.revoke(attachment.preview);
        }
    }

    pub fn attachment(&self, field: FieldName) -> Option<&Attachment> {
        self.slots.get(&field)
    }

    /// The underlying file, for payload assembly.
    pub fn file(&self, field: FieldName) -> Option<&SelectedFile> {
        self.slots.get(&field).map(|a| &a.file)
    }

    /// Formatted size of the attached file, if any.
    pub fn display_size(&self, field: FieldName) -> Option<String> {
        self.slots.get(&field).map(Attachment::display_size)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for AttachmentManager {
    fn drop(&mut self) {
        self.clear_all();
    }
}

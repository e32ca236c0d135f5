//! Submission pipeline: validate, assemble, send, and report.
//!
//! States progress `Idle → Submitting → {Succeeded, Failed}`. A failed (or
//! succeeded) session may submit again, re-entering `Submitting`. Only one
//! attempt may be in flight; a second submit while `Submitting` is rejected.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::error::{SubmissionError, TransportError};

use super::attachment::AttachmentManager;
use super::model::{FieldKind, FieldName, FormSnapshot};
use super::transport::{MultipartPayload, Transport};
use super::validation::{FieldErrors, Validator};

/// User-facing message for any failed attempt. Validation failures also
/// carry per-field messages.
pub const SUBMIT_FAILED_MESSAGE: &str = "Failed to submit form";

/// Submission state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionStatus {
    pub fn can_transition_to(&self, target: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!(
            (self, target),
            (Idle, Submitting)
                | (Submitting, Succeeded)
                | (Submitting, Failed)
                | (Failed, Submitting)
                | (Succeeded, Submitting)
        )
    }

    /// Terminal for the current attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitting)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// The backend created the school.
    Succeeded { id: String },
    /// Validation or transport failed. `field_errors` is empty for transport
    /// failures.
    Failed {
        message: String,
        field_errors: FieldErrors,
    },
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Succeeded { id } => Some(id),
            Self::Failed { .. } => None,
        }
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Failed { field_errors, .. } => Some(field_errors),
            Self::Succeeded { .. } => None,
        }
    }
}

/// Record of the most recent attempt, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptRecord {
    pub attempt: u32,
    pub status: SubmissionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct PipelineState {
    status: SubmissionStatus,
    attempts: u32,
    last: Option<AttemptRecord>,
}

/// Build the multipart payload.
///
/// Text fields are always sent; file fields only when a file is present.
/// Files come from the attachment manager, falling back to the snapshot.
pub fn assemble_payload(
    snapshot: &FormSnapshot,
    attachments: &AttachmentManager,
) -> MultipartPayload {
    let mut payload = MultipartPayload::new();
    for field in FieldName::ALL {
        match field.kind() {
            FieldKind::Text => payload.push_text(field.wire_name(), snapshot.text(field)),
            FieldKind::File => {
                if let Some(file) = attachments.file(field).or_else(|| snapshot.file(field)) {
                    payload.push_file(field.wire_name(), file.clone());
                }
            }
        }
    }
    payload
}

/// Runs validation and transport with a single-flight guard.
pub struct SubmissionPipeline {
    validator: Arc<dyn Validator>,
    transport: Arc<dyn Transport>,
    state: Mutex<PipelineState>,
}

impl SubmissionPipeline {
    pub fn new(validator: Arc<dyn Validator>, transport: Arc<dyn Transport>) -> Self {
        Self {
            validator,
            transport,
            state: Mutex::new(PipelineState::default()),
        }
    }

    pub fn status(&self) -> SubmissionStatus {
        self.lock().status
    }

    pub fn last_attempt(&self) -> Option<AttemptRecord> {
        self.lock().last.clone()
    }

    /// Validate, assemble, and send the form.
    ///
    /// Returns `Err(SubmissionError::InProgress)` if another attempt is in
    /// flight. Every other outcome is a `SubmissionResult`.
    pub async fn submit(
        &self,
        snapshot: &FormSnapshot,
        attachments: &AttachmentManager,
        token: &SecretString,
    ) -> Result<SubmissionResult, SubmissionError> {
        let mut flight = self.begin()?;

        let field_errors = self.validator.validate(snapshot);
        if !field_errors.is_empty() {
            warn!(
                attempt = flight.attempt,
                fields = ?field_errors.keys().map(|f| f.wire_name()).collect::<Vec<_>>(),
                "School setup blocked by validation"
            );
            flight.finish(SubmissionStatus::Failed);
            return Ok(SubmissionResult::Failed {
                message: SUBMIT_FAILED_MESSAGE.to_string(),
                field_errors,
            });
        }

        let payload = assemble_payload(snapshot, attachments);
        let outcome = self
            .transport
            .submit(payload, token)
            .await
            .and_then(|response| {
                response.identifier().ok_or_else(|| {
                    TransportError::MalformedResponse("response carries no school id".to_string())
                })
            });

        match outcome {
            Ok(id) => {
                info!(attempt = flight.attempt, school_id = %id, "School setup succeeded");
                flight.finish(SubmissionStatus::Succeeded);
                Ok(SubmissionResult::Succeeded { id })
            }
            Err(e) => {
                error!(attempt = flight.attempt, error = %e, "School setup submission failed");
                flight.finish(SubmissionStatus::Failed);
                Ok(SubmissionResult::Failed {
                    message: SUBMIT_FAILED_MESSAGE.to_string(),
                    field_errors: FieldErrors::new(),
                })
            }
        }
    }

    fn begin(&self) -> Result<InFlight<'_>, SubmissionError> {
        let mut state = self.lock();
        if !state.status.can_transition_to(SubmissionStatus::Submitting) {
            warn!(status = %state.status, "Rejected submit while another is in flight");
            return Err(SubmissionError::InProgress);
        }
        state.status = SubmissionStatus::Submitting;
        state.attempts += 1;
        let attempt = state.attempts;
        state.last = Some(AttemptRecord {
            attempt,
            status: SubmissionStatus::Submitting,
            started_at: Utc::now(),
            finished_at: None,
        });
        Ok(InFlight {
            pipeline: self,
            attempt,
            finished: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds the `Submitting` state for one attempt. If the attempt's future is
/// dropped before finishing, the state falls back to `Failed`.
struct InFlight<'a> {
    pipeline: &'a SubmissionPipeline,
    attempt: u32,
    finished: bool,
}

impl InFlight<'_> {
    fn finish(&mut self, status: SubmissionStatus) {
        let mut state = self.pipeline.lock();
        state.status = status;
        if let Some(last) = state.last.as_mut() {
            last.status = status;
            last.finished_at = Some(Utc::now());
        }
        self.finished = true;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish(SubmissionStatus::Failed);
        }
    }
}

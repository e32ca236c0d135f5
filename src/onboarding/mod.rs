//! School setup wizard.
//!
//! The user fills in contact, address, and branding fields one at a time.
//! The current step is never stored; it is re-derived from the field
//! snapshot on every read. On submit the whole form goes out as one
//! multipart payload.

pub mod attachment;
pub mod model;
pub mod pipeline;
pub mod session;
pub mod steps;
pub mod store;
pub mod transport;
pub mod validation;

pub use attachment::{
    Attachment, AttachmentManager, ObjectUrlRegistry, PreviewHandle, PreviewProvider, format_size,
};
pub use model::{
    FieldKind, FieldName, FieldValue, FormField, FormSnapshot, RegistrationSeed, SelectedFile,
};
pub use pipeline::{SubmissionPipeline, SubmissionResult, SubmissionStatus};
pub use session::{LogNavigator, Navigator, SessionDeps, WizardRoutes, WizardSession};
pub use steps::{StepDefinition, StepInferenceEngine, StepProgress, StepStatus};
pub use store::{FieldChange, FieldStateStore};
pub use transport::{HttpTransport, MultipartPayload, SetupResponse, Transport};
pub use validation::{FieldErrors, SchoolSetupSchema, Validator};

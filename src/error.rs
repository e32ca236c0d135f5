//! Error types for the school setup onboarding engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Field error: {0}")]
    Field(#[from] FieldError),

    #[error("Attachment error: {0}")]
    Attachment(#[from] AttachmentError),

    #[error("Step definition error: {0}")]
    Step(#[from] StepError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Settings persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Connection error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Field store errors.
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("Field {field} holds {expected} values, got a {actual} value")]
    KindMismatch {
        field: String,
        expected: String,
        actual: String,
    },
}

/// File selection errors. Prior attachment state is left untouched.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    #[error("Unsupported file type for {field}: {file_name} (accepted: jpeg, jpg, png, webp)")]
    UnsupportedFileType { field: String, file_name: String },

    #[error("Field {field} does not accept files")]
    NotAFileField { field: String },
}

/// Invalid wizard step definitions.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("A wizard needs at least one step")]
    Empty,

    #[error("Step ranks must be contiguous from 1: expected {expected}, found {found}")]
    NonContiguous { expected: u32, found: u32 },

    #[error("Step {rank} has no gating field but is not the last step")]
    MissingGate { rank: u32 },

    #[error("Field {field} gates more than one step")]
    DuplicateGate { field: String },
}

/// Submission state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("A submission is already in progress")]
    InProgress,
}

/// Transport collaborator failures. Never shown to the end user verbatim.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Invalid payload part {part}: {reason}")]
    InvalidPayload { part: String, reason: String },
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;

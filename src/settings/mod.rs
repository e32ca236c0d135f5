//! Settings persistence: small key/value store shared across wizard stages.
//!
//! The registration step writes the seed and token here; school setup reads
//! them and writes back the created school id.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlSettings;
pub use traits::Settings;

/// Settings keys used by the onboarding flow.
pub mod keys {
    /// Name entered during registration.
    pub const REGISTERED_NAME: &str = "registeredName";
    /// Email entered during registration.
    pub const REGISTERED_EMAIL: &str = "registeredEmail";
    /// Bearer token issued at registration.
    pub const TOKEN: &str = "token";
    /// Id of the school created by the setup wizard.
    pub const SCHOOL_ID: &str = "schoolId";
}

//! School onboarding: step inference and submission engine for the school
//! setup wizard.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod settings;

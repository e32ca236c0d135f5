//! `Settings` trait: async key/value persistence.

use async_trait::async_trait;

use crate::error::SettingsError;

/// Backend-agnostic settings store. Values are JSON.
#[async_trait]
pub trait Settings: Send + Sync {
    /// Get a setting value, or `None` if unset.
    async fn get_setting(&self, key: &str) -> Result<Option<serde_json::Value>, SettingsError>;

    /// Insert or replace a setting value.
    async fn set_setting(&self, key: &str, value: &serde_json::Value) -> Result<(), SettingsError>;

    /// Delete a setting. Returns whether it existed.
    async fn delete_setting(&self, key: &str) -> Result<bool, SettingsError>;

    /// Get a string setting. Non-string values read as unset.
    async fn get_string(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self
            .get_setting(key)
            .await?
            .and_then(|v| v.as_str().map(String::from)))
    }

    async fn set_string(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.set_setting(key, &serde_json::Value::String(value.to_string()))
            .await
    }
}

//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;
use crate::onboarding::session::WizardRoutes;

/// Onboarding configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct OnboardingConfig {
    /// Backend API base URL, e.g. `https://api.example.com/api`.
    pub api_base_url: String,
    /// Path of the school setup endpoint under the base URL.
    pub setup_path: String,
    /// Settings database location.
    pub db_path: PathBuf,
    /// Route after a successful setup.
    pub next_route: String,
    /// Route for the back button.
    pub back_route: String,
}

impl Default for OnboardingConfig {
    fn default() -> Self {
        let routes = WizardRoutes::default();
        Self {
            api_base_url: "http://localhost:3000/api".to_string(),
            setup_path: "/school/setup".to_string(),
            db_path: PathBuf::from("./data/onboarding.db"),
            next_route: routes.next,
            back_route: routes.back,
        }
    }
}

impl OnboardingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_base_url =
            std::env::var("ONBOARDING_API_BASE_URL").unwrap_or(defaults.api_base_url);
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                key: "ONBOARDING_API_BASE_URL".to_string(),
                message: format!("expected an http(s) URL, got {api_base_url}"),
            });
        }

        Ok(Self {
            api_base_url,
            setup_path: std::env::var("ONBOARDING_SETUP_PATH").unwrap_or(defaults.setup_path),
            db_path: std::env::var("ONBOARDING_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            next_route: std::env::var("ONBOARDING_NEXT_ROUTE").unwrap_or(defaults.next_route),
            back_route: std::env::var("ONBOARDING_BACK_ROUTE").unwrap_or(defaults.back_route),
        })
    }

    /// Full URL of the setup endpoint.
    pub fn setup_endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.api_base_url.trim_end_matches('/'),
            self.setup_path.trim_start_matches('/')
        )
    }

    pub fn routes(&self) -> WizardRoutes {
        WizardRoutes {
            next: self.next_route.clone(),
            back: self.back_route.clone(),
        }
    }
}

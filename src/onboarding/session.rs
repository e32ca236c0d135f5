//! Wizard session: ties the field store, attachments, step engine, and
//! submission pipeline together for one pass through school setup.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, warn};

use crate::error::{Error, SubmissionError};
use crate::settings::{Settings, keys};

use super::attachment::{Attachment, AttachmentManager, PreviewProvider};
use super::model::{FieldName, FieldValue, FormSnapshot, RegistrationSeed, SelectedFile};
use super::pipeline::{SubmissionPipeline, SubmissionResult, SubmissionStatus};
use super::steps::{StepInferenceEngine, StepProgress};
use super::store::{FieldChange, FieldStateStore};
use super::transport::Transport;
use super::validation::Validator;

/// Message shown after a successful setup.
pub const SETUP_SUCCESS_MESSAGE: &str = "School setup successful";

/// Receives navigation and toast signals once a submit resolves.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);

    fn notify_success(&self, message: &str);

    fn notify_error(&self, message: &str);

    /// Inline message for one invalid field, sent before `notify_error`.
    fn notify_field_error(&self, field: FieldName, message: &str);
}

/// Navigator that only logs. Used when no UI is attached.
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!(route = %route, "Navigate");
    }

    fn notify_success(&self, message: &str) {
        info!("{message}");
    }

    fn notify_error(&self, message: &str) {
        warn!("{message}");
    }

    fn notify_field_error(&self, field: FieldName, message: &str) {
        warn!(field = %field, "{message}");
    }
}

/// Where the wizard goes next.
#[derive(Debug, Clone)]
pub struct WizardRoutes {
    /// After a successful submission.
    pub next: String,
    /// Back button.
    pub back: String,
}

impl Default for WizardRoutes {
    fn default() -> Self {
        Self {
            next: "/auth/input-campus".to_string(),
            back: "/auth/auth-layout/super-admin".to_string(),
        }
    }
}

/// Collaborators a session needs.
pub struct SessionDeps {
    pub settings: Arc<dyn Settings>,
    pub validator: Arc<dyn Validator>,
    pub transport: Arc<dyn Transport>,
    pub previews: Arc<dyn PreviewProvider>,
    pub navigator: Arc<dyn Navigator>,
}

/// One school setup wizard session.
pub struct WizardSession {
    store: FieldStateStore,
    attachments: AttachmentManager,
    engine: StepInferenceEngine,
    pipeline: Arc<SubmissionPipeline>,
    settings: Arc<dyn Settings>,
    navigator: Arc<dyn Navigator>,
    routes: WizardRoutes,
}

impl WizardSession {
    pub fn new(
        seed: RegistrationSeed,
        engine: StepInferenceEngine,
        routes: WizardRoutes,
        deps: SessionDeps,
    ) -> Self {
        Self {
            store: FieldStateStore::new(seed, &engine),
            attachments: AttachmentManager::new(deps.previews),
            engine,
            pipeline: Arc::new(SubmissionPipeline::new(deps.validator, deps.transport)),
            settings: deps.settings,
            navigator: deps.navigator,
            routes,
        }
    }

    /// Start a session seeded from the registration step's saved name and email.
    pub async fn from_settings(
        engine: StepInferenceEngine,
        routes: WizardRoutes,
        deps: SessionDeps,
    ) -> Result<Self, Error> {
        let seed = load_seed(deps.settings.as_ref()).await?;
        info!(name = %seed.name, email = %seed.email, "Starting school setup");
        Ok(Self::new(seed, engine, routes, deps))
    }

    // ── Fields ──────────────────────────────────────────────────────

    pub fn set_field(&mut self, field: FieldName, value: impl Into<String>) -> Result<(), Error> {
        self.store.set_text(field, value)?;
        Ok(())
    }

    pub fn field(&self, field: FieldName) -> &FieldValue {
        self.store.get(field)
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<FieldChange> {
        self.store.subscribe()
    }

    pub fn snapshot(&self) -> FormSnapshot {
        self.store.snapshot()
    }

    // ── Attachments ─────────────────────────────────────────────────

    /// Attach a file and mirror it into the field store.
    pub fn select_file(
        &mut self,
        field: FieldName,
        file: SelectedFile,
    ) -> Result<&Attachment, Error> {
        let attachment = self.attachments.select(field, file)?;
        self.store
            .set(field, FieldValue::File(Some(attachment.file().clone())))?;
        Ok(attachment)
    }

    /// Remove a file and empty its input. No-op for an empty field.
    pub fn remove_file(&mut self, field: FieldName) -> Result<(), Error> {
        if self.attachments.remove(field) {
            self.store.clear(field)?;
        }
        Ok(())
    }

    pub fn attachment(&self, field: FieldName) -> Option<&Attachment> {
        self.attachments.attachment(field)
    }

    // ── Progress ────────────────────────────────────────────────────

    pub fn current_step(&self) -> u32 {
        self.engine.current_step(&self.store.snapshot())
    }

    pub fn progress(&self) -> Vec<StepProgress> {
        self.engine.progress(&self.store.snapshot())
    }

    pub fn engine(&self) -> &StepInferenceEngine {
        &self.engine
    }

    // ── Submission ──────────────────────────────────────────────────

    pub fn status(&self) -> SubmissionStatus {
        self.pipeline.status()
    }

    pub fn pipeline(&self) -> Arc<SubmissionPipeline> {
        Arc::clone(&self.pipeline)
    }

    /// Submit the form and signal the navigator.
    ///
    /// On success the school id is saved, attachments are released, and the
    /// wizard moves to the next route. On failure each invalid field is
    /// reported, then the failure message.
    pub async fn submit(
        &mut self,
        token: &SecretString,
    ) -> Result<SubmissionResult, SubmissionError> {
        let snapshot = self.store.snapshot();
        let result = self
            .pipeline
            .submit(&snapshot, &self.attachments, token)
            .await?;

        match &result {
            SubmissionResult::Succeeded { id } => {
                if let Err(e) = self.settings.set_string(keys::SCHOOL_ID, id).await {
                    warn!(school_id = %id, error = %e, "Failed to persist school id");
                }
                self.teardown_attachments();
                self.navigator.notify_success(SETUP_SUCCESS_MESSAGE);
                self.navigator.navigate(&self.routes.next);
            }
            SubmissionResult::Failed { message, field_errors } => {
                for (field, error) in field_errors {
                    self.navigator.notify_field_error(*field, error);
                }
                self.navigator.notify_error(message);
            }
        }

        Ok(result)
    }

    /// Back button.
    pub fn go_back(&self) {
        self.navigator.navigate(&self.routes.back);
    }

    fn teardown_attachments(&mut self) {
        for field in FieldName::ALL {
            if self.attachments.remove(field) {
                // file fields always accept an empty file value
                let _ = self.store.clear(field);
            }
        }
    }
}

/// Read the registration seed. Missing keys become empty strings.
pub async fn load_seed(settings: &dyn Settings) -> Result<RegistrationSeed, Error> {
    let name = settings.get_string(keys::REGISTERED_NAME).await?.unwrap_or_default();
    let email = settings.get_string(keys::REGISTERED_EMAIL).await?.unwrap_or_default();
    Ok(RegistrationSeed { name, email })
}

/// Read the stored bearer token, if any.
pub async fn load_token(settings: &dyn Settings) -> Result<Option<SecretString>, Error> {
    Ok(settings
        .get_string(keys::TOKEN)
        .await?
        .filter(|t| !t.is_empty())
        .map(SecretString::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::TransportError;
    use crate::onboarding::attachment::ObjectUrlRegistry;
    use crate::onboarding::transport::{MultipartPayload, SetupResponse};
    use crate::onboarding::validation::SchoolSetupSchema;
    use crate::settings::LibSqlSettings;

    #[derive(Default)]
    struct RecordingNavigator {
        events: Mutex<Vec<String>>,
    }

    impl RecordingNavigator {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl Navigator for RecordingNavigator {
        fn navigate(&self, route: &str) {
            self.events.lock().unwrap().push(format!("navigate:{route}"));
        }
        fn notify_success(&self, message: &str) {
            self.events.lock().unwrap().push(format!("success:{message}"));
        }
        fn notify_error(&self, message: &str) {
            self.events.lock().unwrap().push(format!("error:{message}"));
        }
        fn notify_field_error(&self, field: FieldName, message: &str) {
            self.events.lock().unwrap().push(format!("field:{field}:{message}"));
        }
    }

    struct FixedTransport(Result<i64, u16>);

    #[async_trait]
    impl Transport for FixedTransport {
        async fn submit(
            &self,
            _payload: MultipartPayload,
            _token: &SecretString,
        ) -> Result<SetupResponse, TransportError> {
            match self.0 {
                Ok(id) => Ok(SetupResponse::new(id)),
                Err(status) => Err(TransportError::Status {
                    status,
                    message: "nope".to_string(),
                }),
            }
        }
    }

    struct Fixture {
        session: WizardSession,
        settings: Arc<LibSqlSettings>,
        registry: Arc<ObjectUrlRegistry>,
        navigator: Arc<RecordingNavigator>,
    }

    async fn fixture(transport: FixedTransport) -> Fixture {
        let settings = Arc::new(LibSqlSettings::new_memory().await.unwrap());
        settings
            .set_string(keys::REGISTERED_NAME, "Acme")
            .await
            .unwrap();
        settings
            .set_string(keys::REGISTERED_EMAIL, "a@acme.io")
            .await
            .unwrap();

        let registry = ObjectUrlRegistry::new();
        let navigator = Arc::new(RecordingNavigator::default());
        let deps = SessionDeps {
            settings: settings.clone(),
            validator: Arc::new(SchoolSetupSchema::new()),
            transport: Arc::new(transport),
            previews: registry.clone(),
            navigator: navigator.clone(),
        };
        let session = WizardSession::from_settings(
            StepInferenceEngine::school_setup(),
            WizardRoutes::default(),
            deps,
        )
        .await
        .unwrap();

        Fixture {
            session,
            settings,
            registry,
            navigator,
        }
    }

    fn png(name: &str) -> SelectedFile {
        SelectedFile::new(name, "image/png", vec![7u8; 2048])
    }

    fn fill(session: &mut WizardSession) {
        session.set_field(FieldName::PhoneNumber, "555").unwrap();
        session.set_field(FieldName::Address, "1 Main St").unwrap();
        session.set_field(FieldName::Prefix, "ACM").unwrap();
        session.select_file(FieldName::LogoUrl, png("logo.png")).unwrap();
        session.select_file(FieldName::StampUrl, png("stamp.png")).unwrap();
    }

    fn token() -> SecretString {
        SecretString::from("tok".to_string())
    }

    #[tokio::test]
    async fn seeds_from_settings() {
        let f = fixture(FixedTransport(Ok(1))).await;
        assert_eq!(f.session.field(FieldName::Name).as_text(), Some("Acme"));
        assert_eq!(f.session.field(FieldName::Email).as_text(), Some("a@acme.io"));
        assert_eq!(f.session.current_step(), 1);
    }

    #[tokio::test]
    async fn missing_seed_is_empty() {
        let settings = LibSqlSettings::new_memory().await.unwrap();
        let seed = load_seed(&settings).await.unwrap();
        assert_eq!(seed, RegistrationSeed::default());
    }

    #[tokio::test]
    async fn step_follows_file_selection_and_removal() {
        let mut f = fixture(FixedTransport(Ok(1))).await;
        f.session.set_field(FieldName::PhoneNumber, "555").unwrap();
        f.session.set_field(FieldName::Address, "1 Main St").unwrap();
        f.session.set_field(FieldName::Prefix, "ACM").unwrap();
        assert_eq!(f.session.current_step(), 4);

        let size = f
            .session
            .select_file(FieldName::LogoUrl, png("logo.png"))
            .unwrap()
            .display_size();
        assert_eq!(size, "2 KB");
        assert_eq!(f.session.current_step(), 5);

        f.session.remove_file(FieldName::LogoUrl).unwrap();
        assert_eq!(f.session.current_step(), 4);
        assert!(f.session.field(FieldName::LogoUrl).is_empty());
        assert_eq!(f.registry.live_count(), 0);

        // Second removal is a no-op
        f.session.remove_file(FieldName::LogoUrl).unwrap();
    }

    #[tokio::test]
    async fn rejected_file_leaves_field_unchanged() {
        let mut f = fixture(FixedTransport(Ok(1))).await;
        f.session.select_file(FieldName::LogoUrl, png("logo.png")).unwrap();

        let gif = SelectedFile::new("logo.gif", "image/gif", vec![1]);
        let err = f.session.select_file(FieldName::LogoUrl, gif).unwrap_err();
        assert!(matches!(err, Error::Attachment(_)));
        assert_eq!(
            f.session.field(FieldName::LogoUrl).as_file().map(|f| f.name.as_str()),
            Some("logo.png")
        );
    }

    #[tokio::test]
    async fn success_persists_id_and_navigates() {
        let mut f = fixture(FixedTransport(Ok(42))).await;
        fill(&mut f.session);
        assert_eq!(f.session.current_step(), 6);
        assert_eq!(f.registry.live_count(), 2);

        let result = f.session.submit(&token()).await.unwrap();
        assert_eq!(result.id(), Some("42"));
        assert_eq!(f.session.status(), SubmissionStatus::Succeeded);

        let attempt = f.session.pipeline().last_attempt().unwrap();
        assert_eq!(attempt.attempt, 1);
        assert_eq!(attempt.status, SubmissionStatus::Succeeded);
        assert!(attempt.finished_at.is_some());

        assert_eq!(
            f.settings.get_string(keys::SCHOOL_ID).await.unwrap().as_deref(),
            Some("42")
        );
        assert_eq!(f.registry.live_count(), 0, "previews released on teardown");
        assert!(f.session.attachment(FieldName::LogoUrl).is_none());
        assert_eq!(
            f.navigator.events(),
            vec![
                format!("success:{SETUP_SUCCESS_MESSAGE}"),
                "navigate:/auth/input-campus".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn failure_notifies_without_navigating() {
        let mut f = fixture(FixedTransport(Err(503))).await;
        fill(&mut f.session);

        let result = f.session.submit(&token()).await.unwrap();
        assert!(!result.is_success());
        assert_eq!(f.session.status(), SubmissionStatus::Failed);
        assert_eq!(f.navigator.events(), vec!["error:Failed to submit form".to_string()]);
        assert!(f.settings.get_string(keys::SCHOOL_ID).await.unwrap().is_none());
        // attachments stay for a retry
        assert_eq!(f.registry.live_count(), 2);
    }

    #[tokio::test]
    async fn back_navigates_to_registration() {
        let f = fixture(FixedTransport(Ok(1))).await;
        f.session.go_back();
        assert_eq!(
            f.navigator.events(),
            vec!["navigate:/auth/auth-layout/super-admin".to_string()]
        );
    }

    #[tokio::test]
    async fn token_is_loaded_from_settings() {
        let settings = LibSqlSettings::new_memory().await.unwrap();
        assert!(load_token(&settings).await.unwrap().is_none());

        settings.set_string(keys::TOKEN, "abc").await.unwrap();
        let token = load_token(&settings).await.unwrap().unwrap();
        use secrecy::ExposeSecret;
        assert_eq!(token.expose_secret(), "abc");
    }

    #[tokio::test]
    async fn validation_failure_reports_each_field_then_toast() {
        let mut f = fixture(FixedTransport(Ok(1))).await;

        let result = f.session.submit(&token()).await.unwrap();
        assert_eq!(result.field_errors().map(|e| e.len()), Some(5));
        assert_eq!(
            f.navigator.events(),
            vec![
                "field:phoneNumber:School Phone Number is required".to_string(),
                "field:address:School Address is required".to_string(),
                "field:prefix:Prefix is required".to_string(),
                "field:logoUrl:School logo is required".to_string(),
                "field:stampUrl:School stamp is required".to_string(),
                "error:Failed to submit form".to_string(),
            ]
        );
        assert_eq!(f.session.status(), SubmissionStatus::Failed);
    }

    #[tokio::test]
    async fn file_selection_and_removal_broadcast_changes() {
        let mut f = fixture(FixedTransport(Ok(1))).await;
        let mut rx = f.session.subscribe();

        f.session.select_file(FieldName::StampUrl, png("stamp.png")).unwrap();
        let change = rx.try_recv().unwrap();
        assert_eq!(change.field, FieldName::StampUrl);
        assert_eq!(
            change.value.as_file().map(|file| file.name.as_str()),
            Some("stamp.png")
        );

        f.session.remove_file(FieldName::StampUrl).unwrap();
        assert_eq!(
            rx.try_recv().unwrap(),
            FieldChange {
                field: FieldName::StampUrl,
                value: FieldValue::File(None),
            }
        );

        // Nothing attached, nothing broadcast
        f.session.remove_file(FieldName::StampUrl).unwrap();
        assert!(rx.try_recv().is_err());
    }

    /// Serves the registration seed but rejects every write.
    struct ReadOnlySettings(LibSqlSettings);

    #[async_trait]
    impl Settings for ReadOnlySettings {
        async fn get_setting(
            &self,
            key: &str,
        ) -> Result<Option<serde_json::Value>, crate::error::SettingsError> {
            self.0.get_setting(key).await
        }

        async fn set_setting(
            &self,
            key: &str,
            _value: &serde_json::Value,
        ) -> Result<(), crate::error::SettingsError> {
            Err(crate::error::SettingsError::Query(format!("read-only: {key}")))
        }

        async fn delete_setting(&self, _key: &str) -> Result<bool, crate::error::SettingsError> {
            Ok(false)
        }
    }

    #[tokio::test]
    async fn school_id_write_failure_still_navigates() {
        let inner = LibSqlSettings::new_memory().await.unwrap();
        inner.set_string(keys::REGISTERED_NAME, "Acme").await.unwrap();
        inner
            .set_string(keys::REGISTERED_EMAIL, "a@acme.io")
            .await
            .unwrap();

        let navigator = Arc::new(RecordingNavigator::default());
        let deps = SessionDeps {
            settings: Arc::new(ReadOnlySettings(inner)),
            validator: Arc::new(SchoolSetupSchema::new()),
            transport: Arc::new(FixedTransport(Ok(9))),
            previews: ObjectUrlRegistry::new(),
            navigator: navigator.clone(),
        };
        let mut session = WizardSession::from_settings(
            StepInferenceEngine::school_setup(),
            WizardRoutes::default(),
            deps,
        )
        .await
        .unwrap();
        fill(&mut session);

        let result = session.submit(&token()).await.unwrap();
        assert_eq!(result.id(), Some("9"));
        assert_eq!(session.status(), SubmissionStatus::Succeeded);
        assert_eq!(
            navigator.events(),
            vec![
                format!("success:{SETUP_SUCCESS_MESSAGE}"),
                "navigate:/auth/input-campus".to_string(),
            ]
        );
    }
}

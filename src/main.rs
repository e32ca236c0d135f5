use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use secrecy::SecretString;

use school_onboarding::config::OnboardingConfig;
use school_onboarding::onboarding::session::load_token;
use school_onboarding::onboarding::{
    FieldName, HttpTransport, LogNavigator, ObjectUrlRegistry, SchoolSetupSchema, SelectedFile,
    SessionDeps, StepInferenceEngine, SubmissionResult, WizardSession,
};
use school_onboarding::settings::LibSqlSettings;

/// Env vars for the text fields the user fills in this stage.
const TEXT_FIELDS: &[(FieldName, &str)] = &[
    (FieldName::PhoneNumber, "SCHOOL_PHONE_NUMBER"),
    (FieldName::Address, "SCHOOL_ADDRESS"),
    (FieldName::Prefix, "SCHOOL_PREFIX"),
];

/// Env vars holding paths to the logo and stamp images.
const FILE_FIELDS: &[(FieldName, &str)] = &[
    (FieldName::LogoUrl, "SCHOOL_LOGO_PATH"),
    (FieldName::StampUrl, "SCHOOL_STAMP_PATH"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = OnboardingConfig::from_env()?;

    eprintln!("School setup v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Endpoint: {}", config.setup_endpoint());
    eprintln!("   Settings: {}", config.db_path.display());

    let settings = Arc::new(
        LibSqlSettings::new_local(&config.db_path)
            .await
            .with_context(|| format!("opening settings at {}", config.db_path.display()))?,
    );

    let token = match std::env::var("ONBOARDING_TOKEN") {
        Ok(t) if !t.is_empty() => SecretString::from(t),
        _ => load_token(settings.as_ref())
            .await?
            .context("no bearer token: set ONBOARDING_TOKEN or complete registration first")?,
    };

    let deps = SessionDeps {
        settings: settings.clone(),
        validator: Arc::new(SchoolSetupSchema::new()),
        transport: Arc::new(HttpTransport::new(config.setup_endpoint())),
        previews: ObjectUrlRegistry::new(),
        navigator: Arc::new(LogNavigator),
    };
    let mut session =
        WizardSession::from_settings(StepInferenceEngine::school_setup(), config.routes(), deps)
            .await?;

    for (field, var) in TEXT_FIELDS {
        if let Ok(value) = std::env::var(var) {
            session.set_field(*field, value)?;
        }
    }

    for (field, var) in FILE_FIELDS {
        if let Ok(path) = std::env::var(var) {
            let file = read_file(Path::new(&path)).await?;
            let attachment = session.select_file(*field, file)?;
            eprintln!(
                "   {}: {} ({})",
                field.label(),
                attachment.file_name,
                attachment.display_size()
            );
        }
    }

    for step in session.progress() {
        tracing::debug!(rank = step.rank, label = %step.label, status = ?step.status, "Step");
    }
    eprintln!(
        "   Step: {} of {}\n",
        session.current_step(),
        session.engine().terminal_rank()
    );

    match session.submit(&token).await? {
        SubmissionResult::Succeeded { id } => {
            println!("{id}");
            Ok(())
        }
        SubmissionResult::Failed {
            message,
            field_errors,
        } => {
            for (field, error) in &field_errors {
                eprintln!("   {}: {}", field.label(), error);
            }
            anyhow::bail!(message)
        }
    }
}

async fn read_file(path: &Path) -> anyhow::Result<SelectedFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let mime = mime_for(&name);
    Ok(SelectedFile::new(name, mime, data))
}

fn mime_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

use std::path::Path;
use std::sync::Arc;

use sessync::prelude::*;
use sessync::init_tracing;

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Stands in for the app's token cache, error reporter and toasts by
/// writing everything to the log.
struct LogReporter;

impl CredentialCache for LogReporter {
    fn clear_cache(&self) {
        tracing::info!("credential cache cleared");
    }
}

impl ErrorTelemetry for LogReporter {
    fn set_user_info(&self, user: Option<&UserId>) {
        match user {
            Some(id) => tracing::info!(user = %id, "telemetry user set"),
            None => tracing::info!("telemetry user cleared"),
        }
    }

    fn capture(&self, error: &(dyn std::error::Error + 'static)) {
        tracing::error!(%error, "captured");
    }
}

impl FlashNotifier for LogReporter {
    fn flash(&self, level: FlashLevel, message: &str) {
        tracing::warn!(%level, text = message, "flash");
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Reads settings from `path`, or uses the defaults when none is given.
fn load_config(path: Option<&Path>) -> Result<SyncConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(SyncConfig::from_json(&std::fs::read_to_string(path)?)?),
        None => Ok(SyncConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = load_config(path.as_deref().map(Path::new))?;
    tracing::info!(service_url = %config.service_url, "starting session demo");

    let reporter = Arc::new(LogReporter);
    let sync = Synchronizer::http(config)?
        .credential_cache(reporter.clone())
        .telemetry(reporter.clone())
        .notifier(reporter)
        .build();

    sync.subscribe(|event| match event {
        SessionEvent::SessionChanged { snapshot, initial_load } => tracing::info!(
            initial_load,
            user = ?snapshot.userid,
            groups = snapshot.groups.len(),
            "session changed"
        ),
        other => tracing::info!(event = other.name(), "session event"),
    });

    let session = sync.load().await;
    tracing::info!(authenticated = session.is_authenticated(), "loaded");

    if let (Ok(username), Ok(password)) = (
        std::env::var("SESSYNC_USERNAME"),
        std::env::var("SESSYNC_PASSWORD"),
    ) {
        let session = sync.login(&Credentials::new(username, password)).await;
        if let Some(reason) = &session.reason {
            tracing::warn!(%reason, "login rejected");
        }

        // Served from the cache the login just primed.
        sync.load().await;
        sync.logout().await;
    }

    Ok(())
}

//! Subcommand implementations
//!
//! `web` serves the exporter, `pw` stores an encrypted password for one or more systems
//! and `config` writes a configuration template.

use crate::app;
use crate::cli::generate_config_template;
use crate::collector::{CallGate, Collector};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::handlers::AppState;
use crate::metrics::Metrics;
use crate::models::{Catalog, SystemDefinition};
use crate::rfc::{Connector, HttpGateway};
use crate::secret::{CredentialStore, SecretStore};
use crate::telemetry;
use futures::future::join_all;
use std::io::{BufRead, IsTerminal};
use std::path::Path;
use std::sync::Arc;

/// Start the exporter
///
/// `timeout_seconds` and `port` override the config file when given. Systems without a
/// usable password are left out; a missing installation key is fatal unless no systems
/// are configured.
pub async fn web(config_path: &Path, timeout_seconds: Option<u64>, port: Option<u16>) -> AppResult<()> {
    let config = Config::from_file(config_path)?.with_overrides(timeout_seconds, port)?;
    telemetry::init(&config.observability.log_level);

    let catalog = Catalog::from_config(&config)?;
    let store = SecretStore::new(config.secret.clone());
    let (credentials, usable) = CredentialStore::resolve(&store, catalog.systems())?;
    if usable.len() < catalog.systems().len() {
        tracing::warn!(
            configured = catalog.systems().len(),
            usable = usable.len(),
            "Some systems are excluded from collection"
        );
    }
    let catalog = Arc::new(catalog.with_systems(usable));

    let connector: Arc<dyn Connector> = Arc::new(HttpGateway::from_config(&config.gateway)?);
    let metrics = Arc::new(Metrics::new()?);
    let collector = Collector::new(
        catalog,
        credentials,
        connector,
        config.scrape_timeout(),
        metrics,
    )
    .with_gate(CallGate::from_ceiling(config.server.max_in_flight_calls));

    app::serve(AppState::new(Arc::new(config), collector)).await
}

/// Result of a logon test against one system
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCheck {
    pub system: String,
    pub error: Option<String>,
}

impl ConnectionCheck {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Run the `pw` subcommand against the real gateway
pub async fn pw(config_path: &Path, systems: &[String], password: &str) -> AppResult<()> {
    let config = Config::from_file(config_path)?;
    telemetry::init(&config.observability.log_level);
    let gateway = HttpGateway::from_config(&config.gateway)?;

    let checks = set_password(config_path, systems, password, &gateway).await?;
    let failed = checks.iter().filter(|check| !check.is_ok()).count();
    tracing::info!(
        systems = checks.len(),
        failed,
        "Connection test finished"
    );
    Ok(())
}

/// Encrypt `password` for `systems`, write the secret table back and test every system
///
/// The config file is only written when every named system is configured. Connection
/// failures are reported, never fatal.
pub async fn set_password(
    config_path: &Path,
    systems: &[String],
    password: &str,
    connector: &dyn Connector,
) -> AppResult<Vec<ConnectionCheck>> {
    if password.is_empty() {
        return Err(AppError::Config("password must not be empty".to_string()));
    }
    let config = Config::from_file(config_path)?;
    let catalog = Catalog::from_config(&config)?;

    let mut store = SecretStore::new(config.secret.clone());
    let updated = store.add_password(&catalog, systems, password)?;
    if updated.is_empty() {
        return Err(AppError::Config(
            "at least one system name is required".to_string(),
        ));
    }
    Config::persist_secret(config_path, store.entries())?;
    tracing::info!(systems = ?updated, "Password stored");

    Ok(test_connections(&catalog, &store, connector).await)
}

/// Try to log on to every configured system and close the session again
pub async fn test_connections(
    catalog: &Catalog,
    store: &SecretStore,
    connector: &dyn Connector,
) -> Vec<ConnectionCheck> {
    let checks = catalog
        .systems()
        .iter()
        .map(|system| test_connection(system, store, connector));
    join_all(checks).await
}

async fn test_connection(
    system: &SystemDefinition,
    store: &SecretStore,
    connector: &dyn Connector,
) -> ConnectionCheck {
    let outcome = match store.decrypt_password(system.name()) {
        Ok(credential) => connector
            .open(system.logon(&credential), system.coordinates())
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    let error = match outcome {
        Ok(mut session) => {
            session.close().await;
            tracing::info!(system = %system.name(), "Connection test passed");
            None
        }
        Err(e) => {
            tracing::warn!(system = %system.name(), error = %e, "No connection to system possible");
            Some(e)
        }
    };
    ConnectionCheck {
        system: system.name().to_string(),
        error,
    }
}

/// Read the `pw` password from stdin
///
/// A terminal gets a prompt without echo; piped input is read as one line.
pub fn password_from_stdin() -> AppResult<String> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        prompt_password()
    } else {
        read_password(stdin.lock())
    }
}

/// Prompt on the terminal with echo disabled
pub fn prompt_password() -> AppResult<String> {
    let password = rpassword::prompt_password("Password: ")
        .map_err(|e| AppError::Internal(format!("cannot read password: {}", e)))?;
    non_empty(password)
}

/// Read one password line, without its line terminator
pub fn read_password<R: BufRead>(mut reader: R) -> AppResult<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| AppError::Internal(format!("cannot read password: {}", e)))?;
    non_empty(line.trim_end_matches(['\r', '\n']).to_string())
}

fn non_empty(password: String) -> AppResult<String> {
    if password.is_empty() {
        return Err(AppError::Config("password must not be empty".to_string()));
    }
    Ok(password)
}

/// Write the configuration template to `output`, or stdout when absent
pub fn write_config_template(output: Option<&Path>) -> AppResult<()> {
    let template = generate_config_template();
    match output {
        Some(path) => {
            std::fs::write(path, template).map_err(|e| AppError::ConfigWriteFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            eprintln!("Configuration template written to {}", path.display());
        }
        None => print!("{}", template),
    }
    Ok(())
}

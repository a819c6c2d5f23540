//! Configuration management for the sample workers.
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `config/kuflow-samples.{yaml,toml}` or the file given with `--config`
//! 3. Environment variables prefixed with `KUFLOW__`, sections separated by
//!    `__` (e.g. `KUFLOW__KUFLOW__API__CLIENT_ID`)
//!
//! A `.env` file in the working directory is read first.
//!
//! ```rust,ignore
//! use kuflow_samples::config::{AppConfig, SampleMode};
//!
//! let config = AppConfig::load(None, SampleMode::LoanWorker)?;
//! ```

pub mod error;
pub mod validator;

pub use error::{ConfigResult, ConfigurationError};
pub use validator::ConfigValidator;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which sample the process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleMode {
    /// Loan approval workflow on the embedded worker.
    LoanWorker,
    /// Email notification workflow on the embedded worker.
    EmailWorker,
    /// UI.Vision robot workflow on the embedded worker.
    UIVisionWorker,
    /// Loan approval driven directly by webhooks, without a workflow engine.
    RestLoan,
}

impl SampleMode {
    /// Whether the mode runs workflows.
    #[must_use]
    pub fn uses_engine(self) -> bool {
        !matches!(self, Self::RestLoan)
    }
}

impl std::fmt::Display for SampleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::LoanWorker => "loan-worker",
            Self::EmailWorker => "email-worker",
            Self::UIVisionWorker => "uivision-worker",
            Self::RestLoan => "rest-loan",
        };
        f.write_str(name)
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub application: ApplicationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub kuflow: KuFlowConfig,
    /// Workflow engine connection.
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub currency: CurrencyConfig,
    #[serde(default)]
    pub uivision: UIVisionConfig,
    #[serde(default)]
    pub email: EmailConfig,
    /// Embedded worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load and validate the configuration for `mode`.
    ///
    /// `path` replaces the default `config/kuflow-samples` file and must
    /// exist when given.
    pub fn load(path: Option<&str>, mode: SampleMode) -> anyhow::Result<Self> {
        let config = Self::load_unchecked(path)?;

        ConfigValidator::validate(&config, mode)
            .map_err(|e| anyhow::anyhow!("Configuration validation failed:\n\n{e}"))?;

        Ok(config)
    }

    /// Load the configuration without validating it.
    pub fn load_unchecked(path: Option<&str>) -> anyhow::Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name("config/kuflow-samples").required(false),
        };

        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("KUFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Application identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    #[serde(default = "default_application_name")]
    pub name: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_application_name(),
        }
    }
}

fn default_application_name() -> String {
    "kuflow-samples".to_string()
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port of the webhook and health endpoints.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_timeout() -> u64 {
    30
}

/// KuFlow settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KuFlowConfig {
    #[serde(default)]
    pub api: KuFlowApiConfig,
}

/// KuFlow REST API credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct KuFlowApiConfig {
    #[serde(default = "default_kuflow_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for KuFlowApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_kuflow_endpoint(),
            client_id: None,
            client_secret: None,
            timeout_secs: default_timeout(),
        }
    }
}

impl std::fmt::Debug for KuFlowApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KuFlowApiConfig")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_kuflow_endpoint() -> String {
    kuflow_rest::DEFAULT_ENDPOINT.to_string()
}

/// Workflow engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    #[serde(default)]
    pub namespace: Option<String>,
    /// Task queue the workflows run on.
    #[serde(default = "default_kuflow_queue")]
    pub kuflow_queue: String,
    /// Remote engine address (`host:port`). Unset keeps the engine embedded.
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub mutual_tls: MutualTlsConfig,
    /// Refresh the engine token this many seconds before it expires.
    #[serde(default = "default_token_refresh_margin")]
    pub token_refresh_margin_secs: u64,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            namespace: None,
            kuflow_queue: default_kuflow_queue(),
            target: None,
            mutual_tls: MutualTlsConfig::default(),
            token_refresh_margin_secs: default_token_refresh_margin(),
        }
    }
}

fn default_kuflow_queue() -> String {
    "kuflow-samples-queue".to_string()
}

fn default_token_refresh_margin() -> u64 {
    60
}

/// mTLS material; each item as a file path or inline PEM.
///
/// Inline data takes precedence over the path.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct MutualTlsConfig {
    #[serde(default)]
    pub ca: Option<PathBuf>,
    #[serde(default)]
    pub ca_data: Option<String>,
    #[serde(default)]
    pub cert: Option<PathBuf>,
    #[serde(default)]
    pub cert_data: Option<String>,
    #[serde(default)]
    pub key: Option<PathBuf>,
    #[serde(default)]
    pub key_data: Option<String>,
}

impl MutualTlsConfig {
    /// Whether a client certificate is configured.
    #[must_use]
    pub fn has_cert(&self) -> bool {
        has_text(self.cert_data.as_deref()) || self.cert.is_some()
    }

    /// Whether a client key is configured.
    #[must_use]
    pub fn has_key(&self) -> bool {
        has_text(self.key_data.as_deref()) || self.key.is_some()
    }
}

impl std::fmt::Debug for MutualTlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutualTlsConfig")
            .field("ca", &self.ca)
            .field("ca_data", &self.ca_data.is_some())
            .field("cert", &self.cert)
            .field("cert_data", &self.cert_data.is_some())
            .field("key", &self.key)
            .field("key_data", &self.key_data.as_ref().map(|_| "***"))
            .finish()
    }
}

pub(crate) fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Currency conversion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Base URL; rates are read from `{api_base}/{currency}.json`.
    #[serde(default = "default_currency_api_base")]
    pub api_base: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            api_base: default_currency_api_base(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_currency_api_base() -> String {
    "https://cdn.jsdelivr.net/npm/@fawazahmed0/currency-api@latest/v1/currencies".to_string()
}

/// UI.Vision robot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UIVisionConfig {
    /// Browser executable that opens the autorun page.
    #[serde(default)]
    pub command: Option<String>,
    /// Directory where the macro writes its log.
    #[serde(default = "default_uivision_log_directory")]
    pub log_directory: PathBuf,
    /// Path of the UI.Vision `ui.vision.html` autorun page.
    #[serde(default)]
    pub auto_run_html: Option<String>,
    /// Macro to run.
    #[serde(default, rename = "macro")]
    pub macro_name: Option<String>,
    #[serde(default = "default_true")]
    pub close_browser: bool,
    #[serde(default = "default_true")]
    pub close_rpa: bool,
    #[serde(default = "default_uivision_timeout")]
    pub execution_timeout_secs: u64,
}

impl Default for UIVisionConfig {
    fn default() -> Self {
        Self {
            command: None,
            log_directory: default_uivision_log_directory(),
            auto_run_html: None,
            macro_name: None,
            close_browser: true,
            close_rpa: true,
            execution_timeout_secs: default_uivision_timeout(),
        }
    }
}

fn default_uivision_log_directory() -> PathBuf {
    std::env::temp_dir().join("uivision-logs")
}

fn default_uivision_timeout() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Outgoing email settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address.
    #[serde(default = "default_email_from")]
    pub from: String,
    /// HTTP mail relay. Unset logs the rendered mail instead of sending it.
    #[serde(default)]
    pub relay_url: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            from: default_email_from(),
            relay_url: None,
        }
    }
}

fn default_email_from() -> String {
    "no-reply@kuflow.local".to_string()
}

/// Where the embedded worker keeps workflow history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventLogKind {
    #[default]
    Memory,
    Sqlite,
}

/// Embedded worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum workflows running at once; extra ones wait as pending.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// Finished workflows kept in memory; older results are read from history.
    #[serde(default = "default_retain_closed")]
    pub retain_closed: usize,
    #[serde(default)]
    pub event_log: EventLogKind,
    /// SQLite file used when `event_log` is `sqlite`.
    #[serde(default = "default_history_path")]
    pub history_path: PathBuf,
    /// Seconds to wait for running workflows on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            retain_closed: default_retain_closed(),
            event_log: EventLogKind::default(),
            history_path: default_history_path(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

fn default_max_concurrent() -> usize {
    100
}

fn default_retain_closed() -> usize {
    durable_kuflow::worker::DEFAULT_RETAIN_CLOSED
}

fn default_history_path() -> PathBuf {
    PathBuf::from("data/kuflow-history.db")
}

fn default_shutdown_grace() -> u64 {
    10
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

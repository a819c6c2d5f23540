//! Configuration validation.
//!
//! Every check runs, so a misconfigured deployment sees all of its problems
//! in one error instead of fixing them one restart at a time.

use super::error::{ConfigResult, ConfigurationError};
use super::{has_text, AppConfig, EventLogKind, SampleMode};

/// Validates an [`AppConfig`] for the sample about to run.
///
/// | Setting                    | loan | email | uivision | rest-loan |
/// |----------------------------|------|-------|----------|-----------|
/// | kuflow.api credentials     | yes  | yes   | yes      | yes       |
/// | temporal.kuflow_queue      | yes  | yes   | yes      | no        |
/// | currency.api_base          | yes  | no    | no       | yes       |
/// | uivision.*                 | no   | no    | yes      | no        |
/// | email.relay_url (if set)   | no   | yes   | no       | no        |
#[derive(Debug)]
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the whole configuration for `mode`.
    pub fn validate(config: &AppConfig, mode: SampleMode) -> ConfigResult<()> {
        let mut errors = Vec::new();

        let mut check = |result: ConfigResult<()>| {
            if let Err(e) = result {
                errors.push(e);
            }
        };

        check(Self::validate_server(config));
        check(Self::validate_kuflow_api(config));

        if mode.uses_engine() {
            check(Self::validate_engine(config));
            check(Self::validate_worker(config));
        }

        match mode {
            SampleMode::LoanWorker | SampleMode::RestLoan => check(Self::validate_currency(config)),
            SampleMode::EmailWorker => check(Self::validate_email(config)),
            SampleMode::UIVisionWorker => check(Self::validate_uivision(config)),
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the HTTP server settings.
    pub fn validate_server(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if config.server.port == 0 {
            errors.push(ConfigurationError::invalid(
                "server.port must not be 0",
                "Set KUFLOW__SERVER__PORT to the port KuFlow delivers webhooks to, e.g. 8080",
            ));
        }
        if config.server.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "server.timeout_secs must be greater than 0",
                "Set KUFLOW__SERVER__TIMEOUT_SECS, e.g. 30",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the KuFlow REST API credentials.
    pub fn validate_kuflow_api(config: &AppConfig) -> ConfigResult<()> {
        let api = &config.kuflow.api;
        let mut errors = Vec::new();

        if !has_text(api.client_id.as_deref()) {
            errors.push(ConfigurationError::missing_required(
                "kuflow.api.client_id",
                "Authenticating against the KuFlow REST API",
                "KUFLOW__KUFLOW__API__CLIENT_ID",
            ));
        }
        if !has_text(api.client_secret.as_deref()) {
            errors.push(ConfigurationError::missing_required(
                "kuflow.api.client_secret",
                "Authenticating against the KuFlow REST API",
                "KUFLOW__KUFLOW__API__CLIENT_SECRET",
            ));
        }
        if let Err(e) = Self::validate_http_url("kuflow.api.endpoint", &api.endpoint) {
            errors.push(e);
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the workflow engine settings.
    pub fn validate_engine(config: &AppConfig) -> ConfigResult<()> {
        let temporal = &config.temporal;
        let tls = &temporal.mutual_tls;
        let mut errors = Vec::new();

        if temporal.kuflow_queue.trim().is_empty() {
            errors.push(ConfigurationError::missing_required(
                "temporal.kuflow_queue",
                "Registering the sample workflows",
                "KUFLOW__TEMPORAL__KUFLOW_QUEUE",
            ));
        }

        if let Some(target) = &temporal.target {
            if target.trim().is_empty() || target.contains(char::is_whitespace) {
                errors.push(ConfigurationError::invalid(
                    format!("temporal.target '{target}' is not a host:port address"),
                    "Set KUFLOW__TEMPORAL__TARGET to the engine address given by KuFlow, \
                    e.g. engine.kuflow.com:443, or unset it to run the embedded engine",
                ));
            }
        }

        if tls.has_cert() != tls.has_key() {
            let (present, missing) = if tls.has_cert() {
                ("cert", "key")
            } else {
                ("key", "cert")
            };
            errors.push(ConfigurationError::invalid(
                format!("temporal.mutual_tls.{present} is set but temporal.mutual_tls.{missing} is not"),
                format!(
                    "Provide both halves of the client certificate: set \
                    temporal.mutual_tls.{missing} (file) or temporal.mutual_tls.{missing}_data (PEM)"
                ),
            ));
        }

        let files = [
            ("ca", &tls.ca, &tls.ca_data),
            ("cert", &tls.cert, &tls.cert_data),
            ("key", &tls.key, &tls.key_data),
        ];
        for (name, path, data) in files {
            if let Some(path) = path {
                if !has_text(data.as_deref()) && !path.is_file() {
                    errors.push(ConfigurationError::invalid(
                        format!(
                            "temporal.mutual_tls.{name} points to '{}', which is not a readable file",
                            path.display()
                        ),
                        format!("Fix the path or pass the PEM inline with temporal.mutual_tls.{name}_data"),
                    ));
                }
            }
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the embedded worker settings.
    pub fn validate_worker(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if config.worker.max_concurrent == 0 {
            errors.push(ConfigurationError::invalid(
                "worker.max_concurrent must be greater than 0",
                "Set KUFLOW__WORKER__MAX_CONCURRENT, e.g. 100",
            ));
        }

        if config.worker.event_log == EventLogKind::Sqlite && !cfg!(feature = "sqlite-backend") {
            errors.push(ConfigurationError::feature_unavailable(
                "SQLite workflow history",
                "The 'sqlite-backend' feature is not enabled in this build",
                "Set KUFLOW__WORKER__EVENT_LOG=memory or rebuild with --features sqlite-backend",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the currency conversion API settings.
    pub fn validate_currency(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_http_url("currency.api_base", &config.currency.api_base) {
            errors.push(e);
        }
        if config.currency.timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "currency.timeout_secs must be greater than 0",
                "Set KUFLOW__CURRENCY__TIMEOUT_SECS, e.g. 30",
            ));
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the email settings.
    pub fn validate_email(config: &AppConfig) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if config.email.from.trim().is_empty() || !config.email.from.contains('@') {
            errors.push(ConfigurationError::invalid(
                format!("email.from '{}' is not an email address", config.email.from),
                "Set KUFLOW__EMAIL__FROM to the sender address",
            ));
        }
        if let Some(relay) = &config.email.relay_url {
            if let Err(e) = Self::validate_http_url("email.relay_url", relay) {
                errors.push(e);
            }
        }

        ConfigurationError::collect(errors)
    }

    /// Validate the UI.Vision robot settings.
    pub fn validate_uivision(config: &AppConfig) -> ConfigResult<()> {
        let uivision = &config.uivision;
        let mut errors = Vec::new();

        let required = [
            ("uivision.command", "KUFLOW__UIVISION__COMMAND", &uivision.command),
            (
                "uivision.auto_run_html",
                "KUFLOW__UIVISION__AUTO_RUN_HTML",
                &uivision.auto_run_html,
            ),
            ("uivision.macro", "KUFLOW__UIVISION__MACRO", &uivision.macro_name),
        ];
        for (setting, env_var, value) in required {
            if !has_text(value.as_deref()) {
                errors.push(ConfigurationError::missing_required(
                    setting,
                    "Running the UI.Vision robot",
                    env_var,
                ));
            }
        }

        if uivision.execution_timeout_secs == 0 {
            errors.push(ConfigurationError::invalid(
                "uivision.execution_timeout_secs must be greater than 0",
                "Set KUFLOW__UIVISION__EXECUTION_TIMEOUT_SECS to the longest the macro may run",
            ));
        }

        ConfigurationError::collect(errors)
    }

    fn validate_http_url(setting: &str, value: &str) -> ConfigResult<()> {
        match url::Url::parse(value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(ConfigurationError::invalid(
                format!("{setting} uses unsupported scheme '{}'", url.scheme()),
                format!("Use an http:// or https:// URL for {setting}"),
            )),
            Err(e) => Err(ConfigurationError::invalid(
                format!("{setting} '{value}' is not a valid URL: {e}"),
                format!("Use an absolute http:// or https:// URL for {setting}"),
            )),
        }
    }
}

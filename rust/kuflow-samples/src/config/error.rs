//! Configuration errors.
//!
//! Each variant renders a multi-line message naming the setting involved
//! and what to change, since these end up on the terminal of whoever
//! deploys the sample.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration: {message}\n\nHow to fix: {fix_hint}")]
    Invalid { message: String, fix_hint: String },

    #[error("Missing required configuration: {setting}\n\nRequired for: {context}\nSet via: {env_var}")]
    MissingRequired {
        setting: String,
        /// What needs the setting.
        context: String,
        env_var: String,
    },

    /// The build lacks a cargo feature the configuration asks for.
    #[error("Feature not available: {feature}\n\nReason: {reason}\nAlternative: {alternative}")]
    FeatureUnavailable {
        feature: String,
        reason: String,
        alternative: String,
    },

    #[error("Connection failed: {service}\n\nEndpoint: {endpoint}\nError: {error}\n\nCheck: {troubleshooting}")]
    ConnectionFailed {
        service: String,
        endpoint: String,
        error: String,
        troubleshooting: String,
    },

    /// Several problems, numbered in the order they were found.
    #[error("Multiple configuration errors:\n{}", numbered(.0))]
    Multiple(Vec<ConfigurationError>),
}

fn numbered(errors: &[ConfigurationError]) -> String {
    errors
        .iter()
        .enumerate()
        .map(|(i, err)| format!("\n{}. {err}\n", i + 1))
        .collect()
}

impl ConfigurationError {
    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>, fix_hint: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
            fix_hint: fix_hint.into(),
        }
    }

    /// Create a missing required configuration error.
    #[must_use]
    pub fn missing_required(
        setting: impl Into<String>,
        context: impl Into<String>,
        env_var: impl Into<String>,
    ) -> Self {
        Self::MissingRequired {
            setting: setting.into(),
            context: context.into(),
            env_var: env_var.into(),
        }
    }

    /// Create a feature unavailable error.
    #[must_use]
    pub fn feature_unavailable(
        feature: impl Into<String>,
        reason: impl Into<String>,
        alternative: impl Into<String>,
    ) -> Self {
        Self::FeatureUnavailable {
            feature: feature.into(),
            reason: reason.into(),
            alternative: alternative.into(),
        }
    }

    /// Create a connection failed error.
    #[must_use]
    pub fn connection_failed(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        error: impl Into<String>,
        troubleshooting: impl Into<String>,
    ) -> Self {
        Self::ConnectionFailed {
            service: service.into(),
            endpoint: endpoint.into(),
            error: error.into(),
            troubleshooting: troubleshooting.into(),
        }
    }

    /// Collapse a list of errors: `Ok` when empty, the error itself when
    /// there is one, [`Self::Multiple`] otherwise. Nested lists are flattened.
    pub fn collect(errors: Vec<ConfigurationError>) -> ConfigResult<()> {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                Self::Multiple(inner) => flat.extend(inner),
                err => flat.push(err),
            }
        }

        match flat.len() {
            0 => Ok(()),
            1 => Err(flat.remove(0)),
            _ => Err(Self::Multiple(flat)),
        }
    }

    /// Check if this is a multiple errors wrapper.
    #[must_use]
    pub fn is_multiple(&self) -> bool {
        matches!(self, Self::Multiple(_))
    }

    /// Get the number of errors (1 for single errors, N for multiple).
    #[must_use]
    pub fn count(&self) -> usize {
        match self {
            Self::Multiple(errors) => errors.len(),
            _ => 1,
        }
    }
}

/// Result type for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigurationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_error_display() {
        let err = ConfigurationError::invalid(
            "server.port must not be 0",
            "Set KUFLOW__SERVER__PORT to a free port, e.g. 8080",
        );
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("server.port"));
        assert!(msg.contains("How to fix"));
    }

    #[test]
    fn test_missing_required_error_display() {
        let err = ConfigurationError::missing_required(
            "kuflow.api.client_id",
            "Authenticating against the KuFlow REST API",
            "KUFLOW__KUFLOW__API__CLIENT_ID",
        );
        let msg = err.to_string();
        assert!(msg.contains("Missing required"));
        assert!(msg.contains("KUFLOW__KUFLOW__API__CLIENT_ID"));
    }

    #[test]
    fn test_connection_failed_error_display() {
        let err = ConfigurationError::connection_failed(
            "Workflow engine",
            "https://engine.kuflow.com:443",
            "Connection refused",
            "Check temporal.target and the mTLS certificates",
        );
        let msg = err.to_string();
        assert!(msg.contains("Connection failed"));
        assert!(msg.contains("engine.kuflow.com"));
    }

    #[test]
    fn test_collect_flattens() {
        assert!(ConfigurationError::collect(vec![]).is_ok());

        let single = ConfigurationError::collect(vec![ConfigurationError::invalid("a", "b")])
            .unwrap_err();
        assert!(!single.is_multiple());

        let err = ConfigurationError::collect(vec![
            ConfigurationError::invalid("Error 1", "Fix 1"),
            ConfigurationError::Multiple(vec![
                ConfigurationError::invalid("Error 2", "Fix 2"),
                ConfigurationError::invalid("Error 3", "Fix 3"),
            ]),
        ])
        .unwrap_err();
        assert_eq!(err.count(), 3);
        let msg = err.to_string();
        assert!(msg.contains("Multiple configuration errors"));
        assert!(msg.contains("3. Invalid configuration: Error 3"));
    }
}

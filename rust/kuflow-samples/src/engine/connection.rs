//! gRPC channel to a remote workflow engine.
//!
//! The channel uses mutual TLS and carries a KuFlow engine token as bearer
//! credentials on every request. The token is fetched from the KuFlow
//! authentications endpoint before connecting and refreshed in the
//! background shortly before it expires.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use kuflow_rest::models::AuthenticationEngineToken;
use kuflow_rest::{KuFlowError, KuFlowRestClient};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::interceptor::InterceptedService;
use tonic::service::Interceptor;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity};
use tonic::{Request, Status};

use crate::config::{has_text, ConfigurationError, MutualTlsConfig, TemporalConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MIN_REFRESH_DELAY: Duration = Duration::from_secs(5);
const RETRY_DELAY: Duration = Duration::from_secs(30);

/// Current engine token, shared between the interceptor and the refresh task.
#[derive(Debug, Clone, Default)]
pub struct EngineToken {
    inner: Arc<RwLock<Option<String>>>,
}

impl EngineToken {
    pub fn set(&self, token: impl Into<String>) {
        *self.inner.write() = Some(token.into());
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.inner.read().clone()
    }
}

/// Adds `authorization: Bearer <token>` to outgoing requests.
#[derive(Debug, Clone)]
pub struct BearerTokenInterceptor {
    token: EngineToken,
}

impl BearerTokenInterceptor {
    #[must_use]
    pub fn new(token: EngineToken) -> Self {
        Self { token }
    }
}

impl Interceptor for BearerTokenInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        let Some(token) = self.token.get() else {
            return Err(Status::unauthenticated("No engine token available yet"));
        };
        let value: MetadataValue<Ascii> = format!("Bearer {token}")
            .parse()
            .map_err(|e| Status::internal(format!("Invalid engine token: {e}")))?;
        request.metadata_mut().insert("authorization", value);
        Ok(request)
    }
}

/// Authenticated channel to the remote engine.
pub struct EngineConnection {
    target: String,
    namespace: Option<String>,
    channel: InterceptedService<Channel, BearerTokenInterceptor>,
    token: EngineToken,
    refresh: JoinHandle<()>,
}

impl std::fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConnection")
            .field("target", &self.target)
            .field("namespace", &self.namespace)
            .field("has_token", &self.token.get().is_some())
            .finish_non_exhaustive()
    }
}

impl EngineConnection {
    /// Fetch a first token and open a lazy channel to `temporal.target`.
    pub async fn connect(
        config: &TemporalConfig,
        client: &KuFlowRestClient,
    ) -> Result<Self, ConfigurationError> {
        let target = config
            .target
            .as_deref()
            .filter(|t| has_text(Some(t)))
            .ok_or_else(|| {
                ConfigurationError::missing_required(
                    "temporal.target",
                    "Connecting to a remote workflow engine",
                    "KUFLOW__TEMPORAL__TARGET",
                )
            })?;
        let uri = target_uri(target);

        let endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| {
                ConfigurationError::invalid(
                    format!("temporal.target '{target}' is not a valid address: {e}"),
                    "Use host:port, e.g. engine.kuflow.com:443",
                )
            })?
            .tls_config(tls_config(&config.mutual_tls)?)
            .map_err(|e| {
                ConfigurationError::invalid(
                    format!("TLS settings rejected: {e}"),
                    "Check the PEM material under temporal.mutual_tls",
                )
            })?
            .connect_timeout(CONNECT_TIMEOUT);

        let token = EngineToken::default();
        let first = fetch_token(client).await.map_err(|e| {
            ConfigurationError::connection_failed(
                "KuFlow engine authentication",
                client.endpoint(),
                e.to_string(),
                "kuflow.api.client_id / client_secret and that the application may use the engine",
            )
        })?;
        token.set(first.token.clone());

        let margin = Duration::from_secs(config.token_refresh_margin_secs);
        let refresh = tokio::spawn(refresh_loop(
            client.clone(),
            token.clone(),
            margin,
            refresh_delay(first.expired_at, Utc::now(), margin),
        ));

        tracing::info!(target = %uri, namespace = ?config.namespace, "Engine channel configured");
        Ok(Self {
            target: uri,
            namespace: config.namespace.clone(),
            channel: InterceptedService::new(
                endpoint.connect_lazy(),
                BearerTokenInterceptor::new(token.clone()),
            ),
            token,
            refresh,
        })
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Channel for generated engine clients.
    #[must_use]
    pub fn channel(&self) -> InterceptedService<Channel, BearerTokenInterceptor> {
        self.channel.clone()
    }

    #[must_use]
    pub fn token(&self) -> &EngineToken {
        &self.token
    }
}

impl Drop for EngineConnection {
    fn drop(&mut self) {
        self.refresh.abort();
    }
}

fn target_uri(target: &str) -> String {
    let target = target.trim();
    if target.contains("://") {
        target.to_string()
    } else {
        format!("https://{target}")
    }
}

/// Build the client TLS settings.
///
/// Inline PEM data wins over a file path. Without a CA the public web
/// roots are trusted. Certificate and key must come together.
pub fn tls_config(mtls: &MutualTlsConfig) -> Result<ClientTlsConfig, ConfigurationError> {
    let mut tls = ClientTlsConfig::new();

    tls = match read_pem("ca", mtls.ca_data.as_deref(), mtls.ca.as_deref())? {
        Some(ca) => tls.ca_certificate(Certificate::from_pem(ca)),
        None => tls.with_webpki_roots(),
    };

    let cert = read_pem("cert", mtls.cert_data.as_deref(), mtls.cert.as_deref())?;
    let key = read_pem("key", mtls.key_data.as_deref(), mtls.key.as_deref())?;
    match (cert, key) {
        (Some(cert), Some(key)) => Ok(tls.identity(Identity::from_pem(cert, key))),
        (None, None) => Ok(tls),
        (Some(_), None) => Err(half_identity("cert", "key")),
        (None, Some(_)) => Err(half_identity("key", "cert")),
    }
}

fn half_identity(present: &str, missing: &str) -> ConfigurationError {
    ConfigurationError::invalid(
        format!("temporal.mutual_tls.{present} is set but temporal.mutual_tls.{missing} is not"),
        "Provide both the client certificate and its private key, or neither",
    )
}

fn read_pem(
    name: &str,
    data: Option<&str>,
    path: Option<&Path>,
) -> Result<Option<Vec<u8>>, ConfigurationError> {
    if let Some(data) = data.filter(|d| has_text(Some(d))) {
        return Ok(Some(data.as_bytes().to_vec()));
    }
    let Some(path) = path else {
        return Ok(None);
    };
    std::fs::read(path).map(Some).map_err(|e| {
        ConfigurationError::invalid(
            format!("Cannot read temporal.mutual_tls.{name} file {}: {e}", path.display()),
            format!("Point temporal.mutual_tls.{name} to a readable PEM file or set temporal.mutual_tls.{name}_data"),
        )
    })
}

async fn fetch_token(client: &KuFlowRestClient) -> Result<AuthenticationEngineToken, KuFlowError> {
    client
        .create_engine_token()
        .await?
        .engine_token
        .ok_or_else(|| KuFlowError::Configuration("KuFlow returned no engine token".to_string()))
}

/// How long to wait before refreshing a token expiring at `expired_at`.
fn refresh_delay(expired_at: DateTime<Utc>, now: DateTime<Utc>, margin: Duration) -> Duration {
    let remaining = (expired_at - now).to_std().unwrap_or_default();
    remaining.saturating_sub(margin).max(MIN_REFRESH_DELAY)
}

async fn refresh_loop(client: KuFlowRestClient, token: EngineToken, margin: Duration, first_delay: Duration) {
    let mut delay = first_delay;
    loop {
        tokio::time::sleep(delay).await;
        delay = match fetch_token(&client).await {
            Ok(fresh) => {
                token.set(fresh.token);
                tracing::debug!(expires_at = %fresh.expired_at, "Engine token refreshed");
                refresh_delay(fresh.expired_at, Utc::now(), margin)
            }
            Err(e) => {
                tracing::warn!(error = %e, retry_in = ?RETRY_DELAY, "Engine token refresh failed");
                RETRY_DELAY
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interceptor_adds_bearer() {
        let token = EngineToken::default();
        let mut interceptor = BearerTokenInterceptor::new(token.clone());
        assert_eq!(
            interceptor.call(Request::new(())).unwrap_err().code(),
            tonic::Code::Unauthenticated
        );

        token.set("abc123");
        let request = interceptor.call(Request::new(())).unwrap();
        assert_eq!(request.metadata().get("authorization").unwrap(), "Bearer abc123");
    }

    #[test]
    fn test_cert_without_key_is_rejected() {
        let mtls = MutualTlsConfig {
            cert_data: Some("-----BEGIN CERTIFICATE-----".to_string()),
            ..MutualTlsConfig::default()
        };
        let err = tls_config(&mtls).unwrap_err();
        assert!(err
            .to_string()
            .contains("temporal.mutual_tls.cert is set but temporal.mutual_tls.key is not"));
    }

    #[test]
    fn test_inline_data_wins_over_missing_file() {
        let mtls = MutualTlsConfig {
            ca: Some("/nonexistent/ca.pem".into()),
            ca_data: Some("-----BEGIN CERTIFICATE-----\n".to_string()),
            ..MutualTlsConfig::default()
        };
        assert!(tls_config(&mtls).is_ok());

        let mtls = MutualTlsConfig {
            ca: Some("/nonexistent/ca.pem".into()),
            ..MutualTlsConfig::default()
        };
        assert!(tls_config(&mtls).unwrap_err().to_string().contains("Cannot read"));
    }

    #[test]
    fn test_refresh_delay() {
        let now = Utc::now();
        let margin = Duration::from_secs(60);
        assert_eq!(
            refresh_delay(now + chrono::Duration::seconds(600), now, margin),
            Duration::from_secs(540)
        );
        assert_eq!(refresh_delay(now - chrono::Duration::seconds(1), now, margin), MIN_REFRESH_DELAY);
    }

    #[test]
    fn test_target_uri() {
        assert_eq!(target_uri("engine.kuflow.com:443"), "https://engine.kuflow.com:443");
        assert_eq!(target_uri("http://localhost:7233"), "http://localhost:7233");
    }

    #[tokio::test]
    async fn test_connect_requires_target() {
        let client = KuFlowRestClient::builder()
            .endpoint("http://127.0.0.1:1")
            .client_id("id")
            .client_secret("secret")
            .build()
            .unwrap();
        let err = EngineConnection::connect(&TemporalConfig::default(), &client)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::MissingRequired { .. }));
    }
}

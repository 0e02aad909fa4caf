use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;

use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;

use crate::query::FeatureQuery;

/// Remote service code for "token required".
const TOKEN_REQUIRED: u16 = 499;
/// Remote service code for "invalid token".
const INVALID_TOKEN: u16 = 498;

/// Error type for feature source operations.
#[derive(Debug)]
pub enum SourceError {
    /// Network or remote failure; per-cell and non-fatal.
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
    /// The service challenged for credentials; drives the retry protocol
    /// instead of a plain error event.
    AuthRequired { code: u16 },
    /// The payload failed to parse; handled like a transport failure.
    Malformed { message: String },
}

impl SourceError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn is_auth_challenge(&self) -> bool {
        matches!(self, Self::AuthRequired { .. })
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message, .. } => write!(f, "{message}"),
            Self::AuthRequired { code } => {
                write!(f, "remote service requires authentication (code {code})")
            }
            Self::Malformed { message } => write!(f, "malformed response: {message}"),
        }
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport { source, .. } => source.as_ref().map(|e| e.as_ref() as _),
            _ => None,
        }
    }
}

/// Raw payload of one cell fetch.
///
/// The loader never interprets feature contents; `features()` is a
/// convenience accessor for hosts that want the conventional array.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePage {
    pub raw: Value,
}

impl FeaturePage {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    pub fn empty() -> Self {
        Self::new(serde_json::json!({ "features": [] }))
    }

    pub fn features(&self) -> &[Value] {
        self.raw
            .get("features")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for queryable feature sources.
///
/// Implementations must be `Send + Sync` for use across async tasks.
/// Methods return boxed futures for dyn-compatibility.
pub trait FeatureSource: Send + Sync {
    /// Runs one spatial/attribute query and resolves with the raw page.
    fn query(&self, query: FeatureQuery) -> BoxFuture<'_, Result<FeaturePage, SourceError>>;
}

/// HTTP-backed feature source for ArcGIS-style `query` endpoints.
pub struct HttpFeatureSource {
    url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ServiceEnvelope {
    error: Option<ServiceError>,
}

impl HttpFeatureSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Interprets a response body.
///
/// These services report most failures inside a 200 body, so the JSON-level
/// `error.code` is inspected before the payload is accepted: token codes
/// become an auth challenge, anything else a transport error.
fn parse_body(text: &str) -> Result<FeaturePage, SourceError> {
    let raw: Value = serde_json::from_str(text).map_err(|e| SourceError::malformed(e.to_string()))?;

    if let Ok(envelope) = serde_json::from_value::<ServiceEnvelope>(raw.clone())
        && let Some(err) = envelope.error
    {
        if err.code == TOKEN_REQUIRED || err.code == INVALID_TOKEN {
            return Err(SourceError::AuthRequired { code: err.code });
        }
        return Err(SourceError::transport(format!(
            "service error {}: {}",
            err.code, err.message
        )));
    }

    Ok(FeaturePage::new(raw))
}

impl FeatureSource for HttpFeatureSource {
    fn query(&self, query: FeatureQuery) -> BoxFuture<'_, Result<FeaturePage, SourceError>> {
        Box::pin(async move {
            let resp = self
                .client
                .get(&self.url)
                .query(&query.to_params())
                .send()
                .await
                .map_err(|e| SourceError::with_source("HTTP request failed", e))?;

            let status = resp.status();
            if status == reqwest::StatusCode::UNAUTHORIZED
                || status == reqwest::StatusCode::FORBIDDEN
            {
                return Err(SourceError::AuthRequired {
                    code: status.as_u16(),
                });
            }
            if !status.is_success() {
                return Err(SourceError::transport(format!("HTTP error: {status}")));
            }

            let text = resp
                .text()
                .await
                .map_err(|e| SourceError::with_source("Failed to read response", e))?;

            parse_body(&text)
        })
    }
}

/// In-memory feature source for testing or offline use.
///
/// Responses are scripted in order; once the script runs out every query
/// resolves with an empty page. Incoming queries are recorded for
/// inspection.
#[derive(Default)]
pub struct MemoryFeatureSource {
    responses: Mutex<VecDeque<Result<FeaturePage, SourceError>>>,
    recorded: Mutex<Vec<FeatureQuery>>,
}

impl MemoryFeatureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, page: FeaturePage) {
        self.responses.lock().push_back(Ok(page));
    }

    pub fn push_error(&self, error: SourceError) {
        self.responses.lock().push_back(Err(error));
    }

    pub fn call_count(&self) -> usize {
        self.recorded.lock().len()
    }

    pub fn recorded(&self) -> Vec<FeatureQuery> {
        self.recorded.lock().clone()
    }
}

impl FeatureSource for MemoryFeatureSource {
    fn query(&self, query: FeatureQuery) -> BoxFuture<'_, Result<FeaturePage, SourceError>> {
        Box::pin(async move {
            self.recorded.lock().push(query);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(FeaturePage::empty()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{FeaturePage, FeatureSource, MemoryFeatureSource, SourceError, parse_body};
    use crate::query::FeatureQuery;
    use serde_json::json;

    #[test]
    fn parse_body_accepts_a_feature_payload() {
        let page = parse_body(r#"{"features":[{"attributes":{"id":1}}]}"#).unwrap();
        assert_eq!(page.features().len(), 1);
    }

    #[test]
    fn parse_body_maps_token_codes_to_auth_challenge() {
        for code in [498, 499] {
            let text = format!(r#"{{"error":{{"code":{code},"message":"token required"}}}}"#);
            let err = parse_body(&text).unwrap_err();
            assert!(err.is_auth_challenge(), "code {code} should challenge");
        }
    }

    #[test]
    fn parse_body_maps_other_service_errors_to_transport() {
        let err = parse_body(r#"{"error":{"code":400,"message":"bad request"}}"#).unwrap_err();
        assert!(matches!(err, SourceError::Transport { .. }));
        assert!(err.to_string().contains("400"));
    }

    #[test]
    fn parse_body_flags_unparseable_payloads() {
        let err = parse_body("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }

    #[test]
    fn feature_page_without_array_is_empty() {
        let page = FeaturePage::new(json!({"count": 3}));
        assert!(page.features().is_empty());
    }

    #[tokio::test]
    async fn memory_source_replays_script_then_empty_pages() {
        let source = MemoryFeatureSource::new();
        source.push_error(SourceError::transport("boom"));

        let first = source.query(FeatureQuery::new()).await;
        assert!(first.is_err());

        let second = source.query(FeatureQuery::new()).await.unwrap();
        assert!(second.features().is_empty());
        assert_eq!(source.call_count(), 2);
    }
}

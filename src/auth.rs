//! Delegated access control.
//!
//! Every read carries a JSON body `{"Token": "..."}`. The token is handed to
//! an external validation service which answers with an HTTP status: 200
//! means the token is valid, anything else means it is not.

use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "Token", default)]
    pub value: String,
}

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }

    /// Missing or malformed bodies yield an empty token.
    pub fn from_body(body: &[u8]) -> Self {
        serde_json::from_slice(body).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

#[async_trait]
pub trait TokenValidator: Send + Sync {
    /// `Ok(false)` for a rejected token, `Err(ServiceUnavailable)` when the
    /// validator could not be asked.
    async fn validate(&self, token: &AccessToken) -> Result<bool>;
}

/// Asks the token service over HTTP.
#[derive(Debug, Clone)]
pub struct RemoteTokenValidator {
    client: Client,
    url: String,
}

impl RemoteTokenValidator {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::HttpError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl TokenValidator for RemoteTokenValidator {
    async fn validate(&self, token: &AccessToken) -> Result<bool> {
        let response = self
            .client
            .post(&self.url)
            .json(token)
            .send()
            .await
            .map_err(|e| {
                error!("Token service at {} unreachable: {}", self.url, e);
                Error::ServiceUnavailable(format!("token service unreachable: {}", e))
            })?;

        debug!("Token service answered {}", response.status());
        Ok(response.status() == StatusCode::OK)
    }
}

#[derive(Clone)]
pub struct AccessGate {
    validator: Arc<dyn TokenValidator>,
}

impl AccessGate {
    pub fn new(validator: Arc<dyn TokenValidator>) -> Self {
        Self { validator }
    }

    pub fn remote(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self::new(Arc::new(RemoteTokenValidator::new(url, timeout)?)))
    }

    pub async fn authorize(&self, body: &[u8]) -> Result<bool> {
        let token = AccessToken::from_body(body);
        self.validator.validate(&token).await
    }

    /// Like `authorize`, with a denial turned into `Error::AuthDenied`.
    pub async fn require(&self, body: &[u8]) -> Result<()> {
        if self.authorize(body).await? {
            Ok(())
        } else {
            Err(Error::AuthDenied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn oracle_accepting(valid: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/checkToken"))
            .and(body_json(serde_json::json!({ "Token": valid })))
            .respond_with(ResponseTemplate::new(200))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/checkToken"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn gate_for(server: &MockServer) -> AccessGate {
        AccessGate::remote(format!("{}/checkToken", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_token_extraction() {
        assert_eq!(AccessToken::from_body(br#"{"Token":"abc"}"#).value, "abc");
        assert!(AccessToken::from_body(b"").is_empty());
        assert!(AccessToken::from_body(b"not json").is_empty());
        assert!(AccessToken::from_body(br#"{"token":"lowercase"}"#).is_empty());
        assert!(AccessToken::from_body(br#"["Token"]"#).is_empty());
    }

    #[tokio::test]
    async fn test_valid_token_allowed() {
        let server = oracle_accepting("secret").await;
        let gate = gate_for(&server);

        assert!(gate.authorize(br#"{"Token":"secret"}"#).await.unwrap());
        assert!(gate.require(br#"{"Token":"secret"}"#).await.is_ok());
    }

    #[tokio::test]
    async fn test_rejected_tokens_denied() {
        let server = oracle_accepting("secret").await;
        let gate = gate_for(&server);

        assert!(!gate.authorize(br#"{"Token":"wrong"}"#).await.unwrap());
        assert!(!gate.authorize(b"").await.unwrap());
        assert!(!gate.authorize(b"{garbage").await.unwrap());
        assert!(matches!(gate.require(b"").await, Err(Error::AuthDenied)));
    }

    #[tokio::test]
    async fn test_non_200_success_is_denied() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&mock_server)
            .await;

        let gate = gate_for(&mock_server);
        assert!(!gate.authorize(br#"{"Token":"secret"}"#).await.unwrap());
    }

    #[tokio::test]
    async fn test_token_with_quotes_is_sent_as_json() {
        let server = oracle_accepting(r#"to"ken"#).await;
        let gate = gate_for(&server);

        assert!(gate.authorize(br#"{"Token":"to\"ken"}"#).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreachable_oracle_is_recoverable() {
        let gate = AccessGate::remote("http://127.0.0.1:1/checkToken", Duration::from_secs(2)).unwrap();

        let result = gate.authorize(br#"{"Token":"secret"}"#).await;
        assert!(matches!(result, Err(Error::ServiceUnavailable(_))));
    }
}

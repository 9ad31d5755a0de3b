//! ==============================================================================
//! api.rs - json-over-https client for the battery service
//! ==============================================================================
//!
//! purpose:
//!     sends one request at a time, attaches the bearer token when the call
//!     is protected, and classifies the outcome into Ok(payload) or a
//!     ClientError carrying a human-readable message.
//!
//! conventions:
//!     - every request body is wrapped as { "data": <body> }
//!     - readings are posted to and listed from /api/batteries
//!
//! relationships:
//!     - uses: store.rs (credential lookup before protected calls)
//!     - used by: workflow/* through the BatteryApi trait
//!
//! ==============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Response, Url};
use serde_json::{json, Value};

use crate::domain::{AuthRequest, AuthResponse, BatteryReading, NewReading};
use crate::error::{ApiResult, ClientError, SERVER_ERROR_FALLBACK};
use crate::store::CredentialStore;

pub const BATTERIES_PATH: &str = "/api/batteries";

/// the three calls the workflows need from the remote service
#[async_trait]
pub trait BatteryApi: Send + Sync {
    /// login or register depending on the request variant (no credential)
    async fn authenticate(&self, request: &AuthRequest) -> ApiResult<AuthResponse>;

    /// record one reading (requires a stored credential)
    async fn submit_reading(&self, reading: NewReading) -> ApiResult<Value>;

    /// readings in server order (requires a stored credential)
    async fn list_readings(&self) -> ApiResult<Vec<BatteryReading>>;
}

#[derive(Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    store: CredentialStore,
}

impl HttpApiClient {
    pub fn new(base_url: &str, timeout: Duration, store: CredentialStore) -> ApiResult<Self> {
        Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("invalid base url {base_url:?}: {e}")))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> ApiResult<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined)
            .map_err(|e| ClientError::Config(format!("invalid url {joined:?}: {e}")))
    }

    /// send one request and classify the response
    ///
    /// protected calls load the credential first and fail with
    /// `Unauthenticated` before touching the network when it is absent.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        requires_auth: bool,
    ) -> ApiResult<Value> {
        let credential = if requires_auth {
            Some(self.store.load()?.ok_or(ClientError::Unauthenticated)?)
        } else {
            None
        };

        let mut request = self
            .client
            .request(method.clone(), self.url(path)?)
            .header(CONTENT_TYPE, "application/json");
        if let Some(credential) = &credential {
            request = request.header(AUTHORIZATION, credential.bearer());
        }
        if let Some(body) = body {
            request = request.body(json!({ "data": body }).to_string());
        }

        tracing::debug!(%method, path, authenticated = requires_auth, "sending request");
        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path, error = %e, "request failed");
            ClientError::Network(e.to_string())
        })?;
        read_response(response).await
    }
}

async fn read_response(response: Response) -> ApiResult<Value> {
    let status = response.status();
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|ct| ct.contains("application/json"))
        .unwrap_or(false);
    let body = response.text().await?;

    if !status.is_success() {
        let message = error_message(&body);
        tracing::warn!(status = status.as_u16(), %message, "server rejected request");
        return Err(ClientError::server(status.as_u16(), message));
    }

    if !is_json {
        return Ok(json!({ "message": body }));
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body)
        .map_err(|e| ClientError::Parse(format!("invalid JSON response: {e}")))
}

/// the `message` field of a json error body, or the generic fallback
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(|value| value.get("message"))
        .and_then(Value::as_str)
        .filter(|message| !message.is_empty())
        .unwrap_or(SERVER_ERROR_FALLBACK)
        .to_string()
}

fn parse_auth_response(payload: Value) -> ApiResult<AuthResponse> {
    if payload.is_null() {
        return Ok(AuthResponse::default());
    }
    let mut response: AuthResponse = serde_json::from_value(payload)
        .map_err(|e| ClientError::Parse(format!("unexpected auth response: {e}")))?;
    response.token = response.token.filter(|token| !token.is_empty());
    Ok(response)
}

/// accepts a bare array or an object whose `data` field is the array
fn parse_readings(payload: Value) -> ApiResult<Vec<BatteryReading>> {
    let list = match payload {
        Value::Array(list) => Value::Array(list),
        Value::Object(mut object) => object
            .remove("data")
            .filter(Value::is_array)
            .ok_or_else(|| ClientError::Parse("history response has no reading list".to_string()))?,
        other => {
            return Err(ClientError::Parse(format!(
                "history response is not a list: {other}"
            )))
        }
    };
    serde_json::from_value(list).map_err(|e| ClientError::Parse(format!("invalid reading: {e}")))
}

#[async_trait]
impl BatteryApi for HttpApiClient {
    async fn authenticate(&self, request: &AuthRequest) -> ApiResult<AuthResponse> {
        let body = serde_json::to_value(request)
            .map_err(|e| ClientError::Parse(e.to_string()))?;
        let payload = self
            .send(Method::POST, request.mode().endpoint(), Some(body), false)
            .await?;
        parse_auth_response(payload)
    }

    async fn submit_reading(&self, reading: NewReading) -> ApiResult<Value> {
        let body = serde_json::to_value(reading).map_err(|e| ClientError::Parse(e.to_string()))?;
        self.send(Method::POST, BATTERIES_PATH, Some(body), true).await
    }

    async fn list_readings(&self) -> ApiResult<Vec<BatteryReading>> {
        let payload = self.send(Method::GET, BATTERIES_PATH, None, true).await?;
        parse_readings(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::json_message(r#"{"message":"Mot de passe incorrect"}"#, "Mot de passe incorrect")]
    #[case::empty_message(r#"{"message":""}"#, SERVER_ERROR_FALLBACK)]
    #[case::non_string_message(r#"{"message":42}"#, SERVER_ERROR_FALLBACK)]
    #[case::no_message(r#"{"error":"nope"}"#, SERVER_ERROR_FALLBACK)]
    #[case::html(r#"<html>502 Bad Gateway</html>"#, SERVER_ERROR_FALLBACK)]
    #[case::empty("", SERVER_ERROR_FALLBACK)]
    fn error_bodies_map_to_messages(#[case] body: &str, #[case] expected: &str) {
        assert_eq!(error_message(body), expected);
    }

    #[test]
    fn urls_join_without_double_slashes() {
        let client = HttpApiClient::new(
            "https://service.example/",
            Duration::from_secs(5),
            CredentialStore::in_memory(),
        )
        .expect("valid base url");
        assert_eq!(
            client.url(BATTERIES_PATH).expect("url").as_str(),
            "https://service.example/api/batteries"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = HttpApiClient::new(
            "not a url",
            Duration::from_secs(5),
            CredentialStore::in_memory(),
        );
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn protected_call_without_token_fails_before_network() {
        // nothing listens on the discard port; reaching the network would
        // produce a Network error instead
        let client = HttpApiClient::new(
            "http://127.0.0.1:9",
            Duration::from_secs(1),
            CredentialStore::in_memory(),
        )
        .expect("client");

        let err = client.list_readings().await.expect_err("no credential");
        assert!(matches!(err, ClientError::Unauthenticated));

        let err = client
            .submit_reading(NewReading { level: 50 })
            .await
            .expect_err("no credential");
        assert!(matches!(err, ClientError::Unauthenticated));
    }

    #[test]
    fn readings_accept_bare_and_wrapped_lists() {
        let entry = json!({ "id": "a", "level": 10, "recordedAt": "2025-01-01T00:00:00Z" });
        assert_eq!(parse_readings(json!([entry.clone()])).expect("bare").len(), 1);
        assert_eq!(parse_readings(json!({ "data": [entry] })).expect("wrapped").len(), 1);
        assert!(matches!(
            parse_readings(json!({ "data": 3 })),
            Err(ClientError::Parse(_))
        ));
        assert!(matches!(parse_readings(json!("nope")), Err(ClientError::Parse(_))));
    }

    #[test]
    fn readings_with_and_without_offset_parse_together() {
        let readings = parse_readings(json!([
            { "id": "a", "level": 10, "recordedAt": "2025-01-01T00:00:00Z" },
            { "id": "b", "level": 20, "recordedAt": "2025-01-01T00:00:00" },
        ]))
        .expect("both timestamps are ISO-8601");
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].recorded_at, readings[1].recorded_at);
    }

    #[test]
    fn auth_response_drops_empty_token() {
        let response =
            parse_auth_response(json!({ "token": "", "message": "ok" })).expect("parses");
        assert_eq!(response.token, None);
        assert_eq!(response.message.as_deref(), Some("ok"));

        let response = parse_auth_response(Value::Null).expect("null body");
        assert_eq!(response, AuthResponse::default());
    }
}

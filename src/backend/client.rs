//! Context Engine HTTP Client
//!
//! Direct HTTP client for the engine's REST API. Every call is a JSON POST;
//! anything other than a 2xx status is an error. Transport failures are kept
//! apart from bad statuses so the panel can tell the user which one happened.

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

use super::protocol::{
    ChatReply, ChatRequest, ContextObject, ExplainReply, SelectionRequest, StatsRecord,
    StatsRequest, SyncReply, PATH_CHAT, PATH_EXPLAIN, PATH_RETRIEVE, PATH_STATS, PATH_SYNC,
};
use crate::config::Settings;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Server returned {0}")]
    Status(u16),
    #[error("Malformed response: {0}")]
    Decode(String),
}

impl BackendError {
    /// No response was received at all
    pub fn is_transport(&self) -> bool {
        matches!(self, BackendError::Unreachable(_) | BackendError::Timeout)
    }
}

impl Serialize for BackendError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Unreachable(e.to_string())
        }
    }
}

/// The five engine operations.
///
/// Object-safe so the panel and the collector can hold an
/// `Arc<dyn ContextBackend>` and tests can script replies.
pub trait ContextBackend: Send + Sync {
    /// `/context/stats`: one record per snippet, positionally aligned.
    fn stats(&self, request: StatsRequest) -> BoxFuture<'_, Result<Vec<StatsRecord>, BackendError>>;

    fn explain(&self, request: SelectionRequest) -> BoxFuture<'_, Result<ExplainReply, BackendError>>;

    fn retrieve(
        &self,
        request: SelectionRequest,
    ) -> BoxFuture<'_, Result<Vec<ContextObject>, BackendError>>;

    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatReply, BackendError>>;

    /// `/context/sync` with an empty body
    fn sync(&self) -> BoxFuture<'_, Result<SyncReply, BackendError>>;
}

/// reqwest-backed engine client
#[derive(Clone)]
pub struct HttpBackend {
    http: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(settings: &Settings) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.http.post(self.url(path)).json(body);
        self.execute(path, request).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, BackendError> {
        debug!(path = %path, "Engine request");
        let resp = request.send().await.map_err(|e| {
            warn!(path = %path, error = %e, "Engine unreachable");
            BackendError::from(e)
        })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            error!(path = %path, status = %status, body = %text, "Engine HTTP error");
            return Err(BackendError::Status(status.as_u16()));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| {
            warn!(path = %path, error = %e, "Engine reply did not decode");
            BackendError::Decode(format!("{}: {}", e, text))
        })
    }
}

impl ContextBackend for HttpBackend {
    fn stats(&self, request: StatsRequest) -> BoxFuture<'_, Result<Vec<StatsRecord>, BackendError>> {
        async move { self.post_json(PATH_STATS, &request).await }.boxed()
    }

    fn explain(&self, request: SelectionRequest) -> BoxFuture<'_, Result<ExplainReply, BackendError>> {
        async move { self.post_json(PATH_EXPLAIN, &request).await }.boxed()
    }

    fn retrieve(
        &self,
        request: SelectionRequest,
    ) -> BoxFuture<'_, Result<Vec<ContextObject>, BackendError>> {
        async move { self.post_json(PATH_RETRIEVE, &request).await }.boxed()
    }

    fn chat(&self, request: ChatRequest) -> BoxFuture<'_, Result<ChatReply, BackendError>> {
        async move { self.post_json(PATH_CHAT, &request).await }.boxed()
    }

    fn sync(&self) -> BoxFuture<'_, Result<SyncReply, BackendError>> {
        async move {
            let request = self.http.post(self.url(PATH_SYNC));
            self.execute(PATH_SYNC, request).await
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trimmed() {
        let settings = Settings {
            api_base_url: "http://127.0.0.1:9999/".to_string(),
            ..Settings::default()
        };
        let backend = HttpBackend::new(&settings);
        assert_eq!(backend.base_url(), "http://127.0.0.1:9999");
        assert_eq!(backend.url(PATH_STATS), "http://127.0.0.1:9999/context/stats");
    }

    #[test]
    fn test_transport_classification() {
        assert!(BackendError::Timeout.is_transport());
        assert!(BackendError::Unreachable("refused".into()).is_transport());
        assert!(!BackendError::Status(500).is_transport());
        assert!(!BackendError::Decode("eof".into()).is_transport());
    }

    #[test]
    fn test_error_serializes_as_string() {
        let value = serde_json::to_value(BackendError::Status(502)).unwrap();
        assert_eq!(value, "Server returned 502");
    }
}

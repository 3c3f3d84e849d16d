//! HTTP Backend
//!
//! Talks to `/auth`, `/db/sync` and `/db/mutate` with the session cookie.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

use crate::config::RemoteConfig;
use crate::models::Ledger;
use super::error::ApiError;
use super::mutation::Mutation;
use super::RemoteBackend;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
    /// `name=value` of the session cookie
    session: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        // The gate answers 307 to /login; surface it instead of following it.
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            session: RwLock::new(None),
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(config.url.clone())
    }

    /// Reuse a cookie obtained earlier
    pub fn with_session(self, cookie: impl Into<String>) -> Self {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(cookie.into());
        self
    }

    pub fn session(&self) -> Option<String> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, format!("{}{}", self.base_url, path));
        match self.session() {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        }
    }

    /// POST /auth and keep the returned session cookie
    pub async fn login(&self, pin: &str) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, "/auth")
            .json(&json!({ "pin": pin }))
            .send()
            .await?;
        let response = check_status(response).await?;

        let cookie = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(';').next())
            .map(str::trim)
            .find(|pair| pair.contains('='))
            .map(str::to_string)
            .ok_or_else(|| ApiError::Decode("Missing session cookie".to_string()))?;

        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(cookie);
        log::info!("Logged in to {}", self.base_url);
        Ok(())
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_redirection() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: "Authentication required".to_string(),
        });
    }

    let fallback = status.canonical_reason().unwrap_or("Request failed").to_string();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.error)
        .unwrap_or(fallback);
    Err(ApiError::Status {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl RemoteBackend for HttpBackend {
    async fn fetch_snapshot(&self) -> Result<Ledger, ApiError> {
        let response = self.request(Method::GET, "/db/sync").send().await?;
        let response = check_status(response).await?;
        response
            .json::<Ledger>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn apply_mutation(&self, mutation: &Mutation) -> Result<(), ApiError> {
        let response = self
            .request(Method::POST, "/db/mutate")
            .json(mutation)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_is_normalized() {
        let backend = HttpBackend::new("http://127.0.0.1:3000/");
        assert_eq!(backend.base_url, "http://127.0.0.1:3000");
        assert_eq!(backend.session(), None);
    }

    #[test]
    fn test_with_session() {
        let config = RemoteConfig::new("http://localhost:3000", None);
        let backend = HttpBackend::from_config(&config).with_session("freelance-auth-token=authenticated");
        assert_eq!(
            backend.session().as_deref(),
            Some("freelance-auth-token=authenticated")
        );
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        // Port 9 (discard) is closed on test machines.
        let backend = HttpBackend::new("http://127.0.0.1:9");
        let err = backend.fetch_snapshot().await.unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)), "{:?}", err);
    }
}

//! HTTP transport shared by the API wrappers
//!
//! One wrapper per collaborator base URL. The transport attaches the
//! bearer token to every request except the exempt identity paths, maps
//! response statuses onto the error taxonomy, and applies the implicit
//! logout on an authorization-denied response *before* surfacing the
//! error, so a caller checking the session immediately afterwards already
//! sees the anonymous state.

use crate::session::SessionState;
use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::{ClientError, ClientResult};
use std::sync::Arc;
use std::time::Duration;

/// Paths exempt from token attachment and from implicit logout on denial
const AUTH_EXEMPT_PATHS: &[&str] = &["/api/users/login", "/api/users/register"];

#[derive(Clone)]
pub struct ApiTransport {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionState>,
}

impl ApiTransport {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<SessionState>,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn is_exempt(path: &str) -> bool {
        AUTH_EXEMPT_PATHS.iter().any(|p| path.starts_with(p))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.http.get(self.url(path)), path).await
    }

    pub async fn get_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        self.send(self.http.get(self.url(path)).query(query), path)
            .await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.http.post(self.url(path)).json(body), path)
            .await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        self.send(self.http.post(self.url(path)), path).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        self.send(self.http.put(self.url(path)).json(body), path)
            .await
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let mut request = self.http.delete(self.url(path));
        request = self.attach_token(request, path);
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.map_failure(status, body, path))
    }

    fn attach_token(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> reqwest::RequestBuilder {
        if Self::is_exempt(path) {
            return request;
        }
        match self.session.token() {
            Some(token) => request.header(
                reqwest::header::AUTHORIZATION,
                format!("Bearer {token}"),
            ),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        path: &str,
    ) -> ClientResult<T> {
        let request = self.attach_token(request, path);
        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(path = %path, status = %status, "request failed");
            return Err(self.map_failure(status, body, path));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Protocol(format!("undecodable response body: {e}")))
    }

    fn map_failure(&self, status: StatusCode, body: String, path: &str) -> ClientError {
        match status {
            StatusCode::UNAUTHORIZED if Self::is_exempt(path) => {
                ClientError::Authentication(detail_or(body, "invalid credentials"))
            }
            StatusCode::UNAUTHORIZED => {
                // Teardown happens before the error reaches the caller.
                self.session.clear();
                ClientError::Authentication(detail_or(body, "session rejected"))
            }
            StatusCode::FORBIDDEN => {
                ClientError::Authorization(detail_or(body, "permission denied"))
            }
            StatusCode::NOT_FOUND => ClientError::NotFound(detail_or(body, "resource not found")),
            StatusCode::CONFLICT => ClientError::Conflict(detail_or(body, "state changed")),
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                ClientError::Validation(detail_or(body, "invalid request"))
            }
            _ => ClientError::Protocol(format!(
                "unexpected status {status}: {}",
                detail_or(body, "no body")
            )),
        }
    }
}

/// Extract the `error` field the services use, falling back to the raw
/// body or a default
fn detail_or(body: String, default: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body) {
        if let Some(error) = value.get("error").and_then(|e| e.as_str()) {
            return error.to_string();
        }
    }
    if body.is_empty() {
        default.to_string()
    } else {
        body
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ClientError {
    if err.is_decode() {
        ClientError::Protocol(err.to_string())
    } else {
        ClientError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exempt_paths_cover_login_and_register() {
        assert!(ApiTransport::is_exempt("/api/users/login"));
        assert!(ApiTransport::is_exempt("/api/users/register"));
        assert!(!ApiTransport::is_exempt("/api/users/1"));
        assert!(!ApiTransport::is_exempt("/api/reservations"));
    }

    #[test]
    fn detail_prefers_service_error_field() {
        assert_eq!(
            detail_or(r#"{"error": "user_already_exists"}"#.into(), "x"),
            "user_already_exists"
        );
        assert_eq!(detail_or("plain text".into(), "x"), "plain text");
        assert_eq!(detail_or(String::new(), "fallback"), "fallback");
    }
}

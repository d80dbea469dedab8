// Upstream client for the CMS REST API
use axum::http::{header, HeaderMap, HeaderValue, Method};
use bytes::Bytes;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::proxy::config::UpstreamProxyConfig;
use crate::utils::http::create_client_with_proxy;

/// What a 404 means for a JSON call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    /// 404 yields `Ok(None)`
    Empty,
    /// 404 is an upstream error like any other status
    Error,
}

pub struct UpstreamClient {
    http_client: Client,
}

impl UpstreamClient {
    pub fn new(timeout_secs: u64, proxy_config: Option<&UpstreamProxyConfig>) -> Self {
        Self {
            http_client: create_client_with_proxy(timeout_secs, proxy_config),
        }
    }

    /// Relay a request verbatim; the response body is left for the caller to stream
    pub async fn forward(
        &self,
        method: Method,
        url: &str,
        headers: HeaderMap,
        body: Bytes,
    ) -> AppResult<Response> {
        tracing::debug!("Upstream {} {}", method, url);
        let mut request = self.http_client.request(method, url).headers(headers);
        if !body.is_empty() {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }

    /// JSON call with CMS error semantics
    ///
    /// 204 yields `None`; non-OK statuses become [`AppError::Upstream`] carrying the
    /// most specific message the body offers.
    pub async fn fetch_json(
        &self,
        method: Method,
        url: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
        not_found: NotFound,
    ) -> AppResult<Option<Value>> {
        let mut request = self
            .http_client
            .request(method.clone(), url)
            .header(header::ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            if status == StatusCode::NOT_FOUND && not_found == NotFound::Empty {
                return Ok(None);
            }
            let message = error_message(response).await;
            tracing::debug!("Upstream {} {} failed: {} {}", method, url, status, message);
            return Err(AppError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub async fn get_json(&self, url: &str, bearer: Option<&str>) -> AppResult<Option<Value>> {
        self.fetch_json(Method::GET, url, bearer, None, NotFound::Empty)
            .await
    }
}

async fn error_message(response: Response) -> String {
    let status = response.status();
    let fallback = format!("Request failed with status {}", status.as_u16());
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false);

    let text = match response.text().await {
        Ok(text) => text,
        Err(_) => return fallback,
    };
    if is_json {
        return serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| message_from_body(&body))
            .unwrap_or(fallback);
    }
    if text.trim().is_empty() {
        fallback
    } else {
        text
    }
}

/// `error.message`, then `message`, then `error` when it is a string
pub fn message_from_body(body: &Value) -> Option<String> {
    [
        body.get("error").and_then(|e| e.get("message")),
        body.get("message"),
        body.get("error"),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
    .map(str::to_string)
}

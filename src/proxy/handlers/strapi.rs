// Strapi proxy routes: raw relay and normalizing reads
use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::proxy::common::access::{is_public_get_path, proxy_segments, resolve_credential, ServerTokens};
use crate::proxy::common::headers::{relay_response_headers, upstream_request_headers};
use crate::proxy::common::url::{join_segments, origin_of, resolve_api_base_url};
use crate::proxy::mappers::strapi::{encode_query, rewrite_request, to_paginated, to_single};
use crate::proxy::middleware::AdminSession;
use crate::proxy::server::AppState;

fn is_json_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("application/json"))
}

fn with_query(mut url: String, query: Option<&str>) -> String {
    if let Some(q) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(q);
    }
    url
}

/// `/api/cms/strapi/*path`: authenticated relay to the CMS REST API
pub async fn handle_proxy(
    State(state): State<AppState>,
    session: Option<AdminSession>,
    method: Method,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Response> {
    let path = proxy_segments(&path)?.join("/");
    let cms = state.cms.config().await;
    let api_base = resolve_api_base_url([cms.base_url.as_str()])?;
    let origin = origin_of(&api_base);

    let tokens = ServerTokens {
        read: cms.api_token(),
        write: cms.write_token(),
    };
    let credential = resolve_credential(
        &method,
        &path,
        session.is_some(),
        session.as_ref().and_then(|s| s.upstream_jwt.as_deref()),
        &tokens,
    )?;

    let rewritten = rewrite_request(
        &method,
        &path,
        body,
        is_json_request(&headers),
        cms.article_write_mode,
    );
    let url = with_query(rewritten.target.url(&api_base, &origin)?, query.as_deref());
    debug!("Proxy {} {} -> {} {}", method, path, rewritten.method, url);

    let upstream_headers = upstream_request_headers(&headers, credential.as_deref());
    let upstream = state
        .upstream
        .forward(rewritten.method, &url, upstream_headers, rewritten.body)
        .await
        .map_err(|e| {
            warn!("Upstream request to {} failed: {}", url, e);
            e
        })?;

    let status = upstream.status();
    let relayed = relay_response_headers(upstream.headers());
    let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
    *response.status_mut() = status;
    *response.headers_mut() = relayed;
    Ok(response)
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// Incoming pairs minus the local `single` flag, with `publicationState=live` defaulted
fn extended_query(raw: Option<&str>) -> (Vec<(String, String)>, bool) {
    let mut single = false;
    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        if key == "single" {
            single = is_truthy(&value);
            continue;
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }
    if !pairs.iter().any(|(k, _)| k == "publicationState") {
        pairs.push(("publicationState".to_string(), "live".to_string()));
    }
    (pairs, single)
}

/// `/api/cms/strapi-extended/*path`: GET with normalized entities
pub async fn handle_extended(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
) -> AppResult<Response> {
    let segments = proxy_segments(&path)?;
    // the server read token is attached, so private collections stay closed
    if !is_public_get_path(&segments.join("/")) {
        return Err(AppError::unauthorized());
    }
    let cms = state.cms.config().await;
    let api_base = resolve_api_base_url([cms.base_url.as_str()])?;
    let origin = origin_of(&api_base);

    let (pairs, single) = extended_query(query.as_deref());
    let url = format!("{}{}", join_segments(&api_base, &segments)?, encode_query(&pairs));

    let mut headers = upstream_request_headers(&HeaderMap::new(), cms.api_token());
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

    let upstream = state
        .upstream
        .forward(Method::GET, &url, headers, Bytes::new())
        .await?;
    let status = upstream.status();
    let text = upstream.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        debug!("Extended read {} answered {}", url, status);
        return Ok((status, Json(body)).into_response());
    }

    let is_collection = body.get("data").is_some_and(Value::is_array);
    if is_collection && !single {
        return Ok((StatusCode::OK, Json(to_paginated(&body, &origin))).into_response());
    }
    Ok((StatusCode::OK, Json(to_single(&body, &origin))).into_response())
}

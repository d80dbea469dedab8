// Write-path rewriting for the Strapi REST API
use axum::http::Method;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::AppResult;
use crate::models::ContentType;
use crate::proxy::common::url::join_segments;

/// Collections whose REST write bodies are wrapped in `{ data: ... }`
const BASE_COLLECTIONS: [&str; 4] = ["articles", "categories", "authors", "tags"];

const CONTENT_MANAGER_ARTICLE: &str = "content-manager/collection-types/api::article.article";

/// Where article writes are sent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ArticleWriteMode {
    /// `/api/articles[/id]` with the `{ data }` envelope
    #[default]
    Api,
    /// Strapi content-manager API with the bare record
    ContentManager,
}

impl ArticleWriteMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().replace('_', "-").as_str() {
            "content-manager" | "contentmanager" | "admin" => ArticleWriteMode::ContentManager,
            _ => ArticleWriteMode::Api,
        }
    }
}

/// Upstream address of a rewritten request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamTarget {
    /// Relative to the REST API base (`.../api`)
    Api(String),
    /// Relative to the CMS origin
    Origin(String),
}

impl UpstreamTarget {
    /// Absolute URL with every path segment percent-encoded
    pub fn url(&self, api_base: &str, origin: &str) -> AppResult<String> {
        let (base, path) = match self {
            UpstreamTarget::Api(path) => (api_base, path),
            UpstreamTarget::Origin(path) => (origin, path),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        join_segments(base, &segments)
    }
}

#[derive(Debug, Clone)]
pub struct RewrittenRequest {
    pub method: Method,
    pub target: UpstreamTarget,
    pub body: Bytes,
}

pub fn is_write(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn is_enveloped_collection(collection: &str) -> bool {
    BASE_COLLECTIONS.contains(&collection)
        || ContentType::ALL.iter().any(|ct| ct.segment() == collection)
}

/// Rewrite a proxied request for the upstream write conventions
///
/// Reads pass through untouched. Writes get PATCH mapped to PUT and, for known
/// collections, the JSON body enveloped. Uploads are never touched.
pub fn rewrite_request(
    method: &Method,
    path: &str,
    body: Bytes,
    is_json: bool,
    mode: ArticleWriteMode,
) -> RewrittenRequest {
    let path = path.trim_matches('/');
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let collection = segments.first().copied().unwrap_or_default();

    if !is_write(method) || collection == "upload" {
        return RewrittenRequest {
            method: method.clone(),
            target: UpstreamTarget::Api(path.to_string()),
            body,
        };
    }

    let method = if *method == Method::PATCH {
        Method::PUT
    } else {
        method.clone()
    };

    if collection == "articles" && mode == ArticleWriteMode::ContentManager && segments.len() <= 2
    {
        let target = match segments.get(1) {
            Some(id) => format!("{}/{}", CONTENT_MANAGER_ARTICLE, id),
            None => CONTENT_MANAGER_ARTICLE.to_string(),
        };
        let body = if is_json { unwrap_envelope(body) } else { body };
        return RewrittenRequest {
            method,
            target: UpstreamTarget::Origin(target),
            body,
        };
    }

    let body = if is_json && method != Method::DELETE && is_enveloped_collection(collection) {
        wrap_envelope(body)
    } else {
        body
    };

    RewrittenRequest {
        method,
        target: UpstreamTarget::Api(path.to_string()),
        body,
    }
}

/// `{ data: body }` unless the body already carries `data`
pub fn wrap_value(value: Value) -> Value {
    match value {
        Value::Object(ref obj) if obj.contains_key("data") => value,
        other => json!({ "data": other }),
    }
}

fn wrap_envelope(body: Bytes) -> Bytes {
    if body.is_empty() {
        return body;
    }
    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => serde_json::to_vec(&wrap_value(value))
            .map(Bytes::from)
            .unwrap_or(body),
        Err(_) => body,
    }
}

/// Inverse of [`wrap_value`]: a lone `data` key is lifted out
pub fn unwrap_value(value: Value) -> Value {
    match value {
        Value::Object(mut obj) if obj.len() == 1 && obj.contains_key("data") => {
            obj.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn unwrap_envelope(body: Bytes) -> Bytes {
    match serde_json::from_slice::<Value>(&body) {
        Ok(value @ Value::Object(_)) => serde_json::to_vec(&unwrap_value(value))
            .map(Bytes::from)
            .unwrap_or(body),
        _ => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_json(body: &Bytes) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn test_patch_becomes_put_with_envelope() {
        let out = rewrite_request(
            &Method::PATCH,
            "/articles/12",
            Bytes::from_static(br#"{"title":"x"}"#),
            true,
            ArticleWriteMode::Api,
        );
        assert_eq!(out.method, Method::PUT);
        assert_eq!(out.target, UpstreamTarget::Api("articles/12".into()));
        assert_eq!(body_json(&out.body), json!({ "data": { "title": "x" } }));
    }

    #[test]
    fn test_existing_envelope_kept() {
        let out = rewrite_request(
            &Method::POST,
            "fashion-stores",
            Bytes::from_static(br#"{"data":{"name":"A"}}"#),
            true,
            ArticleWriteMode::Api,
        );
        assert_eq!(body_json(&out.body), json!({ "data": { "name": "A" } }));
    }

    #[test]
    fn test_upload_and_reads_untouched() {
        let out = rewrite_request(
            &Method::PATCH,
            "upload/files/3",
            Bytes::from_static(b"raw"),
            false,
            ArticleWriteMode::ContentManager,
        );
        assert_eq!(out.method, Method::PATCH);
        assert_eq!(out.body, Bytes::from_static(b"raw"));

        let out = rewrite_request(
            &Method::GET,
            "articles",
            Bytes::new(),
            false,
            ArticleWriteMode::ContentManager,
        );
        assert_eq!(out.target, UpstreamTarget::Api("articles".into()));
    }

    #[test]
    fn test_content_manager_mode() {
        let out = rewrite_request(
            &Method::PUT,
            "articles/7",
            Bytes::from_static(br#"{"data":{"title":"x"}}"#),
            true,
            ArticleWriteMode::ContentManager,
        );
        assert_eq!(
            out.target.url("http://cms:1337/api", "http://cms:1337").unwrap(),
            "http://cms:1337/content-manager/collection-types/api::article.article/7"
        );
        assert_eq!(body_json(&out.body), json!({ "title": "x" }));
    }

    #[test]
    fn test_target_url_encodes_segments() {
        let target = UpstreamTarget::Api("articles/slug/what?x=1".into());
        assert_eq!(
            target.url("http://cms:1337/api/", "http://cms:1337").unwrap(),
            "http://cms:1337/api/articles/slug/what%3Fx=1"
        );
        assert!(UpstreamTarget::Origin("x".into()).url("http://cms:1337/api", "").is_err());
    }

    #[test]
    fn test_unknown_collection_not_wrapped() {
        let out = rewrite_request(
            &Method::POST,
            "comments",
            Bytes::from_static(br#"{"text":"hi"}"#),
            true,
            ArticleWriteMode::Api,
        );
        assert_eq!(body_json(&out.body), json!({ "text": "hi" }));
    }

    #[test]
    fn test_parse_write_mode() {
        assert_eq!(ArticleWriteMode::parse("content_manager"), ArticleWriteMode::ContentManager);
        assert_eq!(ArticleWriteMode::parse(""), ArticleWriteMode::Api);
    }
}

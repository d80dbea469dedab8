// Strapi URL helpers
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::error::{AppError, AppResult};

static BARE_ORIGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^https?://[^/]+$").expect("valid origin pattern"));

/// Normalize a configured Strapi URL to its REST API base
///
/// - trailing slashes removed
/// - `.../api` kept as is
/// - bare origin (`http://host:1337`) gets `/api` appended
/// - anything else is returned unchanged
pub fn normalize_strapi_api_url(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.ends_with("/api") {
        return trimmed.to_string();
    }
    if BARE_ORIGIN.is_match(trimmed) {
        return format!("{}/api", trimmed);
    }
    trimmed.to_string()
}

/// Like [`normalize_strapi_api_url`], but cuts any path after an `api` segment
/// (`http://host/api/articles?x=1` -> `http://host/api`).
pub fn normalize_strapi_base_url(value: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if let Ok(mut parsed) = Url::parse(trimmed) {
        let segments: Vec<String> = parsed
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        if let Some(api_index) = segments.iter().position(|s| s == "api") {
            parsed.set_path(&format!("/{}", segments[..=api_index].join("/")));
            parsed.set_query(None);
            parsed.set_fragment(None);
            return parsed.as_str().trim_end_matches('/').to_string();
        }
    }
    normalize_strapi_api_url(trimmed)
}

/// First usable candidate, normalized
pub fn resolve_api_base_url<I, S>(candidates: I) -> AppResult<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    candidates
        .into_iter()
        .map(|c| normalize_strapi_api_url(c.as_ref()))
        .find(|c| !c.is_empty())
        .ok_or_else(|| AppError::Config("Strapi API URL is not configured".to_string()))
}

/// `scheme://host[:port]` of an API URL, empty when unparsable
pub fn origin_of(api_url: &str) -> String {
    match Url::parse(api_url) {
        Ok(u) if u.has_host() => u.origin().ascii_serialization(),
        _ => String::new(),
    }
}

/// `<base>/<seg>/<seg>...` with every segment percent-encoded
pub fn join_segments(base: &str, segments: &[&str]) -> AppResult<String> {
    let mut url = Url::parse(base.trim_end_matches('/'))
        .map_err(|e| AppError::Config(format!("Invalid CMS URL {:?}: {}", base, e)))?;
    url.path_segments_mut()
        .map_err(|_| AppError::Config(format!("CMS URL {:?} cannot take a path", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}

/// Resolve a media path against the CMS origin
pub fn to_absolute_url(origin: &str, url: &str) -> String {
    if url.is_empty() || url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    if origin.is_empty() {
        return url.to_string();
    }
    Url::parse(origin)
        .and_then(|base| base.join(url))
        .map(|joined| joined.to_string())
        .unwrap_or_else(|_| url.to_string())
}

// Request classification and credential selection for the CMS proxy
use axum::http::Method;

use crate::error::{AppError, AppResult};

/// True for GET/HEAD paths that may be read without an admin session
pub fn is_public_get_path(path: &str) -> bool {
    if path.starts_with("admin/") {
        return false;
    }
    let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
    if parts.contains(&"admin") {
        return false;
    }
    !matches!(parts.first(), Some(&"upload") | Some(&"users") | Some(&"auth"))
}

/// Segments of a proxied CMS path
///
/// Empty, `.` and `..` segments are refused so the upstream URL cannot be
/// resolved onto a different collection than the one access was checked for.
pub fn proxy_segments(path: &str) -> AppResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(AppError::BadRequest("Missing CMS path".to_string()));
    }
    trimmed
        .split('/')
        .map(|segment| match segment {
            "" | "." | ".." => Err(AppError::BadRequest(format!("Invalid CMS path: {}", path))),
            s if s.contains('\\') => Err(AppError::BadRequest(format!("Invalid CMS path: {}", path))),
            s => Ok(s),
        })
        .collect()
}

pub fn is_read(method: &Method) -> bool {
    *method == Method::GET || *method == Method::HEAD
}

/// Server-held tokens the proxy may substitute for the user's own JWT
#[derive(Debug, Clone, Default)]
pub struct ServerTokens<'a> {
    pub read: Option<&'a str>,
    pub write: Option<&'a str>,
}

/// Pick the bearer credential for an upstream call
///
/// `Ok(None)` means the request goes upstream anonymously.
pub fn resolve_credential(
    method: &Method,
    path: &str,
    has_session: bool,
    user_jwt: Option<&str>,
    tokens: &ServerTokens<'_>,
) -> AppResult<Option<String>> {
    let user_jwt = user_jwt.filter(|t| !t.is_empty());
    let read = is_read(method);

    if !has_session {
        if read && is_public_get_path(path) {
            return Ok(tokens.read.map(str::to_string));
        }
        return Err(AppError::unauthorized());
    }

    let chosen = if read {
        user_jwt.or(tokens.read)
    } else {
        tokens.write.or(user_jwt)
    };
    chosen
        .map(|t| Some(t.to_string()))
        .ok_or_else(AppError::unauthorized)
}

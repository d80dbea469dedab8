// Admin session resolution
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::models::SessionClaims;
use crate::modules::session::{read_cookie, SessionKeys, SESSION_COOKIE, UPSTREAM_JWT_COOKIE};
use crate::proxy::server::AppState;

/// Verified admin session attached to the request
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub claims: SessionClaims,
    /// User JWT issued by the CMS at login
    pub upstream_jwt: Option<String>,
}

fn cookie_header(headers: &HeaderMap) -> String {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Session from the request cookies; `None` when the secret is unset, the cookie
/// is missing, or the signature / expiry check fails
pub fn resolve_session(headers: &HeaderMap, keys: Option<&SessionKeys>) -> Option<AdminSession> {
    let keys = keys?;
    let cookies = cookie_header(headers);
    let token = read_cookie(&cookies, SESSION_COOKIE)?;
    let claims = keys.verify(&token)?;
    Some(AdminSession {
        claims,
        upstream_jwt: read_cookie(&cookies, UPSTREAM_JWT_COOKIE).filter(|t| !t.is_empty()),
    })
}

/// Logs the request and attaches the admin session, if any
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    tracing::info!("Request: {} {}", request.method(), request.uri().path());

    if let Some(session) = resolve_session(request.headers(), state.sessions.as_deref()) {
        tracing::debug!("Admin session for {} ({})", session.claims.email, session.claims.role.as_str());
        request.extensions_mut().insert(session);
    }

    next.run(request).await
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminSession>()
            .cloned()
            .ok_or_else(AppError::unauthorized)
    }
}

// Admin area: login session and content writes
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::cms::Provider;
use crate::error::{AppError, AppResult};
use crate::models::{ContentType, Role, SessionUser};
use crate::modules::session::{login_cookies, logout_cookies};
use crate::proxy::common::url::{join_segments, resolve_api_base_url};
use crate::proxy::mappers::strapi::unwrap_value;
use crate::proxy::middleware::AdminSession;
use crate::proxy::server::AppState;
use crate::proxy::upstream::NotFound;

const UNKNOWN_ACCOUNT: &str =
    "This account does not exist in CMS users. Please create the user under Strapi → Users & Permissions.";

#[derive(Debug, Deserialize, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

fn with_cookies(mut response: Response, cookies: [String; 2]) -> Response {
    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => warn!("Dropped malformed cookie: {}", e),
        }
    }
    response
}

fn id_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// First of `role.type`, `role.name` that names a known role
fn role_of(user: &Value) -> Option<Option<Role>> {
    let role = user.get("role")?;
    let label = ["type", "name"]
        .iter()
        .find_map(|key| role.get(*key).and_then(Value::as_str))?;
    Some(Role::parse(label))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Response> {
    let keys = state
        .sessions
        .clone()
        .ok_or_else(|| AppError::Config("Admin session secret is not configured".to_string()))?;

    let email = payload.email.trim().to_lowercase();
    let password = payload.password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Email and password are required".to_string(),
        ));
    }

    let cms = state.cms.config().await;
    let api_base = resolve_api_base_url([cms.base_url.as_str()])?;
    let url = join_segments(&api_base, &["auth", "local"])?;
    let body = json!({ "identifier": email, "password": password });

    let answer = state
        .upstream
        .fetch_json(Method::POST, &url, None, Some(&body), NotFound::Error)
        .await;
    let answer = match answer {
        Ok(answer) => answer.unwrap_or(Value::Null),
        Err(AppError::Upstream { status: 400 | 401 | 403, .. }) => {
            info!("Login rejected for {}", email);
            return Err(AppError::Unauthorized(UNKNOWN_ACCOUNT.to_string()));
        }
        Err(e) => {
            warn!("Login upstream failure for {}: {}", email, e);
            return Err(AppError::Upstream {
                status: 502,
                message: e.to_string(),
            });
        }
    };

    let jwt = answer.get("jwt").and_then(Value::as_str).filter(|s| !s.is_empty());
    let user = answer.get("user").filter(|u| u.is_object());
    let (Some(jwt), Some(user)) = (jwt, user) else {
        return Err(AppError::Unauthorized(UNKNOWN_ACCOUNT.to_string()));
    };

    if user.get("blocked").and_then(Value::as_bool).unwrap_or(false) {
        return Err(AppError::Forbidden("User is disabled".to_string()));
    }

    let role = match role_of(user) {
        None => Role::Author,
        Some(Some(role)) => role,
        Some(None) => {
            info!("Login refused for {}: role outside the admin area", email);
            return Err(AppError::Forbidden("Unauthorized".to_string()));
        }
    };

    let id = id_string(user.get("id"));
    let name = user
        .get("username")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or("User");
    let email = user
        .get("email")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or(email);

    let claims = keys.claims_for(&id, &email, role, name);
    let token = keys.sign(&claims)?;
    info!("Admin login: {} ({})", email, role.as_str());

    let response = Json(json!({ "user": SessionUser::from(&claims) })).into_response();
    Ok(with_cookies(
        response,
        login_cookies(
            token,
            jwt.to_string(),
            keys.ttl_secs(),
            state.config.auth.secure_cookies,
        ),
    ))
}

fn no_user() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "user": null }))).into_response()
}

pub async fn me(State(state): State<AppState>, session: Option<AdminSession>) -> Response {
    let Some(session) = session else {
        return no_user();
    };
    let Some(jwt) = session.upstream_jwt.as_deref() else {
        return no_user();
    };

    let mut user = SessionUser::from(&session.claims);
    match fetch_me(&state, jwt).await {
        Ok(Some(remote)) => {
            if let Some(name) = remote.get("username").and_then(Value::as_str) {
                user.name = name.to_string();
            }
            if let Some(email) = remote.get("email").and_then(Value::as_str) {
                user.email = email.to_string();
            }
            if let Some(Some(role)) = role_of(&remote) {
                user.role = role;
            }
        }
        Ok(None) => {}
        Err(e) => debug!("users/me refresh failed, using session claims: {}", e),
    }

    Json(json!({ "user": user })).into_response()
}

async fn fetch_me(state: &AppState, jwt: &str) -> AppResult<Option<Value>> {
    let cms = state.cms.config().await;
    let api_base = resolve_api_base_url([cms.base_url.as_str()])?;
    let url = format!("{}?populate=role", join_segments(&api_base, &["users", "me"])?);
    state.upstream.get_json(&url, Some(jwt)).await
}

pub async fn logout(State(state): State<AppState>) -> Response {
    let response = Json(json!({ "ok": true })).into_response();
    with_cookies(response, logout_cookies(state.config.auth.secure_cookies))
}

pub async fn env_check(State(state): State<AppState>) -> Json<Value> {
    let cms = state.cms.config().await;
    let provider = state.cms.provider().await;
    Json(json!({
        "hasSessionSecret": state.sessions.is_some(),
        "hasStrapiApiToken": cms.api_token().is_some(),
        "hasStrapiWriteToken": cms.write_token().is_some(),
        "hasStrapiApiUrl": !cms.base_url.trim().is_empty(),
        "provider": provider.kind(),
        "articleWriteMode": cms.article_write_mode,
        "secureCookies": state.config.auth.secure_cookies,
    }))
}

// ===== Content writes =====

enum Collection {
    Articles,
    Items(ContentType),
}

impl Collection {
    fn parse(value: &str) -> AppResult<Self> {
        if value == "articles" {
            return Ok(Collection::Articles);
        }
        ContentType::parse(value)
            .map(Collection::Items)
            .ok_or_else(|| AppError::NotFound(format!("Unknown collection: {}", value)))
    }
}

async fn writer(state: &AppState, session: &AdminSession) -> Provider {
    state
        .cms
        .provider()
        .await
        .acting_for(session.upstream_jwt.as_deref())
}

pub async fn create_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path(collection): Path<String>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    let collection = Collection::parse(&collection)?;
    let provider = writer(&state, &session).await;
    let body = unwrap_value(body);
    info!("{} creates in {}", session.claims.email, provider.kind());

    let created = match collection {
        Collection::Articles => serde_json::to_value(provider.create_article(body).await?)?,
        Collection::Items(content_type) => {
            serde_json::to_value(provider.create_item(content_type, body).await?)?
        }
    };
    Ok((StatusCode::CREATED, Json(created)).into_response())
}

pub async fn update_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path((collection, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    let collection = Collection::parse(&collection)?;
    let provider = writer(&state, &session).await;
    let body = unwrap_value(body);

    let updated = match collection {
        Collection::Articles => serde_json::to_value(provider.update_article(&id, body).await?)?,
        Collection::Items(content_type) => {
            serde_json::to_value(provider.update_item(content_type, &id, body).await?)?
        }
    };
    Ok(Json(updated))
}

pub async fn delete_content(
    State(state): State<AppState>,
    session: AdminSession,
    Path((collection, id)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    if !session.claims.role.can_delete() {
        return Err(AppError::Forbidden(
            "Contributors cannot delete content".to_string(),
        ));
    }
    let collection = Collection::parse(&collection)?;
    let provider = writer(&state, &session).await;
    info!("{} deletes {}", session.claims.email, id);

    match collection {
        Collection::Articles => provider.delete_article(&id).await?,
        Collection::Items(content_type) => provider.delete_item(content_type, &id).await?,
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;

    fn set_cookie_values(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_role_of() {
        assert_eq!(role_of(&json!({ "id": 1 })), None);
        assert_eq!(
            role_of(&json!({ "role": { "type": "editor", "name": "Editor" } })),
            Some(Some(Role::Editor))
        );
        assert_eq!(
            role_of(&json!({ "role": { "name": "Administrator" } })),
            Some(Some(Role::Admin))
        );
        assert_eq!(
            role_of(&json!({ "role": { "type": "authenticated" } })),
            Some(None)
        );
    }

    #[test]
    fn test_collection_parse() {
        assert!(matches!(Collection::parse("articles"), Ok(Collection::Articles)));
        assert!(matches!(
            Collection::parse("holidays"),
            Ok(Collection::Items(ContentType::Holidays))
        ));
        assert!(Collection::parse("widgets").is_err());
    }

    #[test]
    fn test_with_cookies_appends_both() {
        let response = with_cookies(
            Json(json!({})).into_response(),
            ["a=1; Path=/".to_string(), "b=2; Path=/".to_string()],
        );
        assert_eq!(
            set_cookie_values(response.headers()),
            vec!["a=1; Path=/".to_string(), "b=2; Path=/".to_string()]
        );
    }
}

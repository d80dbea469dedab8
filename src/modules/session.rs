// Admin session tokens and cookies
use chrono::{Duration, Utc};
use cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{AppError, AppResult};
use crate::models::{Role, SessionClaims};

pub const SESSION_COOKIE: &str = "admin_session";
pub const UPSTREAM_JWT_COOKIE: &str = "strapi_jwt";

/// HS256 signer/verifier for the `admin_session` cookie
pub struct SessionKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        let mut validation = Validation::default();
        validation.leeway = 0;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl: Duration::seconds(ttl_secs),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    pub fn claims_for(&self, id: &str, email: &str, role: Role, name: &str) -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            sub: id.to_string(),
            email: email.to_string(),
            role,
            name: name.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        }
    }

    pub fn sign(&self, claims: &SessionClaims) -> AppResult<String> {
        encode(&Header::default(), claims, &self.encoding_key)
            .map_err(|e| AppError::Unknown(format!("Failed to sign session: {}", e)))
    }

    /// Claims of a valid, unexpired token
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        match decode::<SessionClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Rejected admin session: {}", e);
                None
            }
        }
    }
}

fn base_cookie(name: &'static str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .secure(secure)
        .max_age(cookie::time::Duration::seconds(max_age_secs))
        .build()
}

/// `Set-Cookie` values issued on login
pub fn login_cookies(session: String, upstream_jwt: String, ttl_secs: i64, secure: bool) -> [String; 2] {
    [
        base_cookie(SESSION_COOKIE, session, ttl_secs, secure).to_string(),
        base_cookie(UPSTREAM_JWT_COOKIE, upstream_jwt, ttl_secs, secure).to_string(),
    ]
}

/// `Set-Cookie` values expiring both cookies
pub fn logout_cookies(secure: bool) -> [String; 2] {
    [
        base_cookie(SESSION_COOKIE, String::new(), 0, secure).to_string(),
        base_cookie(UPSTREAM_JWT_COOKIE, String::new(), 0, secure).to_string(),
    ]
}

/// Value of cookie `name` from a `Cookie` request header
pub fn read_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}

use crate::cms::CmsConfig;
use crate::proxy::ProxyConfig;
use serde::{Deserialize, Serialize};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub site: SiteConfig,
}

/// Admin session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for the `admin_session` cookie. Never persisted to disk.
    #[serde(skip_serializing, default)]
    pub session_secret: Option<String>,

    /// Mark cookies `Secure` (production deployments behind TLS)
    #[serde(default)]
    pub secure_cookies: bool,

    /// Session and upstream-JWT cookie lifetime (seconds)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_secret: None,
            secure_cookies: false,
            session_ttl_secs: default_session_ttl(),
        }
    }
}

fn default_session_ttl() -> i64 {
    24 * 60 * 60
}

/// Public site settings used for absolute links (sitemap)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub base_url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rampurnews.com".to_string(),
        }
    }
}

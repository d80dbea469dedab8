use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::proxy::mappers::strapi::ArticleWriteMode;

/// Backend the content facade reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local SQLite store with sample content
    Mock,
    #[default]
    Strapi,
    /// Generic REST backend (`/articles`, `/microsite-items`)
    #[serde(alias = "custom", alias = "django")]
    Rest,
}

impl ProviderKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "mock" => Some(ProviderKind::Mock),
            "strapi" => Some(ProviderKind::Strapi),
            "rest" | "custom" | "django" => Some(ProviderKind::Rest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Mock => "mock",
            ProviderKind::Strapi => "strapi",
            ProviderKind::Rest => "rest",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CMS connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CmsConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    /// REST API base, e.g. `http://localhost:1337/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Server-held read token. Never persisted to disk.
    #[serde(skip_serializing, default)]
    pub api_token: Option<String>,

    /// Server-held write token. Never persisted to disk.
    #[serde(skip_serializing, default)]
    pub write_token: Option<String>,

    #[serde(default)]
    pub article_write_mode: ArticleWriteMode,

    /// Switch to the mock store when the startup probe fails
    #[serde(default = "default_true")]
    pub fallback_to_mock: bool,

    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            base_url: default_base_url(),
            api_token: None,
            write_token: None,
            article_write_mode: ArticleWriteMode::default(),
            fallback_to_mock: true,
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:1337/api".to_string()
}

fn default_true() -> bool {
    true
}

fn default_probe_timeout() -> u64 {
    5
}

impl CmsConfig {
    /// Identity of the provider built from this config
    ///
    /// The token is hashed so the key can be logged.
    pub fn cache_key(&self) -> String {
        let token = self.api_token.as_deref().unwrap_or_default();
        let digest = Sha256::digest(token.as_bytes());
        format!(
            "{}:{}:{:x}",
            self.provider,
            self.base_url.trim_end_matches('/'),
            digest
        )
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref().filter(|t| !t.is_empty())
    }

    pub fn write_token(&self) -> Option<&str> {
        self.write_token.as_deref().filter(|t| !t.is_empty())
    }
}

// Layered configuration: defaults <- gateway_config.json <- environment
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, warn};

use crate::cms::ProviderKind;
use crate::error::{AppError, AppResult};
use crate::models::AppConfig;
use crate::proxy::common::url::normalize_strapi_base_url;
use crate::proxy::mappers::strapi::ArticleWriteMode;

const DATA_DIR: &str = ".rampur_news";
const CONFIG_FILE: &str = "gateway_config.json";

/// Data directory: `RAMPUR_DATA_DIR`, else `~/.rampur_news`; created on demand
pub fn get_data_dir() -> AppResult<PathBuf> {
    let data_dir = match std::env::var("RAMPUR_DATA_DIR") {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir.trim()),
        _ => dirs::home_dir()
            .ok_or_else(|| AppError::Config("Failed to get user home directory".to_string()))?
            .join(DATA_DIR),
    };

    if !data_dir.exists() {
        fs::create_dir_all(&data_dir)?;
    }

    Ok(data_dir)
}

/// Load application config
pub fn load_app_config() -> AppResult<AppConfig> {
    let data_dir = get_data_dir()?;
    let path = data_dir.join(CONFIG_FILE);
    let mut config = if path.exists() {
        load_config_file(&path)?
    } else {
        info!("{} not found, writing defaults", CONFIG_FILE);
        let defaults = AppConfig::default();
        if let Err(e) = save_app_config(&defaults) {
            warn!("Failed to write default {}: {}", CONFIG_FILE, e);
        }
        defaults
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn load_config_file(path: &Path) -> AppResult<AppConfig> {
    if !path.exists() {
        info!("{} not found, using defaults", CONFIG_FILE);
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse {}: {}", CONFIG_FILE, e)))
}

/// Save application config. Secrets are never written.
pub fn save_app_config(config: &AppConfig) -> AppResult<()> {
    let data_dir = get_data_dir()?;
    let content = serde_json::to_string_pretty(config)?;
    fs::write(data_dir.join(CONFIG_FILE), content)?;
    Ok(())
}

fn first_set<F>(lookup: &F, keys: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    keys.iter()
        .filter_map(|k| lookup(k))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = first_set(lookup, &[key])?;
    raw.parse()
        .map_err(|e| warn!("Invalid {key} value {raw:?}: {e}, ignoring"))
        .ok()
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Overlay environment variables on top of `config`
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = first_set(&lookup, &["STRAPI_API_URL", "STRAPI_BASE_URL", "STRAPI_URL"]) {
        config.cms.base_url = normalize_strapi_base_url(&url);
    }
    if let Some(token) = first_set(&lookup, &["STRAPI_API_TOKEN"]) {
        config.cms.api_token = Some(token);
    }
    if let Some(token) = first_set(&lookup, &["STRAPI_WRITE_TOKEN"]) {
        config.cms.write_token = Some(token);
    }
    if let Some(kind) = first_set(&lookup, &["CMS_PROVIDER"]) {
        match ProviderKind::parse(&kind) {
            Some(parsed) => config.cms.provider = parsed,
            None => warn!("Unknown CMS_PROVIDER {kind:?}, keeping {}", config.cms.provider),
        }
    }
    if let Some(mode) = first_set(&lookup, &["ARTICLE_WRITE_MODE"]) {
        config.cms.article_write_mode = ArticleWriteMode::parse(&mode);
    }
    if let Some(flag) = first_set(&lookup, &["CMS_FALLBACK_TO_MOCK"]) {
        config.cms.fallback_to_mock = parse_flag(&flag);
    }

    if let Some(secret) = first_set(&lookup, &["ADMIN_JWT_SECRET", "ADMIN_SESSION_SECRET"]) {
        config.auth.session_secret = Some(secret);
    }
    if let Some(flag) = first_set(&lookup, &["SECURE_COOKIES"]) {
        config.auth.secure_cookies = parse_flag(&flag);
    }

    if let Some(port) = parse_var(&lookup, "GATEWAY_PORT") {
        config.proxy.port = port;
    }
    if let Some(flag) = first_set(&lookup, &["GATEWAY_ALLOW_LAN"]) {
        config.proxy.allow_lan_access = parse_flag(&flag);
    }
    if let Some(timeout) = parse_var(&lookup, "GATEWAY_REQUEST_TIMEOUT") {
        config.proxy.request_timeout = timeout;
    }

    if let Some(base) = first_set(&lookup, &["SITE_BASE_URL"]) {
        config.site.base_url = base.trim_end_matches('/').to_string();
    }
}

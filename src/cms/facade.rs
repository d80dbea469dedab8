// Runtime-switchable access to the configured CMS backend
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::calendar::{compose_calendar, month_bounds};
use super::config::{CmsConfig, ProviderKind};
use super::mock::MockProvider;
use super::rest::RestProvider;
use super::strapi::StrapiProvider;
use crate::error::AppResult;
use crate::models::{
    Article, ArticleQuery, CalendarEvent, Category, ContentItem, ContentQuery, ContentType,
    Paginated, Settings,
};
use crate::modules::db::ContentStore;
use crate::proxy::common::url::origin_of;
use crate::proxy::upstream::UpstreamClient;

/// Items fetched per collection when building a calendar month
const CALENDAR_FETCH_LIMIT: u32 = 200;

#[derive(Clone)]
pub enum Provider {
    Mock(MockProvider),
    Rest(RestProvider),
    Strapi(StrapiProvider),
}

// Mock calls are synchronous, remote calls are awaited
macro_rules! dispatch {
    ($self:ident, $method:ident ( $($arg:expr),* )) => {
        match $self {
            Provider::Mock(p) => p.$method($($arg),*),
            Provider::Rest(p) => p.$method($($arg),*).await,
            Provider::Strapi(p) => p.$method($($arg),*).await,
        }
    };
}

impl Provider {
    /// Build the provider for `config`; unusable remote settings fall back to mock
    pub fn build(
        config: &CmsConfig,
        client: Arc<UpstreamClient>,
        store: Arc<ContentStore>,
    ) -> Self {
        let usable = !origin_of(&config.base_url).is_empty();
        match config.provider {
            ProviderKind::Strapi if usable => Provider::Strapi(StrapiProvider::new(client, config)),
            ProviderKind::Rest if usable => Provider::Rest(RestProvider::new(client, config)),
            ProviderKind::Mock => Provider::Mock(MockProvider::new(store)),
            kind => {
                warn!(
                    "CMS provider {} has no usable base URL ({:?}), falling back to mock",
                    kind, config.base_url
                );
                Provider::Mock(MockProvider::new(store))
            }
        }
    }

    /// Copy whose remote writes carry the admin user's CMS JWT
    pub fn acting_for(&self, user_jwt: Option<&str>) -> Provider {
        match self {
            Provider::Strapi(p) => Provider::Strapi(p.with_user_jwt(user_jwt)),
            other => other.clone(),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            Provider::Mock(_) => ProviderKind::Mock,
            Provider::Rest(_) => ProviderKind::Rest,
            Provider::Strapi(_) => ProviderKind::Strapi,
        }
    }

    pub async fn probe(&self) -> AppResult<()> {
        match self {
            Provider::Mock(_) => Ok(()),
            Provider::Rest(p) => p.probe().await,
            Provider::Strapi(p) => p.probe().await,
        }
    }

    // ===== Articles =====

    pub async fn get_articles(&self, query: &ArticleQuery) -> AppResult<Paginated<Article>> {
        dispatch!(self, get_articles(query))
    }

    pub async fn get_article_by_id(&self, id: &str) -> AppResult<Option<Article>> {
        dispatch!(self, get_article_by_id(id))
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> AppResult<Option<Article>> {
        dispatch!(self, get_article_by_slug(slug))
    }

    pub async fn create_article(&self, value: Value) -> AppResult<Article> {
        dispatch!(self, create_article(value))
    }

    pub async fn update_article(&self, id: &str, value: Value) -> AppResult<Article> {
        dispatch!(self, update_article(id, value))
    }

    pub async fn delete_article(&self, id: &str) -> AppResult<()> {
        dispatch!(self, delete_article(id))
    }

    pub async fn get_categories(&self) -> AppResult<Vec<Category>> {
        dispatch!(self, get_categories())
    }

    pub async fn get_settings(&self) -> AppResult<Settings> {
        dispatch!(self, get_settings())
    }

    pub async fn get_featured_articles(&self, limit: u32) -> AppResult<Vec<Article>> {
        let query = ArticleQuery {
            featured: Some(true),
            ..ArticleQuery::published().with_limit(limit)
        };
        Ok(self.get_articles(&query).await?.data)
    }

    pub async fn get_breaking_news(&self, limit: u32) -> AppResult<Vec<Article>> {
        let query = ArticleQuery {
            breaking: Some(true),
            ..ArticleQuery::published().with_limit(limit)
        };
        Ok(self.get_articles(&query).await?.data)
    }

    pub async fn get_trending_articles(&self, limit: u32) -> AppResult<Vec<Article>> {
        let query = ArticleQuery {
            order_by: Some("views".to_string()),
            order: Some("desc".to_string()),
            ..ArticleQuery::published().with_limit(limit)
        };
        Ok(self.get_articles(&query).await?.data)
    }

    pub async fn get_articles_by_category(&self, slug: &str, limit: u32) -> AppResult<Vec<Article>> {
        let query = ArticleQuery {
            category: Some(slug.to_string()),
            ..ArticleQuery::published().with_limit(limit)
        };
        Ok(self.get_articles(&query).await?.data)
    }

    pub async fn search_articles(&self, search: &str, limit: u32) -> AppResult<Vec<Article>> {
        let query = ArticleQuery {
            search: Some(search.to_string()),
            ..ArticleQuery::published().with_limit(limit)
        };
        Ok(self.get_articles(&query).await?.data)
    }

    // ===== Content items =====

    pub async fn list_items(
        &self,
        content_type: ContentType,
        query: &ContentQuery,
    ) -> AppResult<Paginated<ContentItem>> {
        dispatch!(self, list_items(content_type, query))
    }

    pub async fn get_item_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> AppResult<Option<ContentItem>> {
        dispatch!(self, get_item_by_slug(content_type, slug))
    }

    pub async fn create_item(&self, content_type: ContentType, value: Value) -> AppResult<ContentItem> {
        dispatch!(self, create_item(content_type, value))
    }

    pub async fn update_item(
        &self,
        content_type: ContentType,
        id: &str,
        value: Value,
    ) -> AppResult<ContentItem> {
        dispatch!(self, update_item(content_type, id, value))
    }

    pub async fn delete_item(&self, content_type: ContentType, id: &str) -> AppResult<()> {
        dispatch!(self, delete_item(content_type, id))
    }

    pub async fn get_holidays_by_month(&self, year: i32, month: u32) -> AppResult<Vec<ContentItem>> {
        let (from, to) = month_bounds(year, month)?;
        let query = ContentQuery {
            date_from: Some(from),
            date_to: Some(to),
            limit: Some(CALENDAR_FETCH_LIMIT),
            offset: Some(0),
            ..Default::default()
        };
        Ok(self.list_items(ContentType::Holidays, &query).await?.data)
    }

    pub async fn get_upcoming_events(&self, limit: u32) -> AppResult<Vec<ContentItem>> {
        let query = ContentQuery {
            status: Some("upcoming".to_string()),
            order_by: Some("date".to_string()),
            order: Some("asc".to_string()),
            limit: Some(limit),
            offset: Some(0),
            ..Default::default()
        };
        Ok(self.list_items(ContentType::Events, &query).await?.data)
    }

    pub async fn get_calendar_events(&self, year: i32, month: u32) -> AppResult<Vec<CalendarEvent>> {
        month_bounds(year, month)?;
        let query = ContentQuery {
            limit: Some(CALENDAR_FETCH_LIMIT),
            offset: Some(0),
            ..Default::default()
        };
        let (exams, results, holidays, events) = futures::try_join!(
            self.list_items(ContentType::Exams, &query),
            self.list_items(ContentType::Results, &query),
            self.list_items(ContentType::Holidays, &query),
            self.list_items(ContentType::Events, &query),
        )?;
        let groups = [
            (ContentType::Exams, exams.data),
            (ContentType::Results, results.data),
            (ContentType::Holidays, holidays.data),
            (ContentType::Events, events.data),
        ];
        Ok(compose_calendar(year, month, &groups))
    }
}

/// Owner of the active CMS configuration and its memoized provider
pub struct CmsFacade {
    config: RwLock<CmsConfig>,
    current: Mutex<Option<(String, Arc<Provider>)>>,
    upstream: Arc<UpstreamClient>,
    store: Arc<ContentStore>,
}

impl CmsFacade {
    pub fn new(config: CmsConfig, upstream: Arc<UpstreamClient>, store: Arc<ContentStore>) -> Self {
        Self {
            config: RwLock::new(config),
            current: Mutex::new(None),
            upstream,
            store,
        }
    }

    pub async fn config(&self) -> CmsConfig {
        self.config.read().await.clone()
    }

    /// Replace the configuration; the next [`CmsFacade::provider`] call rebuilds
    pub async fn configure(&self, config: CmsConfig) {
        info!("CMS reconfigured: provider={} base_url={}", config.provider, config.base_url);
        *self.config.write().await = config;
        *self.current.lock().await = None;
    }

    pub async fn provider(&self) -> Arc<Provider> {
        let config = self.config.read().await.clone();
        let key = config.cache_key();

        let mut current = self.current.lock().await;
        if let Some((cached_key, provider)) = current.as_ref() {
            if *cached_key == key {
                return provider.clone();
            }
        }

        let provider = Arc::new(Provider::build(
            &config,
            self.upstream.clone(),
            self.store.clone(),
        ));
        info!("CMS provider ready: {}", provider.kind());
        *current = Some((key, provider.clone()));
        provider
    }

    /// Check the remote backend once; switch to mock when it does not answer
    pub async fn probe(&self) -> ProviderKind {
        let config = self.config().await;
        let provider = self.provider().await;
        if provider.kind() == ProviderKind::Mock {
            return ProviderKind::Mock;
        }

        let timeout = Duration::from_secs(config.probe_timeout_secs.max(1));
        let failure = match tokio::time::timeout(timeout, provider.probe()).await {
            Ok(Ok(())) => {
                info!("CMS backend reachable at {}", config.base_url);
                return provider.kind();
            }
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("no answer within {}s", timeout.as_secs()),
        };

        if !config.fallback_to_mock {
            warn!("CMS backend probe failed: {}", failure);
            return provider.kind();
        }
        warn!("CMS backend probe failed: {}, switching to mock content", failure);
        self.configure(CmsConfig {
            provider: ProviderKind::Mock,
            ..config
        })
        .await;
        ProviderKind::Mock
    }
}

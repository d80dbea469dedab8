// Public content reads through the provider facade
use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{
    Article, ArticleQuery, CalendarEvent, Category, ContentItem, ContentQuery, ContentType,
    Paginated, Settings,
};
use crate::modules::seo::{derive_seo_signals, SeoInput};
use crate::proxy::server::AppState;

#[derive(Debug, Deserialize, Default)]
pub struct LimitParams {
    pub limit: Option<u32>,
}

impl LimitParams {
    fn limit_or(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub limit: Option<u32>,
}

fn content_type(collection: &str) -> AppResult<ContentType> {
    ContentType::parse(collection)
        .ok_or_else(|| AppError::NotFound(format!("Unknown collection: {}", collection)))
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<ArticleQuery>,
) -> AppResult<Json<Paginated<Article>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_articles(&query).await?))
}

/// Article plus the SEO signals derived from it
pub async fn article_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> AppResult<Json<Value>> {
    let provider = state.cms.provider().await;
    let article = provider
        .get_article_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Article {}", slug)))?;
    let seo = derive_seo_signals(&SeoInput::from(&article), Utc::now());
    Ok(Json(json!({ "article": article, "seo": seo })))
}

pub async fn article_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Article>> {
    let provider = state.cms.provider().await;
    provider
        .get_article_by_id(&id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Article {}", id)))
}

pub async fn featured(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<Article>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_featured_articles(params.limit_or(5)).await?))
}

pub async fn breaking(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<Article>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_breaking_news(params.limit_or(5)).await?))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<Article>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_trending_articles(params.limit_or(5)).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<Vec<Article>>> {
    let q = params.q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }
    let provider = state.cms.provider().await;
    Ok(Json(
        provider
            .search_articles(q, params.limit.unwrap_or(20))
            .await?,
    ))
}

pub async fn by_category(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<Article>>> {
    let provider = state.cms.provider().await;
    Ok(Json(
        provider
            .get_articles_by_category(&slug, params.limit_or(10))
            .await?,
    ))
}

pub async fn categories(State(state): State<AppState>) -> AppResult<Json<Vec<Category>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_categories().await?))
}

pub async fn settings(State(state): State<AppState>) -> AppResult<Json<Settings>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_settings().await?))
}

pub async fn list_items(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(query): Query<ContentQuery>,
) -> AppResult<Json<Paginated<ContentItem>>> {
    let content_type = content_type(&collection)?;
    let provider = state.cms.provider().await;
    Ok(Json(provider.list_items(content_type, &query).await?))
}

pub async fn item_by_slug(
    State(state): State<AppState>,
    Path((collection, slug)): Path<(String, String)>,
) -> AppResult<Json<ContentItem>> {
    let content_type = content_type(&collection)?;
    let provider = state.cms.provider().await;
    provider
        .get_item_by_slug(content_type, &slug)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("{} {}", content_type, slug)))
}

pub async fn calendar(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> AppResult<Json<Vec<CalendarEvent>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_calendar_events(year, month).await?))
}

pub async fn holidays(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_holidays_by_month(year, month).await?))
}

pub async fn upcoming_events(
    State(state): State<AppState>,
    Query(params): Query<LimitParams>,
) -> AppResult<Json<Vec<ContentItem>>> {
    let provider = state.cms.provider().await;
    Ok(Json(provider.get_upcoming_events(params.limit_or(5)).await?))
}

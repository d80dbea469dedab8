// Generic REST backend (`/articles`, `/microsite-items`)
use std::sync::Arc;

use axum::http::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::config::CmsConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Article, ArticleQuery, Category, ContentItem, ContentQuery, ContentType, Paginated, Settings,
};
use crate::proxy::common::url::join_segments;
use crate::proxy::mappers::strapi::encode_query;
use crate::proxy::upstream::{NotFound, UpstreamClient};

const ITEMS: &str = "microsite-items";

#[derive(Clone)]
pub struct RestProvider {
    client: Arc<UpstreamClient>,
    base_url: String,
    api_key: Option<String>,
}

/// Query pairs understood by `/microsite-items`
fn item_query(content_type: ContentType, query: &ContentQuery) -> Vec<(String, String)> {
    let mut pairs = vec![("moduleType".to_string(), content_type.module_type().to_string())];
    let mut push = |key: &str, value: Option<String>| {
        if let Some(v) = value.filter(|v| !v.is_empty()) {
            pairs.push((key.to_string(), v));
        }
    };
    push("category", query.category.clone());
    push("subcategory", query.subcategory.clone());
    push("city", query.city.clone());
    push("district", query.district.clone());
    push("featured", query.featured.map(|v| v.to_string()));
    push("popular", query.popular.map(|v| v.to_string()));
    push("limit", query.limit.map(|v| v.to_string()));
    push("offset", query.offset.map(|v| v.to_string()));
    push("search", query.search.clone());
    push("status", query.status.clone());
    push("orderBy", query.order_by.clone());
    push("order", query.order.clone());
    pairs
}

fn decode<T: DeserializeOwned>(value: Value) -> AppResult<T> {
    Ok(serde_json::from_value(value)?)
}

impl RestProvider {
    pub fn new(client: Arc<UpstreamClient>, config: &CmsConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_token().map(str::to_string),
        }
    }

    fn url(&self, segments: &[&str], query: &[(String, String)]) -> AppResult<String> {
        Ok(format!(
            "{}{}",
            join_segments(&self.base_url, segments)?,
            encode_query(query)
        ))
    }

    async fn call(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        not_found: NotFound,
    ) -> AppResult<Option<Value>> {
        self.client
            .fetch_json(method, url, self.api_key.as_deref(), body, not_found)
            .await
    }

    async fn get(&self, url: &str) -> AppResult<Option<Value>> {
        self.call(Method::GET, url, None, NotFound::Empty).await
    }

    async fn write<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: &Value,
        what: &str,
    ) -> AppResult<T> {
        let raw = self
            .call(method, url, Some(body), NotFound::Error)
            .await?
            .ok_or_else(|| AppError::Unknown(format!("Empty response writing {}", what)))?;
        decode(raw)
    }

    // ===== Articles =====

    pub async fn get_articles(&self, query: &ArticleQuery) -> AppResult<Paginated<Article>> {
        let url = self.url(&["articles"], &query.to_pairs())?;
        match self.get(&url).await? {
            Some(raw) => decode(raw),
            None => Ok(Paginated::empty(query.limit.map(u64::from).unwrap_or(10))),
        }
    }

    pub async fn get_article_by_id(&self, id: &str) -> AppResult<Option<Article>> {
        let url = self.url(&["articles", id], &[])?;
        self.get(&url).await?.map(decode).transpose()
    }

    pub async fn get_article_by_slug(&self, slug: &str) -> AppResult<Option<Article>> {
        let url = self.url(&["articles", "slug", slug], &[])?;
        self.get(&url).await?.map(decode).transpose()
    }

    pub async fn create_article(&self, value: Value) -> AppResult<Article> {
        let url = self.url(&["articles"], &[])?;
        self.write(Method::POST, &url, &value, "article").await
    }

    pub async fn update_article(&self, id: &str, value: Value) -> AppResult<Article> {
        let url = self.url(&["articles", id], &[])?;
        self.write(Method::PATCH, &url, &value, "article").await
    }

    pub async fn delete_article(&self, id: &str) -> AppResult<()> {
        let url = self.url(&["articles", id], &[])?;
        self.call(Method::DELETE, &url, None, NotFound::Error).await?;
        Ok(())
    }

    pub async fn get_categories(&self) -> AppResult<Vec<Category>> {
        let url = self.url(&["categories"], &[])?;
        match self.get(&url).await? {
            Some(Value::Object(mut obj)) => match obj.remove("data") {
                Some(list) => decode(list),
                None => Ok(Vec::new()),
            },
            Some(list) => decode(list),
            None => Ok(Vec::new()),
        }
    }

    pub async fn get_settings(&self) -> AppResult<Settings> {
        let url = self.url(&["settings"], &[])?;
        match self.get(&url).await? {
            Some(raw) => decode(raw),
            None => Ok(Settings::default()),
        }
    }

    // ===== Content items =====

    pub async fn list_items(
        &self,
        content_type: ContentType,
        query: &ContentQuery,
    ) -> AppResult<Paginated<ContentItem>> {
        let url = self.url(&[ITEMS], &item_query(content_type, query))?;
        match self.get(&url).await? {
            Some(raw) => decode(raw),
            None => Ok(Paginated::empty(u64::from(query.limit()))),
        }
    }

    pub async fn get_item_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> AppResult<Option<ContentItem>> {
        let module = [("moduleType".to_string(), content_type.module_type().to_string())];
        let url = self.url(&[ITEMS, "slug", slug], &module)?;
        self.get(&url).await?.map(decode).transpose()
    }

    pub async fn create_item(&self, content_type: ContentType, value: Value) -> AppResult<ContentItem> {
        let Value::Object(mut fields) = value else {
            return Err(AppError::BadRequest("Item body must be an object".to_string()));
        };
        fields.insert(
            "moduleType".to_string(),
            Value::String(content_type.module_type().to_string()),
        );
        let url = self.url(&[ITEMS], &[])?;
        self.write(Method::POST, &url, &Value::Object(fields), content_type.segment())
            .await
    }

    pub async fn update_item(
        &self,
        content_type: ContentType,
        id: &str,
        value: Value,
    ) -> AppResult<ContentItem> {
        let url = self.url(&[ITEMS, id], &[])?;
        self.write(Method::PATCH, &url, &value, content_type.segment())
            .await
    }

    pub async fn delete_item(&self, _content_type: ContentType, id: &str) -> AppResult<()> {
        let url = self.url(&[ITEMS, id], &[])?;
        self.call(Method::DELETE, &url, None, NotFound::Error).await?;
        Ok(())
    }

    pub async fn probe(&self) -> AppResult<()> {
        let url = self.url(&["categories"], &[])?;
        self.get(&url).await.map(|_| ())
    }
}

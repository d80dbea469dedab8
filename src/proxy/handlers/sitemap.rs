// `/sitemap.xml`
use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::warn;

use crate::error::AppResult;
use crate::models::ArticleQuery;
use crate::modules::sitemap::{article_entries, render_sitemap, static_entries};
use crate::proxy::server::AppState;

const MAX_ARTICLES: u32 = 1000;

pub async fn handle_sitemap(State(state): State<AppState>) -> AppResult<Response> {
    let now = Utc::now();
    let base = state.config.site.base_url.as_str();
    let mut entries = static_entries(base, now);

    let provider = state.cms.provider().await;
    match provider
        .get_articles(&ArticleQuery::published().with_limit(MAX_ARTICLES))
        .await
    {
        Ok(page) => entries.extend(article_entries(base, &page.data, now)),
        Err(e) => warn!("Sitemap article fetch failed, static pages only: {}", e),
    }

    let xml = render_sitemap(&entries)?;
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        xml,
    )
        .into_response())
}

// SQLite content store backing the mock provider
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{Article, Category, ContentItem, ContentType, Settings};

const SEED: &str = include_str!("../../assets/mock_seed.json");

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS articles (
    id   TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS categories (
    id   TEXT PRIMARY KEY,
    slug TEXT NOT NULL UNIQUE,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS settings (
    key  TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS content_items (
    id         TEXT PRIMARY KEY,
    collection TEXT NOT NULL,
    slug       TEXT NOT NULL,
    data       TEXT NOT NULL,
    UNIQUE (collection, slug)
);
";

#[derive(Debug, Deserialize)]
struct SeedData {
    settings: Settings,
    categories: Vec<Category>,
    articles: Vec<Article>,
    items: Map<String, Value>,
}

/// JSON-document tables in one SQLite database
pub struct ContentStore {
    conn: Mutex<Connection>,
}

impl ContentStore {
    pub fn open(path: &Path) -> AppResult<Self> {
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> AppResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Unknown("Content store lock poisoned".to_string()))
    }

    /// Load the bundled sample content when the store holds no articles
    pub fn seed_if_empty(&self) -> AppResult<bool> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(false);
        }
        self.seed_from_json(SEED)?;
        Ok(true)
    }

    pub fn seed_from_json(&self, json: &str) -> AppResult<()> {
        let seed: SeedData = serde_json::from_str(json)?;

        self.put_settings(&seed.settings)?;
        for category in &seed.categories {
            self.put_category(category)?;
        }
        for article in &seed.articles {
            self.insert_article(article)?;
        }
        for (collection, items) in seed.items {
            let Some(content_type) = ContentType::parse(&collection) else {
                tracing::warn!("Skipping unknown seed collection {}", collection);
                continue;
            };
            let items: Vec<ContentItem> = serde_json::from_value(items)?;
            for item in &items {
                self.insert_item(content_type, item)?;
            }
        }
        tracing::info!("Content store seeded with sample content");
        Ok(())
    }

    fn query_docs<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> AppResult<Vec<T>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, |row| row.get::<_, String>(0))?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(serde_json::from_str(&row?)?);
        }
        Ok(docs)
    }

    fn query_doc<T: DeserializeOwned>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> AppResult<Option<T>> {
        let data: Option<String> = self
            .conn()?
            .query_row(sql, params, |row| row.get(0))
            .optional()?;
        data.map(|d| serde_json::from_str(&d))
            .transpose()
            .map_err(AppError::from)
    }

    fn execute(&self, sql: &str, params: impl rusqlite::Params) -> AppResult<usize> {
        self.conn()?.execute(sql, params).map_err(conflict_on_unique)
    }

    // ===== Articles =====

    pub fn list_articles(&self) -> AppResult<Vec<Article>> {
        self.query_docs("SELECT data FROM articles ORDER BY rowid", [])
    }

    pub fn get_article(&self, id: &str) -> AppResult<Option<Article>> {
        self.query_doc("SELECT data FROM articles WHERE id = ?1", params![id])
    }

    pub fn get_article_by_slug(&self, slug: &str) -> AppResult<Option<Article>> {
        self.query_doc("SELECT data FROM articles WHERE slug = ?1", params![slug])
    }

    pub fn insert_article(&self, article: &Article) -> AppResult<()> {
        self.execute(
            "INSERT INTO articles (id, slug, data) VALUES (?1, ?2, ?3)",
            params![article.id, article.slug, to_json(article)?],
        )?;
        Ok(())
    }

    /// Replace a stored article; `false` when the id is unknown
    pub fn update_article(&self, article: &Article) -> AppResult<bool> {
        let changed = self.execute(
            "UPDATE articles SET slug = ?2, data = ?3 WHERE id = ?1",
            params![article.id, article.slug, to_json(article)?],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_article(&self, id: &str) -> AppResult<bool> {
        Ok(self.execute("DELETE FROM articles WHERE id = ?1", params![id])? > 0)
    }

    // ===== Categories / settings =====

    pub fn list_categories(&self) -> AppResult<Vec<Category>> {
        self.query_docs("SELECT data FROM categories ORDER BY rowid", [])
    }

    pub fn put_category(&self, category: &Category) -> AppResult<()> {
        self.execute(
            "INSERT OR REPLACE INTO categories (id, slug, data) VALUES (?1, ?2, ?3)",
            params![category.id, category.slug, to_json(category)?],
        )?;
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<Option<Settings>> {
        self.query_doc("SELECT data FROM settings WHERE key = 'site'", [])
    }

    pub fn put_settings(&self, settings: &Settings) -> AppResult<()> {
        self.execute(
            "INSERT OR REPLACE INTO settings (key, data) VALUES ('site', ?1)",
            params![to_json(settings)?],
        )?;
        Ok(())
    }

    // ===== Content items =====

    pub fn list_items(&self, content_type: ContentType) -> AppResult<Vec<ContentItem>> {
        self.query_docs(
            "SELECT data FROM content_items WHERE collection = ?1 ORDER BY rowid",
            params![content_type.segment()],
        )
    }

    pub fn get_item(&self, content_type: ContentType, id: &str) -> AppResult<Option<ContentItem>> {
        self.query_doc(
            "SELECT data FROM content_items WHERE collection = ?1 AND id = ?2",
            params![content_type.segment(), id],
        )
    }

    pub fn get_item_by_slug(
        &self,
        content_type: ContentType,
        slug: &str,
    ) -> AppResult<Option<ContentItem>> {
        self.query_doc(
            "SELECT data FROM content_items WHERE collection = ?1 AND slug = ?2",
            params![content_type.segment(), slug],
        )
    }

    pub fn insert_item(&self, content_type: ContentType, item: &ContentItem) -> AppResult<()> {
        self.execute(
            "INSERT INTO content_items (id, collection, slug, data) VALUES (?1, ?2, ?3, ?4)",
            params![item.id, content_type.segment(), item.slug, to_json(item)?],
        )?;
        Ok(())
    }

    pub fn update_item(&self, content_type: ContentType, item: &ContentItem) -> AppResult<bool> {
        let changed = self.execute(
            "UPDATE content_items SET slug = ?3, data = ?4 WHERE collection = ?1 AND id = ?2",
            params![content_type.segment(), item.id, item.slug, to_json(item)?],
        )?;
        Ok(changed > 0)
    }

    pub fn delete_item(&self, content_type: ContentType, id: &str) -> AppResult<bool> {
        let changed = self.execute(
            "DELETE FROM content_items WHERE collection = ?1 AND id = ?2",
            params![content_type.segment(), id],
        )?;
        Ok(changed > 0)
    }
}

fn to_json<T: Serialize>(value: &T) -> AppResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn conflict_on_unique(err: rusqlite::Error) -> AppError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _) if e.code == ErrorCode::ConstraintViolation => {
            AppError::Conflict("slug already exists".to_string())
        }
        other => AppError::Database(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, slug: &str) -> ContentItem {
        serde_json::from_value(json!({ "id": id, "slug": slug, "name": "X" })).unwrap()
    }

    #[test]
    fn test_seed_loads_every_collection() {
        let store = ContentStore::open_in_memory().unwrap();
        assert!(store.seed_if_empty().unwrap());
        assert!(!store.seed_if_empty().unwrap());

        assert!(store.list_articles().unwrap().len() >= 5);
        assert_eq!(store.list_categories().unwrap().len(), 13);
        assert_eq!(store.get_settings().unwrap().unwrap().site_name, "Rampur News");
        for content_type in ContentType::ALL {
            assert!(
                !store.list_items(content_type).unwrap().is_empty(),
                "no seed items for {}",
                content_type
            );
        }
    }

    #[test]
    fn test_slug_unique_per_collection() {
        let store = ContentStore::open_in_memory().unwrap();
        store.insert_item(ContentType::Exams, &item("1", "same")).unwrap();
        // same slug in another collection is fine
        store.insert_item(ContentType::Results, &item("2", "same")).unwrap();

        let err = store
            .insert_item(ContentType::Exams, &item("3", "same"))
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_item_update_and_delete() {
        let store = ContentStore::open_in_memory().unwrap();
        store.insert_item(ContentType::Places, &item("p1", "fort")).unwrap();

        let mut stored = store.get_item(ContentType::Places, "p1").unwrap().unwrap();
        stored.slug = "old-fort".into();
        assert!(store.update_item(ContentType::Places, &stored).unwrap());
        assert!(store.get_item_by_slug(ContentType::Places, "fort").unwrap().is_none());
        assert!(store.get_item_by_slug(ContentType::Places, "old-fort").unwrap().is_some());

        assert!(store.delete_item(ContentType::Places, "p1").unwrap());
        assert!(!store.delete_item(ContentType::Places, "p1").unwrap());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mock_cms.db");
        {
            let store = ContentStore::open(&path).unwrap();
            store.seed_if_empty().unwrap();
        }
        let reopened = ContentStore::open(&path).unwrap();
        assert!(!reopened.seed_if_empty().unwrap());
        assert!(reopened
            .get_article_by_slug("rampur-heavy-rain-waterlogging")
            .unwrap()
            .is_some());
    }
}

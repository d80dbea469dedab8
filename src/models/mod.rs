pub mod article;
pub mod config;
pub mod content;
pub mod session;

pub use article::{Article, ArticleQuery, Category, Paginated, Settings};
pub use config::{AppConfig, AuthConfig, SiteConfig};
pub use content::{CalendarEntryType, CalendarEvent, ContentItem, ContentQuery, ContentType};
pub use session::{Role, SessionClaims, SessionUser};

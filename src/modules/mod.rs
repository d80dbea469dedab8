pub mod config;
pub mod db;
pub mod logger;
pub mod seo;
pub mod session;
pub mod sitemap;

pub use config::*;
pub use logger::*;

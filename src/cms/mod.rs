// CMS access: provider facade over mock, REST and Strapi backends
pub mod calendar;
pub mod config;
pub mod facade;
pub mod mock;
pub mod rest;
pub mod strapi;

pub use config::{CmsConfig, ProviderKind};
pub use facade::{CmsFacade, Provider};

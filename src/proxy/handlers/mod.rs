// Handlers module - HTTP endpoint handlers

pub mod admin; // Admin session and content writes
pub mod content; // Facade reads
pub mod sitemap;
pub mod strapi; // Strapi relay and normalizing reads

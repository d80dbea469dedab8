// Mappers module - upstream payload conversion

pub mod strapi;

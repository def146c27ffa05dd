pub mod auth_service;
pub mod store_service;

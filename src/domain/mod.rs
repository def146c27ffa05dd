pub mod cart;
pub mod context;
pub mod error;
pub mod item;
pub mod permission;
pub mod repository;
pub mod session;
pub mod user;

use crate::presentation::auth::{
    me, request_reset, reset_password, signin, signout, signup, update_permissions, users,
};
use crate::presentation::handlers::{
    add_to_cart, cart, create_item, delete_item, get_item, health_check, items_connection,
    list_items, remove_from_cart, update_item,
};
use actix_web::web;

pub const ROUTES: &str = "GET /api/health, POST /api/signup, POST /api/signin, POST /api/signout, \
POST /api/request-reset, POST /api/reset-password, GET /api/me, GET /api/users, \
PUT /api/users/{id}/permissions, GET|POST /api/items, GET /api/items/connection, \
GET|PATCH|DELETE /api/items/{id}, GET|POST /api/cart, DELETE /api/cart/{id}";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health_check))
            .route("/signup", web::post().to(signup))
            .route("/signin", web::post().to(signin))
            .route("/signout", web::post().to(signout))
            .route("/request-reset", web::post().to(request_reset))
            .route("/reset-password", web::post().to(reset_password))
            .route("/me", web::get().to(me))
            .route("/users", web::get().to(users))
            .route("/users/{id}/permissions", web::put().to(update_permissions))
            .route("/items", web::get().to(list_items))
            .route("/items", web::post().to(create_item))
            .route("/items/connection", web::get().to(items_connection))
            .route("/items/{id}", web::get().to(get_item))
            .route("/items/{id}", web::patch().to(update_item))
            .route("/items/{id}", web::delete().to(delete_item))
            .route("/cart", web::get().to(cart))
            .route("/cart", web::post().to(add_to_cart))
            .route("/cart/{id}", web::delete().to(remove_from_cart)),
    );
}

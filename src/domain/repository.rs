use crate::domain::cart::CartItem;
use crate::domain::item::Item;
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;

/// Result of inserting a brand new user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created,
    EmailTaken,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Inserts `user` unless another user already holds its email. The check and the
    /// insert are atomic.
    async fn create_user(&self, user: User) -> Result<UserInsert>;
    async fn save_user(&self, user: User) -> Result<()>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>>;
    async fn list_users(&self) -> Result<Vec<User>>;
}

#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn save_item(&self, item: Item) -> Result<()>;
    async fn find_item_by_id(&self, id: &str) -> Result<Option<Item>>;
    async fn delete_item(&self, id: &str) -> Result<Option<Item>>;
    async fn list_items(&self) -> Result<Vec<Item>>;
    async fn count_items(&self) -> Result<usize>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn save_cart_item(&self, cart_item: CartItem) -> Result<()>;
    async fn find_cart_item_by_id(&self, id: &str) -> Result<Option<CartItem>>;
    async fn find_cart_item(&self, user_id: &str, item_id: &str) -> Result<Option<CartItem>>;
    async fn delete_cart_item(&self, id: &str) -> Result<Option<CartItem>>;
    async fn list_cart_items(&self, user_id: &str) -> Result<Vec<CartItem>>;
}

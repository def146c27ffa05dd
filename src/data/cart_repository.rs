use crate::domain::cart::CartItem;
use crate::domain::repository::CartRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// In-memory cart storage. Uniqueness of (user, item) is left to the caller,
/// the same as an external store without a unique index.
#[derive(Clone)]
pub struct InMemoryCartRepository {
    storage: Arc<RwLock<HashMap<String, CartItem>>>,
}

impl InMemoryCartRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryCartRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartRepository for InMemoryCartRepository {
    #[instrument(skip(self, cart_item), fields(cart_item_id = %cart_item.id, quantity = cart_item.quantity))]
    async fn save_cart_item(&self, cart_item: CartItem) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.insert(cart_item.id.clone(), cart_item);
        debug!("Cart item saved to memory storage");
        Ok(())
    }

    async fn find_cart_item_by_id(&self, id: &str) -> Result<Option<CartItem>> {
        let storage = self.storage.read().await;
        Ok(storage.get(id).cloned())
    }

    async fn find_cart_item(&self, user_id: &str, item_id: &str) -> Result<Option<CartItem>> {
        let storage = self.storage.read().await;
        Ok(storage
            .values()
            .find(|c| c.user_id == user_id && c.item_id == item_id)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn delete_cart_item(&self, id: &str) -> Result<Option<CartItem>> {
        let mut storage = self.storage.write().await;
        Ok(storage.remove(id))
    }

    async fn list_cart_items(&self, user_id: &str) -> Result<Vec<CartItem>> {
        let storage = self.storage.read().await;
        let mut items: Vec<CartItem> = storage
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }
}

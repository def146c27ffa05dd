use crate::domain::item::Item;
use crate::domain::repository::ItemRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

#[derive(Clone)]
pub struct InMemoryItemRepository {
    storage: Arc<RwLock<HashMap<String, Item>>>,
}

impl InMemoryItemRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryItemRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemRepository for InMemoryItemRepository {
    #[instrument(skip(self, item), fields(item_id = %item.id))]
    async fn save_item(&self, item: Item) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage.insert(item.id.clone(), item);
        debug!("Item saved to memory storage");
        Ok(())
    }

    async fn find_item_by_id(&self, id: &str) -> Result<Option<Item>> {
        let storage = self.storage.read().await;
        Ok(storage.get(id).cloned())
    }

    #[instrument(skip(self))]
    async fn delete_item(&self, id: &str) -> Result<Option<Item>> {
        let mut storage = self.storage.write().await;
        Ok(storage.remove(id))
    }

    async fn list_items(&self) -> Result<Vec<Item>> {
        let storage = self.storage.read().await;
        let mut items: Vec<Item> = storage.values().cloned().collect();
        items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(items)
    }

    async fn count_items(&self) -> Result<usize> {
        Ok(self.storage.read().await.len())
    }
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Price in cents.
    pub price: u64,
    pub image: Option<String>,
    pub large_image: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateItem {
    pub title: String,
    pub description: String,
    pub price: u64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub large_image: Option<String>,
}

/// Field-level changes to an item. The id is addressed separately and can't be updated.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
}

impl UpdateItem {
    pub fn apply_to(self, item: &mut Item) {
        if let Some(title) = self.title {
            item.title = title;
        }
        if let Some(description) = self.description {
            item.description = description;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
    }
}

/// Pagination window over the item listing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ItemsWindow {
    #[serde(default)]
    pub skip: Option<usize>,
    #[serde(default)]
    pub first: Option<usize>,
}

impl ItemsWindow {
    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        let skipped = items.into_iter().skip(self.skip.unwrap_or(0));
        match self.first {
            Some(first) => skipped.take(first).collect(),
            None => skipped.collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsAggregate {
    pub count: usize,
}

/// Aggregate view used by the storefront to size its pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsConnection {
    pub aggregate: ItemsAggregate,
}

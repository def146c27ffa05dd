use crate::domain::item::Item;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub user_id: String,
    pub item_id: String,
    pub quantity: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddToCart {
    pub item_id: String,
}

/// A cart line together with the item it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItemView {
    pub id: String,
    pub quantity: u32,
    pub item: Item,
}

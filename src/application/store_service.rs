use crate::domain::cart::{CartItem, CartItemView};
use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::item::{
    CreateItem, Item, ItemsAggregate, ItemsConnection, ItemsWindow, UpdateItem,
};
use crate::domain::permission::{
    ITEM_DELETE_PERMISSIONS, ITEM_UPDATE_PERMISSIONS, delete_item_denied, has_any_permission,
    update_item_allowed,
};
use crate::domain::repository::{CartRepository, ItemRepository};
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Catalogue and cart operations.
///
/// Every mutation does its checks first and then at most one write against the store.
/// `add_to_cart` is a read followed by a write with no transaction around it: two
/// concurrent adds of the same item can both miss the lookup and create two lines.
pub struct StoreService<I: ItemRepository, C: CartRepository> {
    items: Arc<I>,
    carts: Arc<C>,
}

impl<I: ItemRepository, C: CartRepository> StoreService<I, C> {
    pub fn new(items: Arc<I>, carts: Arc<C>) -> Self {
        Self { items, carts }
    }

    async fn find_item(&self, id: &str) -> Result<Item> {
        let item = self
            .items
            .find_item_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Item not found: {}", id)))?;
        Ok(item)
    }

    #[instrument(skip(self, ctx, req), fields(title = %req.title))]
    pub async fn create_item(&self, ctx: &RequestContext, req: CreateItem) -> Result<Item> {
        let user_id = ctx.require_user_id()?;
        let item = Item {
            id: Uuid::new_v4().to_string(),
            title: req.title,
            description: req.description,
            price: req.price,
            image: req.image,
            large_image: req.large_image,
            user_id: user_id.to_string(),
        };
        self.items.save_item(item.clone()).await?;
        info!(item_id = %item.id, user_id = %user_id, "Item created");
        Ok(item)
    }

    #[instrument(skip(self, ctx, update))]
    pub async fn update_item(
        &self,
        ctx: &RequestContext,
        id: &str,
        update: UpdateItem,
    ) -> Result<Item> {
        let mut item = self.find_item(id).await?;

        let owns_item = ctx.user_id.as_deref() == Some(item.user_id.as_str());
        let has_permission = has_any_permission(&ctx.permissions(), ITEM_UPDATE_PERMISSIONS);
        if !update_item_allowed(owns_item, has_permission) {
            return Err(
                DomainError::Authorization("You don't have permission to do that!".to_string())
                    .into(),
            );
        }

        update.apply_to(&mut item);
        self.items.save_item(item.clone()).await?;
        info!(item_id = %item.id, "Item updated");
        Ok(item)
    }

    #[instrument(skip(self, ctx))]
    pub async fn delete_item(&self, ctx: &RequestContext, id: &str) -> Result<Item> {
        let user = ctx.require_user()?;
        let item = self.find_item(id).await?;

        let owns_item = item.user_id == user.id;
        let has_permission = has_any_permission(&user.permissions, ITEM_DELETE_PERMISSIONS);
        if delete_item_denied(owns_item, has_permission) {
            warn!(item_id = %item.id, user_id = %user.id, "Item deletion refused");
            return Err(
                DomainError::Authorization("You don't have permission to do that!".to_string())
                    .into(),
            );
        }

        let deleted = self
            .items
            .delete_item(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Item not found: {}", id)))?;
        info!(item_id = %deleted.id, user_id = %user.id, owns_item, "Item deleted");
        Ok(deleted)
    }

    pub async fn get_item(&self, id: &str) -> Result<Item> {
        self.find_item(id).await
    }

    pub async fn list_items(&self, window: ItemsWindow) -> Result<Vec<Item>> {
        Ok(window.apply(self.items.list_items().await?))
    }

    pub async fn items_connection(&self) -> Result<ItemsConnection> {
        let count = self.items.count_items().await?;
        Ok(ItemsConnection {
            aggregate: ItemsAggregate { count },
        })
    }

    #[instrument(skip(self, ctx))]
    pub async fn add_to_cart(&self, ctx: &RequestContext, item_id: &str) -> Result<CartItem> {
        let user_id = ctx.require_user_id()?;
        self.find_item(item_id).await?;

        let cart_item = match self.carts.find_cart_item(user_id, item_id).await? {
            Some(mut existing) => {
                debug!(cart_item_id = %existing.id, "Item already in cart, incrementing");
                existing.quantity = existing.quantity.checked_add(1).ok_or_else(|| {
                    warn!(cart_item_id = %existing.id, "Cart quantity at its limit");
                    DomainError::Validation("Cart quantity limit reached".to_string())
                })?;
                existing
            }
            None => CartItem {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                item_id: item_id.to_string(),
                quantity: 1,
            },
        };

        self.carts.save_cart_item(cart_item.clone()).await?;
        info!(
            cart_item_id = %cart_item.id,
            quantity = cart_item.quantity,
            "Cart updated"
        );
        Ok(cart_item)
    }

    #[instrument(skip(self, ctx))]
    pub async fn remove_from_cart(&self, ctx: &RequestContext, id: &str) -> Result<CartItem> {
        let user_id = ctx.require_user_id()?;
        let cart_item = self
            .carts
            .find_cart_item_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound("No Cart Item Found!".to_string()))?;

        if cart_item.user_id != user_id {
            warn!(cart_item_id = %id, user_id = %user_id, "Cart item belongs to another user");
            return Err(DomainError::Authorization("Item does not belong to you".to_string()).into());
        }

        let removed = self
            .carts
            .delete_cart_item(id)
            .await?
            .ok_or_else(|| DomainError::NotFound("No Cart Item Found!".to_string()))?;
        info!(cart_item_id = %removed.id, "Removed from cart");
        Ok(removed)
    }

    /// The caller's cart lines joined with their items. Lines whose item is gone are skipped.
    pub async fn cart(&self, ctx: &RequestContext) -> Result<Vec<CartItemView>> {
        let user_id = ctx.require_user_id()?;
        let mut lines = Vec::new();
        for cart_item in self.carts.list_cart_items(user_id).await? {
            match self.items.find_item_by_id(&cart_item.item_id).await? {
                Some(item) => lines.push(CartItemView {
                    id: cart_item.id,
                    quantity: cart_item.quantity,
                    item,
                }),
                None => debug!(cart_item_id = %cart_item.id, "Skipping cart line for missing item"),
            }
        }
        Ok(lines)
    }
}

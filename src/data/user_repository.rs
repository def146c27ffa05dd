use crate::domain::repository::{UserInsert, UserRepository};
use crate::domain::user::User;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

#[derive(Clone)]
pub struct InMemoryUserRepository {
    storage: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user), fields(user_id = %user.id, email = %user.email))]
    async fn create_user(&self, user: User) -> Result<UserInsert> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        if storage.values().any(|u| u.email == user.email) {
            debug!(email = %user.email, "Email already taken");
            return Ok(UserInsert::EmailTaken);
        }
        debug!(user_id = %user.id, "User created in memory storage");
        storage.insert(user.id.clone(), user);
        Ok(UserInsert::Created)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id, email = %user.email))]
    async fn save_user(&self, user: User) -> Result<()> {
        trace!("Acquiring write lock for user storage");
        let mut storage = self.storage.write().await;
        debug!(
            user_id = %user.id,
            email = %user.email,
            "User saved to memory storage"
        );
        storage.insert(user.id.clone(), user);
        Ok(())
    }

    #[instrument(skip(self), fields(email = email))]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage.values().find(|u| u.email == email).cloned();
        match &user {
            Some(u) => debug!(user_id = %u.id, "User found in storage"),
            None => trace!(email = email, "User not found in storage"),
        }
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = id))]
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        trace!("Acquiring read lock for user storage");
        let storage = self.storage.read().await;
        let user = storage.get(id).cloned();
        if user.is_none() {
            trace!(user_id = id, "User not found in storage");
        }
        Ok(user)
    }

    #[instrument(skip(self, token))]
    async fn find_user_by_reset_token(&self, token: &str) -> Result<Option<User>> {
        let storage = self.storage.read().await;
        let user = storage
            .values()
            .find(|u| u.reset.as_ref().is_some_and(|r| r.token == token))
            .cloned();
        trace!(found = user.is_some(), "Reset token lookup finished");
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<User>> {
        let storage = self.storage.read().await;
        let mut users: Vec<User> = storage.values().cloned().collect();
        users.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(users)
    }
}

use crate::domain::error::DomainError;
use crate::domain::permission::PermissionSet;
use crate::domain::user::User;

/// Per-request session state, resolved before a handler runs and passed to it explicitly.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub user: Option<User>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user: User) -> Self {
        Self {
            user_id: Some(user.id.clone()),
            user: Some(user),
        }
    }

    pub fn require_user_id(&self) -> Result<&str, DomainError> {
        self.user_id.as_deref().ok_or_else(DomainError::not_signed_in)
    }

    pub fn require_user(&self) -> Result<&User, DomainError> {
        self.user.as_ref().ok_or_else(DomainError::not_signed_in)
    }

    /// The session user's permissions, empty for anonymous requests.
    pub fn permissions(&self) -> PermissionSet {
        self.user
            .as_ref()
            .map(|u| u.permissions.clone())
            .unwrap_or_default()
    }
}

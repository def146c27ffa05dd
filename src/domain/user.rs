use crate::domain::permission::{Permission, PermissionSet};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a password reset token stays usable after it is issued.
pub const RESET_TOKEN_TTL_SECS: i64 = 3600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub permissions: PermissionSet,
    pub reset: Option<ResetToken>,
}

/// A pending password reset. Token and expiry only ever exist together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetToken {
    pub token: String,
    pub expiry: DateTime<Utc>,
}

impl ResetToken {
    pub fn issue(token: String, now: DateTime<Utc>) -> Self {
        Self {
            token,
            expiry: now + Duration::seconds(RESET_TOKEN_TTL_SECS),
        }
    }

    /// A token is live while no more than the TTL has passed since it was issued.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expiry >= now
    }
}

impl User {
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

/// What a client is allowed to see of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: String,
    pub name: String,
    pub email: String,
    pub permissions: PermissionSet,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    #[serde(default)]
    pub name: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordRequest {
    pub reset_token: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdatePermissionsRequest {
    pub permissions: Vec<Permission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub message: String,
}

impl MessagePayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_token_expires_one_hour_after_issue() {
        let now = Utc::now();
        let reset = ResetToken::issue("abc".to_string(), now);
        assert_eq!(reset.expiry - now, Duration::hours(1));
        assert!(reset.is_live(now));
        assert!(reset.is_live(now + Duration::minutes(59)));
        assert!(reset.is_live(now + Duration::hours(1)));
        assert!(!reset.is_live(now + Duration::hours(1) + Duration::seconds(1)));
    }

    #[test]
    fn test_view_hides_credentials() {
        let user = User {
            id: "u1".to_string(),
            name: "Wes".to_string(),
            email: "wes@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            permissions: [Permission::User].into_iter().collect(),
            reset: Some(ResetToken::issue("tok".to_string(), Utc::now())),
        };

        let json = serde_json::to_value(user.view()).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("reset").is_none());
        assert_eq!(json["permissions"], serde_json::json!(["USER"]));
    }
}

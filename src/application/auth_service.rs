use crate::domain::context::RequestContext;
use crate::domain::error::DomainError;
use crate::domain::permission::{Permission, PERMISSION_UPDATE_PERMISSIONS, require_permission};
use crate::domain::repository::{UserInsert, UserRepository};
use crate::domain::session::ResponseChannel;
use crate::domain::user::{
    MessagePayload, RequestResetRequest, ResetPasswordRequest, ResetToken, SigninRequest,
    SignupRequest, User, UserView,
};
use crate::infrastructure::mailer::{MailMessage, Mailer, make_a_nice_email};
use crate::infrastructure::security::{
    SessionIssuer, generate_opaque_token, hash_password, verify_password,
};
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

/// Random bytes in a password reset token.
const RESET_TOKEN_BYTES: usize = 20;

/// Where reset links point and who reset mails come from.
#[derive(Debug, Clone)]
pub struct ResetMailSettings {
    pub frontend_url: String,
    pub mail_from: String,
}

pub struct AuthService<R: UserRepository, M: Mailer> {
    user_repository: Arc<R>,
    mailer: Arc<M>,
    sessions: SessionIssuer,
    mail_settings: ResetMailSettings,
}

impl<R: UserRepository, M: Mailer> AuthService<R, M> {
    pub fn new(
        user_repository: Arc<R>,
        mailer: Arc<M>,
        sessions: SessionIssuer,
        mail_settings: ResetMailSettings,
    ) -> Self {
        Self {
            user_repository,
            mailer,
            sessions,
            mail_settings,
        }
    }

    pub fn sessions(&self) -> &SessionIssuer {
        &self.sessions
    }

    /// Builds the context for a request whose session cookie resolved to `user_id`.
    /// A token for a user that no longer exists yields an anonymous context.
    #[instrument(skip(self))]
    pub async fn resolve_context(&self, user_id: Option<String>) -> Result<RequestContext> {
        let Some(user_id) = user_id else {
            return Ok(RequestContext::anonymous());
        };
        match self.user_repository.find_user_by_id(&user_id).await? {
            Some(user) => Ok(RequestContext::for_user(user)),
            None => {
                warn!(user_id = %user_id, "Session refers to unknown user");
                Ok(RequestContext::anonymous())
            }
        }
    }

    fn issue_session(&self, user_id: &str, channel: &mut dyn ResponseChannel) -> Result<()> {
        self.sessions.issue(user_id, channel).map_err(|e| {
            error!(error = %e, "Failed to sign session token");
            DomainError::Internal(format!("Failed to generate token: {}", e))
        })?;
        Ok(())
    }

    fn hash(password: &str) -> Result<String> {
        let password_hash = hash_password(password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;
        Ok(password_hash)
    }

    #[instrument(skip(self, req, channel), fields(email = %req.email))]
    pub async fn signup(
        &self,
        req: SignupRequest,
        channel: &mut dyn ResponseChannel,
    ) -> Result<UserView> {
        trace!("Starting signup");
        let email = req.email.to_lowercase();

        if self
            .user_repository
            .find_user_by_email(&email)
            .await?
            .is_some()
        {
            warn!(email = %email, "User already exists");
            return Err(
                DomainError::Validation("User with this email already exists".to_string()).into(),
            );
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            name: req.name,
            email,
            password_hash: Self::hash(&req.password)?,
            permissions: [Permission::User].into_iter().collect(),
            reset: None,
        };

        debug!(user_id = %user.id, "Saving user to repository");
        if self.user_repository.create_user(user.clone()).await? == UserInsert::EmailTaken {
            warn!(email = %user.email, "User already exists");
            return Err(
                DomainError::Validation("User with this email already exists".to_string()).into(),
            );
        }
        self.issue_session(&user.id, channel)?;

        info!(user_id = %user.id, email = %user.email, "User signed up");
        Ok(user.view())
    }

    #[instrument(skip(self, req, channel), fields(email = %req.email))]
    pub async fn signin(
        &self,
        req: SigninRequest,
        channel: &mut dyn ResponseChannel,
    ) -> Result<UserView> {
        trace!("Starting signin");
        let email = req.email.to_lowercase();

        let user = self
            .user_repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "User not found during signin");
                DomainError::Authentication(format!("No such user found for email {}", email))
            })?;

        if !verify_password(&req.password, &user.password_hash) {
            warn!(user_id = %user.id, "Invalid password during signin");
            return Err(DomainError::Authentication("Invalid password".to_string()).into());
        }

        self.issue_session(&user.id, channel)?;

        info!(user_id = %user.id, email = %user.email, "Signin successful");
        Ok(user.view())
    }

    #[instrument(skip(self, channel))]
    pub fn signout(&self, channel: &mut dyn ResponseChannel) -> MessagePayload {
        self.sessions.revoke(channel);
        info!("User signed out");
        MessagePayload::new("successfully logged out")
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn request_reset(&self, req: RequestResetRequest) -> Result<MessagePayload> {
        let email = req.email.to_lowercase();
        let mut user = self
            .user_repository
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| {
                warn!(email = %email, "Reset requested for unknown email");
                DomainError::NotFound(format!("No such user found for email {}", email))
            })?;

        let reset = ResetToken::issue(generate_opaque_token(RESET_TOKEN_BYTES), Utc::now());
        let link = format!(
            "{}/reset?resetToken={}",
            self.mail_settings.frontend_url, reset.token
        );
        user.reset = Some(reset);
        self.user_repository.save_user(user.clone()).await?;
        debug!(user_id = %user.id, "Reset token stored");

        let delivery = self
            .mailer
            .send_mail(MailMessage {
                from: self.mail_settings.mail_from.clone(),
                to: user.email.clone(),
                subject: "Your Password Reset Token".to_string(),
                html_body: make_a_nice_email(&format!(
                    "Your Password Reset Token is here!\n\n<a href=\"{}\">Click Here to Reset</a>",
                    link
                )),
            })
            .await?;

        info!(
            user_id = %user.id,
            message_id = %delivery.message_id,
            "Password reset mail sent"
        );
        Ok(MessagePayload::new("success"))
    }

    #[instrument(skip(self, req, channel))]
    pub async fn reset_password(
        &self,
        req: ResetPasswordRequest,
        channel: &mut dyn ResponseChannel,
    ) -> Result<UserView> {
        if req.password != req.confirm_password {
            warn!("Password confirmation mismatch");
            return Err(DomainError::Validation("Passwords do not match".to_string()).into());
        }

        let now = Utc::now();
        let mut user = self
            .user_repository
            .find_user_by_reset_token(&req.reset_token)
            .await?
            .filter(|u| u.reset.as_ref().is_some_and(|r| r.is_live(now)))
            .ok_or_else(|| {
                warn!("Invalid or expired reset token presented");
                DomainError::Authentication("Invalid or expired reset token".to_string())
            })?;

        user.password_hash = Self::hash(&req.password)?;
        user.reset = None;
        self.user_repository.save_user(user.clone()).await?;
        self.issue_session(&user.id, channel)?;

        info!(user_id = %user.id, "Password reset completed");
        Ok(user.view())
    }

    #[instrument(skip(self, ctx, permissions), fields(target_user_id = target_user_id))]
    pub async fn update_permissions(
        &self,
        ctx: &RequestContext,
        target_user_id: &str,
        permissions: Vec<Permission>,
    ) -> Result<UserView> {
        let caller_id = ctx.require_user_id()?;
        let caller = self
            .user_repository
            .find_user_by_id(caller_id)
            .await?
            .ok_or_else(DomainError::not_signed_in)?;
        require_permission(&caller.permissions, PERMISSION_UPDATE_PERMISSIONS).map_err(|e| {
            warn!(caller_id = %caller.id, "Permission update refused");
            e
        })?;

        let mut target = self
            .user_repository
            .find_user_by_id(target_user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("User not found: {}", target_user_id)))?;

        target.permissions = permissions.into_iter().collect();
        self.user_repository.save_user(target.clone()).await?;

        info!(
            caller_id = %caller.id,
            target_user_id = %target.id,
            permissions = ?target.permissions,
            "Permissions updated"
        );
        Ok(target.view())
    }

    pub fn me(&self, ctx: &RequestContext) -> Option<UserView> {
        ctx.user.as_ref().map(User::view)
    }

    #[instrument(skip(self, ctx))]
    pub async fn users(&self, ctx: &RequestContext) -> Result<Vec<UserView>> {
        let user = ctx.require_user()?;
        require_permission(&user.permissions, PERMISSION_UPDATE_PERMISSIONS)?;
        let users = self.user_repository.list_users().await?;
        Ok(users.iter().map(User::view).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::user_repository::InMemoryUserRepository;
    use crate::domain::permission::PermissionSet;
    use crate::domain::session::{CookieJar, SESSION_COOKIE};
    use crate::infrastructure::mailer::LogMailer;
    use chrono::Duration;

    type TestService = AuthService<InMemoryUserRepository, LogMailer>;

    fn setup() -> (TestService, Arc<InMemoryUserRepository>, Arc<LogMailer>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let mailer = Arc::new(LogMailer::new());
        let service = AuthService::new(
            repo.clone(),
            mailer.clone(),
            SessionIssuer::new("auth-service-test-secret").unwrap(),
            ResetMailSettings {
                frontend_url: "http://localhost:7777".to_string(),
                mail_from: "shop@example.com".to_string(),
            },
        );
        (service, repo, mailer)
    }

    fn domain_error(err: anyhow::Error) -> DomainError {
        err.downcast::<DomainError>().expect("domain error")
    }

    async fn signup(service: &TestService, email: &str, password: &str) -> UserView {
        let mut jar = CookieJar::new();
        service
            .signup(
                SignupRequest {
                    email: email.to_string(),
                    name: "Tester".to_string(),
                    password: password.to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_signup_lowercases_email_and_hashes_password() {
        let (service, repo, _) = setup();
        let mut jar = CookieJar::new();

        let view = service
            .signup(
                SignupRequest {
                    email: "A@B.com".to_string(),
                    name: "A".to_string(),
                    password: "p1".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap();

        assert_eq!(view.email, "a@b.com");
        assert_eq!(
            view.permissions,
            [Permission::User].into_iter().collect::<PermissionSet>()
        );

        let stored = repo.find_user_by_id(&view.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "p1");
        assert!(verify_password("p1", &stored.password_hash));

        let token = jar.value_of(SESSION_COOKIE).unwrap();
        assert_eq!(service.sessions().validate(token).unwrap(), view.id);
    }

    #[tokio::test]
    async fn test_signup_rejects_duplicate_email_case_insensitively() {
        let (service, _, _) = setup();
        signup(&service, "dup@example.com", "pw").await;

        let mut jar = CookieJar::new();
        let err = service
            .signup(
                SignupRequest {
                    email: "DUP@example.com".to_string(),
                    name: String::new(),
                    password: "pw".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();

        assert!(matches!(domain_error(err), DomainError::Validation(_)));
        assert!(jar.directives().is_empty());
    }

    #[test]
    fn test_parallel_signups_with_same_email_store_one_user() {
        let (service, repo, _) = setup();

        let outcomes: Vec<bool> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let service = &service;
                    scope.spawn(move || {
                        let runtime = tokio::runtime::Builder::new_current_thread()
                            .enable_all()
                            .build()
                            .unwrap();
                        runtime.block_on(async {
                            let mut jar = CookieJar::new();
                            service
                                .signup(
                                    SignupRequest {
                                        email: "race@example.com".to_string(),
                                        name: String::new(),
                                        password: "pw".to_string(),
                                    },
                                    &mut jar,
                                )
                                .await
                                .is_ok()
                        })
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let users = runtime.block_on(repo.list_users()).unwrap();
        assert_eq!(
            users.iter().filter(|u| u.email == "race@example.com").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_signin_scenario() {
        let (service, _, _) = setup();
        let created = signup(&service, "A@B.com", "p1").await;

        let mut jar = CookieJar::new();
        let view = service
            .signin(
                SigninRequest {
                    email: "a@b.com".to_string(),
                    password: "p1".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap();
        assert_eq!(view.id, created.id);
        let token = jar.value_of(SESSION_COOKIE).unwrap();
        assert_eq!(service.sessions().validate(token).unwrap(), created.id);

        let mut jar = CookieJar::new();
        let err = service
            .signin(
                SigninRequest {
                    email: "a@b.com".to_string(),
                    password: "wrongpass".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();
        assert_eq!(
            domain_error(err),
            DomainError::Authentication("Invalid password".to_string())
        );
        assert!(jar.directives().is_empty());
    }

    #[tokio::test]
    async fn test_signin_unknown_user() {
        let (service, _, _) = setup();
        let mut jar = CookieJar::new();

        let err = service
            .signin(
                SigninRequest {
                    email: "ghost@example.com".to_string(),
                    password: "pw".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();

        let err = domain_error(err);
        assert!(matches!(err, DomainError::Authentication(_)));
        assert!(err.to_string().contains("No such user"));
    }

    #[tokio::test]
    async fn test_signout_clears_cookie() {
        let (service, _, _) = setup();
        let mut jar = CookieJar::new();
        let payload = service.signout(&mut jar);
        assert_eq!(payload.message, "successfully logged out");
        assert_eq!(jar.value_of(SESSION_COOKIE), None);
        assert_eq!(jar.directives().len(), 1);
    }

    #[tokio::test]
    async fn test_request_reset_stores_token_and_mails_link() {
        let (service, repo, mailer) = setup();
        let user = signup(&service, "reset@example.com", "old").await;

        let payload = service
            .request_reset(RequestResetRequest {
                email: "reset@example.com".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(payload.message, "success");

        let stored = repo.find_user_by_id(&user.id).await.unwrap().unwrap();
        let reset = stored.reset.unwrap();
        assert_eq!(reset.token.len(), 40);
        assert!(reset.expiry > Utc::now() + Duration::minutes(59));

        let sent = mailer.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "reset@example.com");
        assert_eq!(sent[0].from, "shop@example.com");
        assert!(sent[0].html_body.contains(&format!(
            "http://localhost:7777/reset?resetToken={}",
            reset.token
        )));
    }

    #[tokio::test]
    async fn test_request_reset_unknown_email() {
        let (service, _, mailer) = setup();
        let err = service
            .request_reset(RequestResetRequest {
                email: "ghost@example.com".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(domain_error(err), DomainError::NotFound(_)));
        assert!(mailer.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let (service, repo, _) = setup();
        let user = signup(&service, "flow@example.com", "old").await;
        service
            .request_reset(RequestResetRequest {
                email: "flow@example.com".to_string(),
            })
            .await
            .unwrap();
        let token = repo
            .find_user_by_id(&user.id)
            .await
            .unwrap()
            .unwrap()
            .reset
            .unwrap()
            .token;

        let mut jar = CookieJar::new();
        let view = service
            .reset_password(
                ResetPasswordRequest {
                    reset_token: token.clone(),
                    password: "new".to_string(),
                    confirm_password: "new".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap();
        assert_eq!(view.id, user.id);
        assert!(jar.value_of(SESSION_COOKIE).is_some());

        let stored = repo.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(stored.reset.is_none());
        assert!(verify_password("new", &stored.password_hash));
        assert!(!verify_password("old", &stored.password_hash));

        // single use
        let mut jar = CookieJar::new();
        let err = service
            .reset_password(
                ResetPasswordRequest {
                    reset_token: token,
                    password: "newer".to_string(),
                    confirm_password: "newer".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();
        assert!(matches!(domain_error(err), DomainError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_mismatched_confirmation() {
        let (service, _, _) = setup();
        let mut jar = CookieJar::new();
        let err = service
            .reset_password(
                ResetPasswordRequest {
                    reset_token: "whatever".to_string(),
                    password: "a".to_string(),
                    confirm_password: "b".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();
        assert!(matches!(domain_error(err), DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_reset_password_rejects_expired_token() {
        let (service, repo, _) = setup();
        let user = signup(&service, "late@example.com", "old").await;
        let mut stored = repo.find_user_by_id(&user.id).await.unwrap().unwrap();
        stored.reset = Some(ResetToken::issue(
            "stale".to_string(),
            Utc::now() - Duration::minutes(61),
        ));
        repo.save_user(stored).await.unwrap();

        let mut jar = CookieJar::new();
        let err = service
            .reset_password(
                ResetPasswordRequest {
                    reset_token: "stale".to_string(),
                    password: "new".to_string(),
                    confirm_password: "new".to_string(),
                },
                &mut jar,
            )
            .await
            .unwrap_err();

        assert_eq!(
            domain_error(err),
            DomainError::Authentication("Invalid or expired reset token".to_string())
        );
        let stored = repo.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert!(verify_password("old", &stored.password_hash));
        assert!(stored.reset.is_some());
    }

    #[tokio::test]
    async fn test_update_permissions_requires_admin() {
        let (service, repo, _) = setup();
        let caller = signup(&service, "caller@example.com", "pw").await;
        let target = signup(&service, "target@example.com", "pw").await;
        let ctx = service.resolve_context(Some(caller.id.clone())).await.unwrap();

        let err = service
            .update_permissions(&ctx, &target.id, vec![Permission::Admin])
            .await
            .unwrap_err();
        assert!(matches!(domain_error(err), DomainError::Authorization(_)));

        let mut admin = repo.find_user_by_id(&caller.id).await.unwrap().unwrap();
        admin.permissions.insert(Permission::PermissionUpdate);
        repo.save_user(admin).await.unwrap();

        let updated = service
            .update_permissions(
                &ctx,
                &target.id,
                vec![Permission::ItemCreate, Permission::ItemDelete],
            )
            .await
            .unwrap();
        // overwritten, not merged
        assert_eq!(
            updated.permissions,
            [Permission::ItemCreate, Permission::ItemDelete]
                .into_iter()
                .collect::<PermissionSet>()
        );
    }

    #[tokio::test]
    async fn test_update_permissions_requires_session() {
        let (service, _, _) = setup();
        let err = service
            .update_permissions(&RequestContext::anonymous(), "anyone", vec![])
            .await
            .unwrap_err();
        assert!(matches!(domain_error(err), DomainError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_me_and_users() {
        let (service, repo, _) = setup();
        let user = signup(&service, "me@example.com", "pw").await;

        assert!(service.me(&RequestContext::anonymous()).is_none());
        let ctx = service.resolve_context(Some(user.id.clone())).await.unwrap();
        assert_eq!(service.me(&ctx).unwrap().email, "me@example.com");

        let err = service.users(&ctx).await.unwrap_err();
        assert!(matches!(domain_error(err), DomainError::Authorization(_)));

        let mut admin = repo.find_user_by_id(&user.id).await.unwrap().unwrap();
        admin.permissions.insert(Permission::Admin);
        repo.save_user(admin).await.unwrap();
        let ctx = service.resolve_context(Some(user.id)).await.unwrap();
        assert_eq!(service.users(&ctx).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolve_context_for_unknown_user_is_anonymous() {
        let (service, _, _) = setup();
        let ctx = service
            .resolve_context(Some("deleted-user".to_string()))
            .await
            .unwrap();
        assert!(ctx.user_id.is_none());
    }
}

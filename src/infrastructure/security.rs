use crate::domain::session::{CookieOptions, ResponseChannel, SESSION_COOKIE, SESSION_MAX_AGE};
use crate::infrastructure::config::ConfigError;
use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

// Argon2 parameters for 50-150ms target latency
const ARGON2_M_COST: u32 = 19456; // 19 MB
const ARGON2_T_COST: u32 = 2; // 2 iterations
const ARGON2_P_COST: u32 = 1; // 1 parallelism

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String, // user_id
    exp: usize,
    iat: usize,
}

fn hasher() -> Result<Argon2<'static>, argon2::password_hash::Error> {
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon2::Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, None)
            .map_err(argon2::password_hash::Error::from)?,
    ))
}

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = hasher()?.hash_password(password.as_bytes(), &salt)?;
    Ok(password_hash.to_string())
}

/// Checks `password` against a stored PHC hash. A malformed hash simply doesn't match.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed_hash) = PasswordHash::new(hash) else {
        return false;
    };
    let Ok(argon2) = hasher() else {
        return false;
    };
    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// `byte_len` bytes from the OS CSPRNG, hex encoded.
pub fn generate_opaque_token(byte_len: usize) -> String {
    let mut bytes = vec![0u8; byte_len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mints and checks signed session tokens and hands them to the client as a cookie.
#[derive(Clone)]
pub struct SessionIssuer {
    secret: String,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer").finish_non_exhaustive()
    }
}

impl SessionIssuer {
    pub fn new(secret: impl Into<String>) -> Result<Self, ConfigError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(ConfigError::Missing("APP_SECRET"));
        }
        Ok(Self { secret })
    }

    pub fn sign(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now().timestamp().max(0) as usize;
        let exp = now + SESSION_MAX_AGE.as_secs() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp,
            iat: now,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_ref()),
        )
    }

    /// Signs a token for `user_id` and attaches it to the outbound channel.
    #[instrument(skip(self, channel))]
    pub fn issue(
        &self,
        user_id: &str,
        channel: &mut dyn ResponseChannel,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let token = self.sign(user_id)?;
        channel.set_cookie(
            SESSION_COOKIE,
            &token,
            CookieOptions {
                http_only: true,
                max_age: SESSION_MAX_AGE,
            },
        );
        debug!(user_id = user_id, "Session cookie attached");
        Ok(token)
    }

    pub fn revoke(&self, channel: &mut dyn ResponseChannel) {
        channel.clear_cookie(SESSION_COOKIE);
        debug!("Session cookie cleared");
    }

    /// Returns the user id carried by a valid token.
    pub fn validate(&self, token: &str) -> Result<String, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 60; // 60 seconds leeway

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_ref()),
            &validation,
        )?;

        Ok(token_data.claims.sub)
    }
}

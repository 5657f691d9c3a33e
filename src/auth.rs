//! Session verification for the persistence routes.
//!
//! Tokens look like `<user uuid>.<hex tag>`, where the tag is an HMAC-SHA256
//! of the user id keyed by the session secret. Whoever holds the secret (the
//! sign-in flow) mints them; this service only checks them.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::AppError;
use crate::routes::AppState;

pub(crate) type HmacSha256 = Hmac<Sha256>;

/// A MAC keyed by `secret` with `domain` already absorbed, so tags minted for
/// one purpose never verify for another.
pub(crate) fn keyed_mac(secret: &str, domain: &[u8]) -> HmacSha256 {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(domain);
    mac
}

#[derive(Debug, Clone)]
pub struct SessionKeys {
    secret: String,
}

impl SessionKeys {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, user_id: Uuid) -> String {
        format!("{}.{}", user_id, self.tag(user_id))
    }

    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let (user, tag) = token.trim().split_once('.')?;
        let user_id = Uuid::parse_str(user).ok()?;
        let tag = hex::decode(tag).ok()?;
        self.mac(user_id).verify_slice(&tag).ok()?;
        Some(user_id)
    }

    fn tag(&self, user_id: Uuid) -> String {
        hex::encode(self.mac(user_id).finalize().into_bytes())
    }

    fn mac(&self, user_id: Uuid) -> HmacSha256 {
        let mut mac = keyed_mac(&self.secret, b"session\n");
        mac.update(user_id.as_bytes());
        mac
    }
}

/// The authenticated caller. Extracting it rejects with 401 when there is no
/// valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for User {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = state
            .sessions
            .as_ref()
            .ok_or(AppError::NotConfigured("SESSION_SECRET"))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or(AppError::Unauthenticated)?;

        keys.verify(token)
            .map(|id| User { id })
            .ok_or(AppError::Unauthenticated)
    }
}

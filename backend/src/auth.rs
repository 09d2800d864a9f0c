use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use ring::hmac;

use crate::error::ApiError;
use crate::utils::Config;

/// Issues the bearer token for a user id: `<userId>.<hex(HMAC-SHA256)>`.
/// Account provisioning lives elsewhere; this helper exists for the client
/// library and for tests.
pub fn sign_user_token(secret: &str, user_id: &str) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    let tag = hmac::sign(&key, user_id.as_bytes());
    format!("{}.{}", user_id, hex::encode(tag.as_ref()))
}

/// Checks the signature against the shared secret and returns the embedded
/// user id. The id may itself contain dots; the signature is always the last
/// segment.
pub fn verify_user_token(secret: &str, token: &str) -> Option<String> {
    let (user_id, signature_hex) = token.rsplit_once('.')?;
    if user_id.is_empty() {
        return None;
    }
    let signature = hex::decode(signature_hex).ok()?;
    let key = hmac::Key::new(hmac::HMAC_SHA256, secret.as_bytes());
    hmac::verify(&key, user_id.as_bytes(), &signature).ok()?;
    Some(user_id.to_string())
}

/// The authenticated caller, extracted from `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    Config: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Config::from_ref(state);

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        let user_id =
            verify_user_token(&config.auth_secret, token).ok_or(ApiError::Unauthorized)?;

        Ok(AuthUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips() {
        let token = sign_user_token("secret", "u1");
        assert_eq!(verify_user_token("secret", &token), Some("u1".to_string()));
    }

    #[test]
    fn user_id_with_dots_survives() {
        let token = sign_user_token("secret", "user.one");
        assert_eq!(
            verify_user_token("secret", &token),
            Some("user.one".to_string())
        );
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = sign_user_token("secret", "u1");
        let forged = token.replacen("u1.", "u2.", 1);
        assert_eq!(verify_user_token("secret", &forged), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = sign_user_token("secret", "u1");
        assert_eq!(verify_user_token("other", &token), None);
    }

    #[test]
    fn malformed_tokens_are_rejected() {
        assert_eq!(verify_user_token("secret", ""), None);
        assert_eq!(verify_user_token("secret", "no-signature"), None);
        assert_eq!(verify_user_token("secret", ".deadbeef"), None);
        assert_eq!(verify_user_token("secret", "u1.not-hex"), None);
    }
}

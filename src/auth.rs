//! Identity boundary.
//!
//! Token issuance lives in a separate identity service; this module only
//! validates bearer tokens and hands the authenticated user id to handlers.
//! The checkout core trusts this value and nothing else from the request.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{errors::ServiceError, AppState};

/// Claims carried by tokens from the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: String,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// The authenticated user id, extracted from a `Bearer` token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

pub fn validate_token(token: &str, secret: &str) -> Result<Claims, ServiceError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {}", e)))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))?;

        let claims = validate_token(token, &state.config.jwt_secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ServiceError::Unauthorized("malformed subject claim".to_string()))?;

        Ok(AuthenticatedUser(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "test_jwt_secret_for_auth_unit_tests";

    fn mint(sub: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now,
            exp: now + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("token encodes")
    }

    #[test]
    fn valid_token_round_trips() {
        let user = Uuid::new_v4();
        let token = mint(&user.to_string(), 3600);
        let claims = validate_token(&token, SECRET).expect("token validates");
        assert_eq!(claims.sub, user.to_string());
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = mint(&Uuid::new_v4().to_string(), -3600);
        assert!(validate_token(&token, SECRET).is_err());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint(&Uuid::new_v4().to_string(), 3600);
        assert!(validate_token(&token, "a_different_secret_entirely").is_err());
    }
}

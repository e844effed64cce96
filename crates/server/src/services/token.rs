//! Bearer token issuance and validation (HS256 JWT).
//!
//! Tokens carry three identity claims, using the short claim names that
//! existing API clients read:
//!
//! - `nameid` - user id
//! - `unique_name` - user name
//! - `email` - email address
//!
//! plus the registered `iss`, `aud`, `iat`, `nbf` and `exp` claims.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use product_catalog_core::Email;

use crate::config::JwtConfig;
use crate::models::CurrentUser;

/// Errors that can occur while issuing or validating tokens.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Signing failed.
    #[error("failed to sign token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),

    /// Signature, issuer, audience or lifetime check failed.
    #[error("invalid token: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Claims verified but do not describe a user.
    #[error("malformed claims: {0}")]
    MalformedClaims(String),
}

/// Claim set of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub nameid: String,
    pub unique_name: String,
    pub email: String,
    pub iss: String,
    pub aud: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    /// Rebuild the caller identity from verified claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::MalformedClaims` if the user id or email is invalid.
    pub fn current_user(&self) -> Result<CurrentUser, TokenError> {
        let id = self
            .nameid
            .parse()
            .map_err(|e| TokenError::MalformedClaims(format!("nameid: {e}")))?;
        let email = Email::parse(&self.email)
            .map_err(|e| TokenError::MalformedClaims(format!("email: {e}")))?;

        Ok(CurrentUser {
            id,
            user_name: self.unique_name.clone(),
            email,
        })
    }
}

/// A freshly minted token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens with one symmetric key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    lifetime: Duration,
}

impl TokenIssuer {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let key = config.key.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime: Duration::minutes(config.duration_minutes),
        }
    }

    /// Issue a token for `user`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue(&self, user: &CurrentUser) -> Result<IssuedToken, TokenError> {
        self.issue_at(user, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Encode` if signing fails.
    pub fn issue_at(
        &self,
        user: &CurrentUser,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let expires_at = now + self.lifetime;
        let claims = Claims {
            nameid: user.id.to_string(),
            unique_name: user.user_name.clone(),
            email: user.email.to_string(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(TokenError::Encode)?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify signature, issuer, audience and lifetime, returning the claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for any failed check.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(TokenError::Invalid)
    }
}

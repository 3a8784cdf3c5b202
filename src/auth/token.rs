//! Signed credential issuance and verification.
//!
//! Credentials are HS256 JWTs carrying the caller's id in a `userId` claim.
//! Verification is stateless: it depends only on the token and the server
//! secret held in [`TokenKeys`].

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::extractors::CallerId;

const ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject. Optional on the wire so a well-signed token of the wrong
    /// shape decodes and is rejected explicitly.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("signature mismatch")]
    BadSignature,

    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token has no subject")]
    MissingSubject,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            _ => TokenError::Malformed(e.to_string()),
        }
    }
}

/// Key material for one server process. Immutable after construction.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    validity: Duration,
}

impl TokenKeys {
    pub fn from_secret(secret: &[u8], validity_hours: u64) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            validity: Duration::hours(validity_hours as i64),
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Issue a credential for `user_id`, valid for the configured window.
    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: Some(user_id.to_string()),
            iat: now.timestamp(),
            exp: (now + self.validity).timestamp(),
        };
        self.sign(&claims)
    }

    pub fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, then extract the caller id.
    pub fn verify(&self, token: &str) -> Result<CallerId, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;

        match data.claims.user_id {
            Some(id) if !id.trim().is_empty() => Ok(CallerId(id)),
            _ => Err(TokenError::MissingSubject),
        }
    }
}

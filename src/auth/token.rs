use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::{Error, Result};

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issues and verifies the signed session tokens. Stateless: there is
/// no revocation list, expiry is the only invalidation mechanism.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    pub fn from_secret(secret: &str, ttl_secs: i64) -> Result<Self> {
        if secret.len() < 32 {
            return Err(Error::Internal(
                "JWT secret must be at least 32 characters".into(),
            ));
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        self.issue_with_ttl(user_id, self.ttl)
    }

    fn issue_with_ttl(&self, user_id: Uuid, ttl: Duration) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| Error::Internal(format!("failed to encode token: {e}")))
    }

    /// Signature check first, then expiry. Anything malformed or
    /// tampered fails as `InvalidToken`; only a genuinely expired
    /// signature reports `TokenExpired`.
    pub fn verify(&self, token: &str) -> Result<Uuid> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => Error::TokenExpired,
                _ => Error::InvalidToken,
            }
        })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| Error::InvalidToken)
    }
}

//! Shared-credential authentication for node-to-node admin RPC
//!
//! Every node in a cluster is configured with the same access/secret key
//! pair. A caller signs a short-lived HS256 JWT with the secret key and the
//! access key as subject; the receiver verifies it with its own copy.

use crate::common::{Error, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifetime of an RPC token, in seconds
pub const RPC_TOKEN_EXPIRY_SECS: u64 = 15 * 60;

/// Cluster-wide credential pair
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (access key)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Issued at (Unix timestamp)
    pub iat: u64,
}

impl Credential {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Issue a token for one outgoing call.
    pub fn issue_token(&self) -> Result<String> {
        let now = unix_now()?;
        let claims = Claims {
            sub: self.access_key.clone(),
            exp: now + RPC_TOKEN_EXPIRY_SECS,
            iat: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret_key.as_bytes()),
        )?;
        Ok(token)
    }

    /// Verify a token presented by a peer.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret_key.as_bytes()),
            &validation,
        )?;
        if data.claims.sub != self.access_key {
            return Err(Error::RpcAuth("access key mismatch".into()));
        }
        Ok(data.claims)
    }

    /// Authenticate from an Authorization header value ("Bearer <token>").
    pub fn authenticate(&self, auth_header: &str) -> Result<Claims> {
        match auth_header.split_once(' ') {
            Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
                self.verify_token(token.trim())
            }
            Some((scheme, _)) => Err(Error::RpcAuth(format!("Unknown auth scheme: {}", scheme))),
            None => Err(Error::RpcAuth(
                "Invalid Authorization header format".into(),
            )),
        }
    }
}

fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| Error::Internal(e.to_string()))
}

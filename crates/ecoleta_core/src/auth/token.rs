//! Signed access tokens bound to a point id.
//!
//! Tokens use the compact `header.claims.signature` form with HMAC-SHA256
//! (HS256), each segment base64url-encoded without padding. Clients treat
//! them as opaque.

use crate::model::point::PointId;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Default token lifetime: one day.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Shortest accepted signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

const HEADER: &str = r#"{"alg":"HS256","typ":"JWT"}"#;

type HmacSha256 = Hmac<Sha256>;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Point the token is bound to.
    pub sub: PointId,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Errors from token issuance and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signing secret is shorter than `MIN_SECRET_LEN`.
    WeakSecret,
    /// Token is not three base64url segments with a JSON claims body.
    Malformed,
    /// Signature does not match the claims.
    BadSignature,
    Expired,
    /// System clock is before the Unix epoch.
    Clock,
}

impl Display for TokenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeakSecret => write!(
                f,
                "token secret must be at least {MIN_SECRET_LEN} bytes long"
            ),
            Self::Malformed => write!(f, "malformed access token"),
            Self::BadSignature => write!(f, "invalid access token signature"),
            Self::Expired => write!(f, "access token expired"),
            Self::Clock => write!(f, "system clock is before the unix epoch"),
        }
    }
}

impl Error for TokenError {}

/// Issues and verifies access tokens.
pub trait AccessTokenIssuer: Send + Sync {
    fn issue(&self, point_id: PointId) -> Result<String, TokenError>;
    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

/// HS256 token issuer keyed by a shared secret.
pub struct HmacTokenIssuer {
    key: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for HmacTokenIssuer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacTokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl HmacTokenIssuer {
    pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, TokenError> {
        let key = secret.as_ref();
        if key.len() < MIN_SECRET_LEN {
            return Err(TokenError::WeakSecret);
        }
        Ok(Self {
            key: key.to_vec(),
            ttl,
        })
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        <HmacSha256 as Mac>::new_from_slice(&self.key).map_err(|_| TokenError::WeakSecret)
    }

    fn sign_claims(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        let claims_json = serde_json::to_vec(claims).map_err(|_| TokenError::Malformed)?;
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(HEADER),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();

        Ok(format!(
            "{signing_input}.{}",
            URL_SAFE_NO_PAD.encode(signature)
        ))
    }
}

impl AccessTokenIssuer for HmacTokenIssuer {
    fn issue(&self, point_id: PointId) -> Result<String, TokenError> {
        let iat = unix_now()?;
        let claims = AccessClaims {
            sub: point_id,
            iat,
            exp: iat.saturating_add(self.ttl.as_secs()),
        };
        self.sign_claims(&claims)
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut segments = token.split('.');
        let (Some(header), Some(claims), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(TokenError::Malformed);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| TokenError::Malformed)?;
        let mut mac = self.mac()?;
        mac.update(header.as_bytes());
        mac.update(b".");
        mac.update(claims.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let header = URL_SAFE_NO_PAD
            .decode(header)
            .map_err(|_| TokenError::Malformed)?;
        if header != HEADER.as_bytes() {
            return Err(TokenError::Malformed);
        }

        let claims = URL_SAFE_NO_PAD
            .decode(claims)
            .map_err(|_| TokenError::Malformed)?;
        let claims: AccessClaims =
            serde_json::from_slice(&claims).map_err(|_| TokenError::Malformed)?;
        if claims.exp <= unix_now()? {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| TokenError::Clock)
}

#[cfg(test)]
mod tests {
    use super::{AccessClaims, AccessTokenIssuer, HmacTokenIssuer, TokenError, DEFAULT_TOKEN_TTL};
    use std::time::Duration;

    const SECRET: &str = "unit-test-secret-0123456789";

    #[test]
    fn issued_token_verifies_to_point_id() {
        let issuer = HmacTokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL).unwrap();
        let token = issuer.issue(42).unwrap();

        assert_eq!(token.split('.').count(), 3);
        let claims = issuer.verify(&token).unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.exp - claims.iat, DEFAULT_TOKEN_TTL.as_secs());
    }

    #[test]
    fn token_from_other_secret_is_rejected() {
        let issuer = HmacTokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL).unwrap();
        let other = HmacTokenIssuer::new("another-secret-abcdefghij", DEFAULT_TOKEN_TTL).unwrap();
        let token = other.issue(7).unwrap();

        assert_eq!(issuer.verify(&token), Err(TokenError::BadSignature));
    }

    #[test]
    fn tampered_claims_are_rejected() {
        let issuer = HmacTokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL).unwrap();
        let token = issuer.issue(1).unwrap();
        let forged = issuer
            .sign_claims(&AccessClaims {
                sub: 2,
                iat: 0,
                exp: u64::MAX,
            })
            .unwrap();
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = forged.split('.').nth(1).unwrap();
        parts[1] = forged_claims;

        assert_eq!(issuer.verify(&parts.join(".")), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_and_malformed_tokens_are_rejected() {
        let issuer = HmacTokenIssuer::new(SECRET, Duration::ZERO).unwrap();
        let token = issuer.issue(3).unwrap();
        assert_eq!(issuer.verify(&token), Err(TokenError::Expired));

        assert_eq!(issuer.verify("not-a-token"), Err(TokenError::Malformed));
        assert_eq!(issuer.verify("a.b.c.d"), Err(TokenError::Malformed));
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(matches!(
            HmacTokenIssuer::new("short", DEFAULT_TOKEN_TTL),
            Err(TokenError::WeakSecret)
        ));
    }
}

use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::ClientError;

/// Seconds of clock skew tolerated when checking `exp`.
pub const EXPIRY_LEEWAY_SECS: i64 = 30;

/// The subset of identity-token claims the client looks at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    /// Firebase duplicates the uid here.
    #[serde(default)]
    pub user_id: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl IdTokenClaims {
    pub fn uid(&self) -> &str {
        self.user_id.as_deref().unwrap_or(&self.sub)
    }

    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.exp + EXPIRY_LEEWAY_SECS <= now.unix_timestamp()
    }
}

/// Reads the claims without checking the signature. The backend performs
/// the real verification; this only lets the client skip a round trip for
/// tokens that are malformed or already expired.
pub fn peek_claims(token: &str) -> Result<IdTokenClaims, ClientError> {
    let header = decode_header(token)?;
    let mut validation = Validation::new(header.alg);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    let data = decode::<IdTokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
    debug!(uid = %data.claims.uid(), exp = data.claims.exp, "identity token decoded");
    Ok(data.claims)
}

/// Decodes the token and fails with `ExpiredToken` if `exp` has passed.
pub fn ensure_fresh(token: &str, now: OffsetDateTime) -> Result<IdTokenClaims, ClientError> {
    let claims = peek_claims(token)?;
    if claims.is_expired_at(now) {
        return Err(ClientError::ExpiredToken);
    }
    Ok(claims)
}

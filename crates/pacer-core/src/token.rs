//! Bearer tokens for authenticated API access.
//!
//! A token is `pacer_ut_<user_id>_<signature>` where the signature is
//! HMAC-SHA256 over the decimal user id, hex encoded. The server can
//! authenticate a request from the token string alone, so there is no
//! session table to consult or expire.

use std::fmt;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Marker every pacer user token starts with.
const TOKEN_PREFIX: &str = "pacer_ut_";

/// Environment variable holding the hex-encoded signing key.
pub const TOKEN_SECRET_ENV: &str = "PACER_TOKEN_SECRET";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The token does not have the `pacer_ut_<id>_<signature>` shape.
    #[error("malformed token: {0}")]
    Malformed(&'static str),

    /// The id segment is not a decimal i64.
    #[error("unusable user id in token: {0}")]
    BadUserId(#[from] std::num::ParseIntError),

    /// A segment that should be hex is not.
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// The signature does not match the id segment.
    #[error("token signature mismatch")]
    BadSignature,

    /// No signing key was configured.
    #[error("{TOKEN_SECRET_ENV} is not set")]
    MissingSecret,
}

/// Signs and verifies user tokens with a shared HMAC key.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: Vec<u8>) -> Self {
        Self { secret }
    }

    /// Build a signer from `PACER_TOKEN_SECRET`.
    ///
    /// The value is hex, as written by `pacer init`. Trailing whitespace is
    /// tolerated so `export PACER_TOKEN_SECRET=$(...)` works as expected.
    pub fn from_env() -> Result<Self, TokenError> {
        let hex_key = std::env::var(TOKEN_SECRET_ENV).map_err(|_| TokenError::MissingSecret)?;
        let secret = hex::decode(hex_key.trim())?;
        Ok(Self::new(secret))
    }

    /// Mint the token for a user id.
    pub fn mint(&self, user_id: i64) -> String {
        let signature = self.mac_for(user_id).finalize().into_bytes();
        format!("{TOKEN_PREFIX}{user_id}_{}", hex::encode(signature))
    }

    /// Check a presented token and return the user id it was minted for.
    ///
    /// Parse failures are reported before any crypto runs; the signature
    /// check itself goes through `Mac::verify_slice`, which compares in
    /// constant time.
    pub fn verify(&self, token: &str) -> Result<i64, TokenError> {
        let body = token
            .strip_prefix(TOKEN_PREFIX)
            .ok_or(TokenError::Malformed("missing pacer_ut_ prefix"))?;
        let (id_segment, sig_segment) = body
            .split_once('_')
            .ok_or(TokenError::Malformed("missing signature segment"))?;

        let user_id: i64 = id_segment.parse()?;
        let claimed = hex::decode(sig_segment)?;

        self.mac_for(user_id)
            .verify_slice(&claimed)
            .map_err(|_| TokenError::BadSignature)?;
        Ok(user_id)
    }

    fn mac_for(&self, user_id: i64) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("hmac accepts any key length");
        mac.update(user_id.to_string().as_bytes());
        mac
    }
}

// Keeps the key out of logs when the signer sits inside server state.
impl fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSigner").finish_non_exhaustive()
    }
}

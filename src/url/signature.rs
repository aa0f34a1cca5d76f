use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::error::{Result, RouteError};

type HmacSha256 = Hmac<Sha256>;

/// Prefix marking a base64-encoded key.
const BASE64_PREFIX: &str = "base64:";

/// Query keys the signer owns.
pub const RESERVED_KEYS: [&str; 2] = ["signature", "expires"];

/// When a signed URL stops being valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Relative to the moment of signing.
    In(Duration),
    /// An absolute point in time.
    At(DateTime<Utc>),
}

impl Expiration {
    /// Unix timestamp for the `expires` parameter.
    #[must_use]
    pub fn timestamp(&self, now: DateTime<Utc>) -> i64 {
        match self {
            Expiration::In(duration) => (now + *duration).timestamp(),
            Expiration::At(at) => at.timestamp(),
        }
    }
}

impl From<Duration> for Expiration {
    fn from(duration: Duration) -> Self {
        Expiration::In(duration)
    }
}

impl From<DateTime<Utc>> for Expiration {
    fn from(at: DateTime<Utc>) -> Self {
        Expiration::At(at)
    }
}

/// HMAC keys for signing URLs.
///
/// The first key signs. Every key is tried when verifying, so a rotated-out
/// key keeps already issued URLs working.
#[derive(Clone, Default)]
pub struct SigningKeys {
    keys: Vec<Vec<u8>>,
}

impl fmt::Debug for SigningKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKeys")
            .field("count", &self.keys.len())
            .finish()
    }
}

impl SigningKeys {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Vec<u8>>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse configured key strings, decoding `base64:` keys.
    pub fn parse<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .filter(|key| !key.as_ref().is_empty())
            .map(|key| decode_key(key.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { keys })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Hex HMAC-SHA256 of `data` under the first key.
    pub fn sign(&self, data: &str) -> Result<String> {
        let key = self.keys.first().ok_or_else(|| {
            RouteError::InvalidArgument("no signing key configured".to_string())
        })?;
        let mac = mac_for(key, data)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Whether `signature` is the hex HMAC of `data` under any key.
    /// Comparison is constant time.
    #[must_use]
    pub fn verify(&self, data: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else {
            return false;
        };
        self.keys.iter().any(|key| {
            mac_for(key, data)
                .map(|mac| mac.verify_slice(&expected).is_ok())
                .unwrap_or(false)
        })
    }
}

fn mac_for(key: &[u8], data: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| RouteError::InvalidArgument(format!("invalid signing key: {e}")))?;
    mac.update(data.as_bytes());
    Ok(mac)
}

fn decode_key(key: &str) -> Result<Vec<u8>> {
    match key.strip_prefix(BASE64_PREFIX) {
        Some(encoded) => general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| RouteError::InvalidArgument(format!("invalid base64 signing key: {e}"))),
        None => Ok(key.as_bytes().to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_is_deterministic_hex() {
        let keys = SigningKeys::new(["secret"]);
        let a = keys.sign("https://example.com/a").unwrap();
        let b = keys.sign("https://example.com/a").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify_tries_every_key() {
        let old = SigningKeys::new(["old"]);
        let signature = old.sign("data").unwrap();

        let rotated = SigningKeys::new(["new", "old"]);
        assert!(rotated.verify("data", &signature));
        assert!(!rotated.verify("other", &signature));
        assert!(!SigningKeys::new(["new"]).verify("data", &signature));
        assert!(!rotated.verify("data", "not-hex"));
    }

    #[test]
    fn test_parse_decodes_base64_keys() {
        let keys = SigningKeys::parse(["base64:c2VjcmV0", "", "plain"]).unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(
            keys.sign("x").unwrap(),
            SigningKeys::new(["secret"]).sign("x").unwrap()
        );
        assert!(SigningKeys::parse(["base64:***"]).is_err());
    }

    #[test]
    fn test_sign_without_keys_fails() {
        assert!(matches!(
            SigningKeys::default().sign("x"),
            Err(RouteError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_expiration_timestamp() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let in_ten_minutes = Expiration::In(Duration::seconds(600));
        assert_eq!(in_ten_minutes.timestamp(now), 1_700_000_600);
        assert_eq!(Expiration::At(now).timestamp(now), 1_700_000_000);
    }
}

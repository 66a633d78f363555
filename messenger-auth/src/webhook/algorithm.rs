//! HMAC algorithms accepted in signature headers.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;

use crate::error::{
    configuration_error, webhook_error, ConfigurationErrorKind, Error, WebhookErrorKind,
};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Algorithm named by the prefix of a signature header (`sha1=...`, `sha256=...`).
///
/// The platform signs `X-Hub-Signature` with SHA-1 and `X-Hub-Signature-256`
/// with SHA-256. New algorithms are added as variants; the verification
/// contract does not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
}

impl SignatureAlgorithm {
    /// Get the header prefix for this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::Sha1 => "sha1",
            SignatureAlgorithm::Sha256 => "sha256",
        }
    }

    /// Lowercase hex HMAC of `body` keyed with `key`.
    pub(crate) fn hex_digest(&self, key: &[u8], body: &[u8]) -> Result<String, Error> {
        let digest = match self {
            SignatureAlgorithm::Sha1 => {
                let mut mac = HmacSha1::new_from_slice(key).map_err(invalid_key)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
            SignatureAlgorithm::Sha256 => {
                let mut mac = HmacSha256::new_from_slice(key).map_err(invalid_key)?;
                mac.update(body);
                mac.finalize().into_bytes().to_vec()
            }
        };

        Ok(hex::encode(digest))
    }
}

fn invalid_key(_: hmac::digest::InvalidLength) -> Error {
    configuration_error(ConfigurationErrorKind::MissingSecret, "Invalid HMAC key")
}

impl FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(prefix: &str) -> Result<Self, Self::Err> {
        match prefix {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            _ => Err(webhook_error(
                WebhookErrorKind::UnsupportedAlgorithm,
                &format!("Unsupported signature algorithm: {}", prefix),
            )),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_prefixes() {
        assert_eq!(
            "sha1".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::Sha1
        );
        assert_eq!(
            "sha256".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::Sha256
        );
    }

    #[test]
    fn test_parse_unknown_prefix() {
        for prefix in ["md5", "SHA1", "sha512", ""] {
            let err = prefix.parse::<SignatureAlgorithm>().unwrap_err();
            assert_eq!(
                err.error_kind,
                crate::ErrorKind::Webhook(WebhookErrorKind::UnsupportedAlgorithm),
                "prefix '{}' should be unsupported",
                prefix
            );
        }
    }

    #[test]
    fn test_display_matches_prefix() {
        assert_eq!(SignatureAlgorithm::Sha1.to_string(), "sha1");
        assert_eq!(SignatureAlgorithm::Sha256.to_string(), "sha256");
    }

    #[test]
    fn test_hex_digest_known_vectors() {
        // RFC 2202 test case 2 / RFC 4231 test case 2
        assert_eq!(
            SignatureAlgorithm::Sha1
                .hex_digest(b"Jefe", b"what do ya want for nothing?")
                .unwrap(),
            "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79"
        );
        assert_eq!(
            SignatureAlgorithm::Sha256
                .hex_digest(b"Jefe", b"what do ya want for nothing?")
                .unwrap(),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}

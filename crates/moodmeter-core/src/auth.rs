//! Shared-secret bearer authorization.
//!
//! A single static secret guards every mutation. The secret is kept only as
//! its SHA-256 digest and presented credentials are compared digest to
//! digest.

use sha2::{Digest, Sha256};

use crate::error::{CoreError, Result};

/// Environment variable holding the plaintext shared secret.
pub const SECRET_ENV: &str = "MOODMETER_SECRET";

/// Outcome of checking a presented credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authorized,
}

impl Access {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Access::Authorized)
    }

    /// Fail with `Unauthorized` unless authorized.
    pub fn require(&self) -> Result<()> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(CoreError::Unauthorized)
        }
    }
}

/// Checks bearer credentials against the configured secret.
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    secret_digest: Option<[u8; 32]>,
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

impl Authorizer {
    /// No secret configured: every credential is rejected.
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_secret(secret: &str) -> Self {
        Self {
            secret_digest: Some(digest(secret)),
        }
    }

    /// From a hex-encoded SHA-256 digest as stored in the config file.
    pub fn from_hex_digest(hex_digest: &str) -> Result<Self> {
        let bytes = hex::decode(hex_digest.trim()).map_err(|e| {
            CoreError::Validation(crate::error::ValidationError::InvalidValue {
                field: "auth.secret_sha256".into(),
                message: e.to_string(),
            })
        })?;
        let digest: [u8; 32] = bytes.try_into().map_err(|_| {
            CoreError::Validation(crate::error::ValidationError::InvalidValue {
                field: "auth.secret_sha256".into(),
                message: "expected 32 bytes".into(),
            })
        })?;
        Ok(Self {
            secret_digest: Some(digest),
        })
    }

    /// `MOODMETER_SECRET` if set, else the configured digest, else disabled.
    pub fn from_env_or_digest(hex_digest: Option<&str>) -> Result<Self> {
        match std::env::var(SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => Ok(Self::from_secret(&secret)),
            _ => match hex_digest {
                Some(d) => Self::from_hex_digest(d),
                None => Ok(Self::disabled()),
            },
        }
    }

    /// Hex digest of a secret, for writing into the config file.
    pub fn hex_digest_of(secret: &str) -> String {
        hex::encode(digest(secret))
    }

    /// Check an optional credential. Accepts either the bare token or an
    /// `Authorization` header value of the form `Bearer <token>`.
    pub fn check(&self, credential: Option<&str>) -> Access {
        let (Some(expected), Some(presented)) = (self.secret_digest, credential) else {
            return Access::Public;
        };
        let token = presented
            .strip_prefix("Bearer ")
            .unwrap_or(presented)
            .trim();
        if token.is_empty() {
            return Access::Public;
        }
        let presented = digest(token);
        // Fold over every byte so the comparison time does not depend on
        // where the digests differ.
        let diff = expected
            .iter()
            .zip(presented.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b));
        if diff == 0 {
            Access::Authorized
        } else {
            Access::Public
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_secret_authorizes() {
        let auth = Authorizer::from_secret("hunter2");
        assert_eq!(auth.check(Some("hunter2")), Access::Authorized);
        assert_eq!(auth.check(Some("Bearer hunter2")), Access::Authorized);
    }

    #[test]
    fn missing_or_wrong_secret_is_public() {
        let auth = Authorizer::from_secret("hunter2");
        assert_eq!(auth.check(None), Access::Public);
        assert_eq!(auth.check(Some("")), Access::Public);
        assert_eq!(auth.check(Some("Bearer nope")), Access::Public);
    }

    #[test]
    fn disabled_rejects_everything() {
        let auth = Authorizer::disabled();
        assert_eq!(auth.check(Some("anything")), Access::Public);
        assert!(matches!(
            auth.check(Some("anything")).require(),
            Err(CoreError::Unauthorized)
        ));
    }

    #[test]
    fn hex_digest_roundtrip() {
        let hex = Authorizer::hex_digest_of("s3cret");
        let auth = Authorizer::from_hex_digest(&hex).unwrap();
        assert!(auth.check(Some("s3cret")).is_authorized());
        assert!(Authorizer::from_hex_digest("abcd").is_err());
        assert!(Authorizer::from_hex_digest("zz").is_err());
    }
}

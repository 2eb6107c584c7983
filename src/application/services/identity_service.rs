//! Signed owner identities.
//!
//! A token is `<owner_id>.<hex(hmac_sha256(secret, owner_id))>`. Nothing is
//! stored server-side; the signature alone proves the owner id was issued by
//! this service.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// A freshly minted identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedIdentity {
    pub owner_id: String,
    pub token: String,
}

/// Issues and verifies identity tokens.
pub struct IdentityService {
    secret: Vec<u8>,
}

impl IdentityService {
    /// Creates a new identity service keyed by `secret`.
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length")
    }

    /// Signs `owner_id`, returning the full token.
    pub fn sign(&self, owner_id: &str) -> String {
        let mut mac = self.mac();
        mac.update(owner_id.as_bytes());
        format!("{owner_id}.{}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Generates a random owner id and its token.
    pub fn issue(&self) -> IssuedIdentity {
        let owner_id = Uuid::new_v4().to_string();
        let token = self.sign(&owner_id);
        IssuedIdentity { owner_id, token }
    }

    /// Returns the owner id if `token` carries a valid signature.
    ///
    /// The signature is compared in constant time.
    pub fn verify(&self, token: &str) -> Option<String> {
        let mut parts = token.split('.');
        let (Some(owner_id), Some(signature), None) = (parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        if owner_id.is_empty() || !is_canonical_signature(signature) {
            return None;
        }

        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac();
        mac.update(owner_id.as_bytes());
        mac.verify_slice(&signature).ok()?;

        Some(owner_id.to_string())
    }
}

/// Only the exact lowercase encoding produced by [`IdentityService::sign`]
/// is accepted.
fn is_canonical_signature(signature: &str) -> bool {
    signature.len() == 64
        && signature
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

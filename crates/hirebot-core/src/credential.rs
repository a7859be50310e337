//! API keys: possession tokens bound to a single company.
//!
//! A key is shown to the operator once, as `<prefix>.<secret>`. Only the
//! SHA-256 digest of the full string is stored; the prefix is kept in clear
//! so operators can tell keys apart.

use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Scheme word expected in the `Authorization` header.
pub const API_KEY_SCHEME: &str = "Api-Key";

const PREFIX_BYTES: usize = 4;
const SECRET_BYTES: usize = 24;

/// A stored API key. Never carries the secret itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
  pub key_id:     Uuid,
  pub company_id: Uuid,
  /// Operator-facing label, e.g. "PiedPiper chatbot".
  pub name:       String,
  pub prefix:     String,
  #[serde(skip_serializing)]
  pub key_hash:   String,
  pub revoked:    bool,
  pub created_at: DateTime<Utc>,
}

/// Returned once from [`crate::store::TenantStore::issue_api_key`].
#[derive(Debug, Clone)]
pub struct IssuedKey {
  pub key:    ApiKey,
  /// The full `<prefix>.<secret>` string to hand to the client.
  pub secret: String,
}

/// Freshly generated key material, before it is bound to a company.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
  pub prefix: String,
  pub full:   String,
  pub hash:   String,
}

/// Generate a new random key from the OS RNG.
pub fn generate_key() -> KeyMaterial {
  let mut prefix = [0u8; PREFIX_BYTES];
  let mut secret = [0u8; SECRET_BYTES];
  OsRng.fill_bytes(&mut prefix);
  OsRng.fill_bytes(&mut secret);

  let prefix = hex::encode(prefix);
  let full = format!("{prefix}.{}", hex::encode(secret));
  let hash = hash_key(&full);
  KeyMaterial { prefix, full, hash }
}

/// Hex SHA-256 digest of a presented key; the lookup value in storage.
pub fn hash_key(presented: &str) -> String {
  hex::encode(Sha256::digest(presented.as_bytes()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generated_keys_hash_to_their_stored_digest() {
    let k = generate_key();
    assert_eq!(hash_key(&k.full), k.hash);
    assert!(k.full.starts_with(&format!("{}.", k.prefix)));
    assert_eq!(k.prefix.len(), PREFIX_BYTES * 2);
  }

  #[test]
  fn keys_are_unique() {
    let a = generate_key();
    let b = generate_key();
    assert_ne!(a.full, b.full);
    assert_ne!(a.hash, b.hash);
  }

  #[test]
  fn hash_is_not_the_key() {
    let k = generate_key();
    assert!(!k.hash.contains(&k.full));
    assert_eq!(k.hash.len(), 64);
  }
}

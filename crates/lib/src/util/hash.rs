//! Hashing utilities for memoizing task runs.
//!
//! A snapshot fingerprint identifies one fully resolved configuration. Two
//! runs of the same task are considered identical when their fingerprints
//! match, which is how fan-out can run `build` once per platform while a
//! `build` reached twice through prerequisites still runs once.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::FINGERPRINT_LEN;

pub type HashError = serde_json::Error;

/// A truncated SHA-256 of a JSON-serialized value.
///
/// # Format
///
/// A lowercase hexadecimal string of `FINGERPRINT_LEN` characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub String);

impl std::fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

pub trait Hashable: Serialize {
  fn fingerprint(&self) -> Result<Fingerprint, HashError> {
    let serialized = serde_json::to_string(self)?;
    Ok(hash_bytes(serialized.as_bytes()))
  }
}

/// Hash arbitrary bytes into a truncated fingerprint.
pub fn hash_bytes(data: &[u8]) -> Fingerprint {
  let digest = Sha256::digest(data);
  let full = hex::encode(digest);
  Fingerprint(full[..FINGERPRINT_LEN].to_string())
}

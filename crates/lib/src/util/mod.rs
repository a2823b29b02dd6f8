//! Shared utilities.
//!
//! Fingerprint hashing, typo suggestions and test helpers.

pub mod hash;
pub mod suggest;

#[cfg(test)]
pub mod testutil;

//! Randomness source for document identifiers.

use base64::Engine;
use rand::RngCore;

use crate::config::DOCUMENT_ID_BYTES;

/// Source of random bytes. Tests substitute a fixed sequence.
pub trait Randomizer: Send + Sync {
    /// Returns `size` random bytes.
    fn random_bytes(&self, size: usize) -> Vec<u8>;
}

/// Randomizer backed by the thread-local CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandomizer;

impl Randomizer for ThreadRandomizer {
    fn random_bytes(&self, size: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; size];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    }
}

/// New document identifier: URL-safe base64 without padding.
pub fn document_id(randomizer: &dyn Randomizer) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(randomizer.random_bytes(DOCUMENT_ID_BYTES))
}

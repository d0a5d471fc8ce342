//! Input fingerprints for memoizing resolutions.
//!
//! A resolution is a pure function of its inputs, so a digest over the
//! serialized inputs is a sound cache key.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// A hasher for building fingerprints from multiple components.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint {
            hasher: Sha256::new(),
        }
    }

    /// Add any serializable value, using its JSON encoding as the identity.
    ///
    /// Each component is length-prefixed so adjacent components cannot run
    /// together. Map-typed fields must be ordered (`BTreeMap`) for the digest
    /// to be stable.
    pub fn update_serialized<T: Serialize + ?Sized>(
        &mut self,
        value: &T,
    ) -> Result<&mut Self, serde_json::Error> {
        let encoded = serde_json::to_vec(value)?;
        self.hasher.update((encoded.len() as u64).to_le_bytes());
        self.hasher.update(&encoded);
        Ok(self)
    }

    /// Finalize and return the fingerprint as a hex string.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

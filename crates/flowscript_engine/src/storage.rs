// SPDX-License-Identifier: MIT OR Apache-2.0
//! Opaque per-node configuration blobs.
//!
//! Storage is round-tripped as RON text. Decoding is tolerant: a blob
//! that no longer matches the node's storage type falls back to the
//! type's default instead of failing the load.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Error produced while encoding a storage blob.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Encoding to RON failed
    #[error("failed to encode storage: {0}")]
    Encode(#[from] ron::Error),
}

/// Encode a storage value into its persisted blob.
pub fn encode<T: Serialize>(value: &T) -> Result<String, StorageError> {
    Ok(ron::ser::to_string(value)?)
}

/// Decode a storage blob, falling back to the type's default on mismatch.
///
/// The fallback is logged but never fatal; a node always comes up with a
/// usable configuration.
pub fn decode_or_default<T: DeserializeOwned + Default>(blob: &str) -> T {
    match ron::from_str(blob) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(%error, "malformed node storage, falling back to defaults");
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Config {
        threshold: f32,
        label: String,
    }

    #[test]
    fn test_round_trip() {
        let config = Config {
            threshold: 0.5,
            label: "warm".into(),
        };
        let blob = encode(&config).unwrap();
        let decoded: Config = decode_or_default(&blob);
        assert_eq!(decoded, config);
    }

    #[test]
    fn test_malformed_blob_falls_back_to_default() {
        let decoded: Config = decode_or_default("(threshold: \"not a float\")");
        assert_eq!(decoded, Config::default());
    }
}

//! Cache key and value codec
//!
//! Key construction and entry (de)serialization shared by both tiers, so a key
//! built once is valid everywhere and an entry written by one process decodes
//! in another.

use crate::error_ext::ErrorContext;
use opscache_domain::constants::{CACHE_KEY_MAX_LENGTH, CACHE_KEY_SEPARATOR};
use opscache_domain::error::{Error, Result};
use opscache_domain::value_objects::CacheEntry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// Characters with special meaning in glob patterns
const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']', '\\'];

/// Stateless key and value codec
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheKeyCodec;

impl CacheKeyCodec {
    /// Build `prefix:name:sha256(args)`
    ///
    /// `args` are serialized to JSON through `serde_json::Value`, whose maps are
    /// ordered, so equal arguments always hash the same regardless of the map
    /// type the caller used.
    pub fn key<A: Serialize + ?Sized>(prefix: &str, name: &str, args: &A) -> Result<String> {
        let canonical = serde_json::to_value(args)
            .and_then(|value| serde_json::to_vec(&value))
            .serialization_context("Failed to serialize key arguments")?;
        let digest = hex::encode(Sha256::digest(&canonical));

        let key = [
            Self::sanitize_segment(prefix),
            Self::sanitize_segment(name),
            digest,
        ]
        .join(CACHE_KEY_SEPARATOR);

        Self::validate_key(&key)?;
        Ok(key)
    }

    /// Check that `key` is usable by every tier
    ///
    /// Keys are non-empty, at most 250 bytes, and contain only printable ASCII
    /// without whitespace.
    pub fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::invalid_key("Key cannot be empty"));
        }

        if key.len() > CACHE_KEY_MAX_LENGTH {
            return Err(Error::invalid_key(format!(
                "Key is {} bytes, maximum is {CACHE_KEY_MAX_LENGTH}",
                key.len()
            )));
        }

        if let Some(bad) = key.chars().find(|c| !c.is_ascii_graphic()) {
            return Err(Error::invalid_key(format!(
                "Key contains invalid character {bad:?}"
            )));
        }

        Ok(())
    }

    /// Replace characters that are invalid in a key or special in a glob
    pub fn sanitize_segment(segment: &str) -> String {
        segment
            .chars()
            .map(|c| {
                if c.is_ascii_graphic() && !GLOB_METACHARACTERS.contains(&c) {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Encode an entry for the distributed tier
    pub fn encode(entry: &CacheEntry) -> Result<Vec<u8>> {
        serde_json::to_vec(entry).serialization_context("Failed to encode cache entry")
    }

    /// Decode an entry read from the distributed tier
    pub fn decode(payload: &[u8]) -> Result<CacheEntry> {
        serde_json::from_slice(payload).serialization_context("Failed to decode cache entry")
    }

    /// Convert a caller value into the stored payload
    pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value> {
        serde_json::to_value(value).serialization_context("Failed to serialize cached value")
    }

    /// Convert a stored payload back into the caller's type
    pub fn from_value<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
        serde_json::from_value(value).serialization_context("Failed to deserialize cached value")
    }
}

//! Record keys and key generation.
//!
//! Keys are opaque strings owned by the store. Fresh keys come from a
//! [`KeyGenerator`] so tests can swap random UUIDs for a predictable sequence.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Stable identity of a record within a namespace
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordKey(String);

impl RecordKey {
    /// Wrap an existing key
    #[inline]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Borrow the key as a string slice
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for RecordKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Source of fresh keys for inserted records
pub trait KeyGenerator: Send + Sync {
    /// Produce a key that has not been handed out before
    fn next_key(&self) -> RecordKey;
}

/// Random v4 UUID keys
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidKeys;

impl KeyGenerator for UuidKeys {
    fn next_key(&self) -> RecordKey {
        RecordKey(Uuid::new_v4().to_string())
    }
}

/// Deterministic keys: `{prefix}-1`, `{prefix}-2`, ...
#[derive(Debug)]
pub struct SequentialKeys {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialKeys {
    /// Create a generator with the given prefix
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl Default for SequentialKeys {
    fn default() -> Self {
        Self::new("key")
    }
}

impl KeyGenerator for SequentialKeys {
    fn next_key(&self) -> RecordKey {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        RecordKey(format!("{}-{}", self.prefix, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_keys_are_unique() {
        let keys = UuidKeys;
        assert_ne!(keys.next_key(), keys.next_key());
    }

    #[test]
    fn test_uuid_keys_parse_as_uuid() {
        let key = UuidKeys.next_key();
        assert!(Uuid::parse_str(key.as_str()).is_ok());
    }

    #[test]
    fn test_sequential_keys() {
        let keys = SequentialKeys::new("todo");
        assert_eq!(keys.next_key().as_str(), "todo-1");
        assert_eq!(keys.next_key().as_str(), "todo-2");
    }

    #[test]
    fn test_key_serde_is_transparent() {
        let key = RecordKey::new("abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc\"");
        let parsed: RecordKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_key_debug_format() {
        assert_eq!(format!("{:?}", RecordKey::new("abc")), "RecordKey(abc)");
    }
}

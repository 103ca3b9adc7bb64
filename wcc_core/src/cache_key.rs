//! Derives the cache key of a calendar request from its query string.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
};

use sha2::{Digest, Sha256};

/// The raw query of a calendar request.
pub type QueryParams = HashMap<String, String>;

/// Parameters which only change how an artifact is serialized, not what it contains.
static PRESENTATION_PARAMS: [&str; 1] = ["format"];

/// A query without presentation parameters, ordered by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalQuery(BTreeMap<String, String>);

impl CanonicalQuery {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

/// Fixed length identifier of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn canonicalize(query: &QueryParams) -> CanonicalQuery {
    CanonicalQuery(
        query
            .iter()
            .filter(|(name, _)| !PRESENTATION_PARAMS.contains(&name.as_str()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect(),
    )
}

/// Hash the canonical query.
///
/// Changing this function invalidates every stored artifact!
pub fn key_of(canonical_query: &CanonicalQuery) -> CacheKey {
    let mut hasher = Sha256::new();
    for (name, value) in &canonical_query.0 {
        // JSON string literals keep separators inside names and values unambiguous.
        hasher.update(serde_json::Value::from(name.as_str()).to_string());
        hasher.update(b":");
        hasher.update(serde_json::Value::from(value.as_str()).to_string());
        hasher.update(b"\n");
    }
    CacheKey(hex::encode(hasher.finalize()))
}

//! Cache keys derived from endpoint name and arguments.

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::warn;

/// Identifies one cache entry: an endpoint plus its canonicalized arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
  endpoint: &'static str,
  args: String,
}

impl CacheKey {
  pub fn new<A: Serialize + ?Sized>(endpoint: &'static str, args: &A) -> Self {
    let args = match serde_json::to_value(args) {
      Ok(value) => canonicalize(value).to_string(),
      Err(e) => {
        warn!(endpoint, error = %e, "query arguments could not be serialized");
        format!("<unserializable: {}>", e)
      }
    };

    Self { endpoint, args }
  }

  pub fn endpoint(&self) -> &'static str {
    self.endpoint
  }

  /// Canonical JSON of the arguments.
  pub fn args(&self) -> &str {
    &self.args
  }

  /// SHA256 of the key for stable, fixed-length identifiers in logs.
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.endpoint.as_bytes());
    hasher.update(b"(");
    hasher.update(self.args.as_bytes());
    hasher.update(b")");
    hex::encode(hasher.finalize())
  }
}

impl fmt::Display for CacheKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}({})", self.endpoint, self.args)
  }
}

/// Rebuild objects with their keys sorted, recursively.
///
/// serde_json keeps insertion order when another crate in the graph enables
/// `preserve_order`, so ordering is enforced here rather than assumed.
fn canonicalize(value: Value) -> Value {
  match value {
    Value::Object(map) => {
      let mut entries: Vec<(String, Value)> = map.into_iter().collect();
      entries.sort_by(|(a, _), (b, _)| a.cmp(b));
      Value::Object(
        entries
          .into_iter()
          .map(|(k, v)| (k, canonicalize(v)))
          .collect::<Map<String, Value>>(),
      )
    }
    Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
    other => other,
  }
}

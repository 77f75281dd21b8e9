//! Script — reduction source code, content-addressed.
//!
//! Scripts are deduplicated by a SHA-512 digest of their text. The external
//! `sha` (a version-control marker) is informational only and never part of
//! the key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::record::SameRecord;

/// An immutable reduction script.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
  pub id:          i64,
  pub source_text: String,
  pub sha:         Option<String>,
  /// Hex-encoded SHA-512 of `source_text`; unique across the table.
  pub script_hash: String,
}

impl SameRecord for Script {
  fn same_record(&self, other: &Self) -> bool {
    self.source_text == other.source_text
      && self.sha == other.sha
      && self.script_hash == other.script_hash
  }
}

/// Compute the content hash a script is deduplicated by.
///
/// 64-byte digest, hex-encoded (128 characters).
pub fn hash_script(source_text: &str) -> String {
  let mut hasher = Sha512::new();
  hasher.update(source_text.as_bytes());
  hex::encode(hasher.finalize())
}

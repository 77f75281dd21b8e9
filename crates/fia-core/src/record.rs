//! Attribute-wise equality for persisted entities.
//!
//! Two records describe the same thing when every stored attribute other
//! than the surrogate identifier matches. Each entity spells out its own
//! comparison; nothing here relies on introspection.

/// Compare two records on all non-identifier attributes.
pub trait SameRecord {
  fn same_record(&self, other: &Self) -> bool;
}

impl<T: SameRecord> SameRecord for Option<T> {
  fn same_record(&self, other: &Self) -> bool {
    match (self, other) {
      (Some(a), Some(b)) => a.same_record(b),
      (None, None) => true,
      _ => false,
    }
  }
}

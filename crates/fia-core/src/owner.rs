//! Owner — the experiment or user a run or job is attributed to.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, record::SameRecord};

/// Exactly one of `experiment_number` and `user_number` is set on a stored
/// owner; each number is globally unique when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
  pub id:                i64,
  pub experiment_number: Option<i64>,
  pub user_number:       Option<i64>,
}

impl SameRecord for Owner {
  fn same_record(&self, other: &Self) -> bool {
    self.experiment_number == other.experiment_number
      && self.user_number == other.user_number
  }
}

/// The natural key an owner is resolved by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKey {
  User(i64),
  Experiment(i64),
}

impl OwnerKey {
  /// Pick the lookup key from the numbers a caller supplied. The user number
  /// wins when both are present.
  pub fn select(
    experiment_number: Option<i64>,
    user_number: Option<i64>,
  ) -> Result<Self> {
    match (user_number, experiment_number) {
      (Some(user), _) => Ok(Self::User(user)),
      (None, Some(experiment)) => Ok(Self::Experiment(experiment)),
      (None, None) => Err(Error::InvalidArgument(
        "an experiment number or a user number is required".into(),
      )),
    }
  }

  /// The `(experiment_number, user_number)` pair a new owner row gets.
  pub fn columns(self) -> (Option<i64>, Option<i64>) {
    match self {
      Self::User(user) => (None, Some(user)),
      Self::Experiment(experiment) => (Some(experiment), None),
    }
  }
}

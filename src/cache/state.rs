use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::transport::ApiError;

/// Load status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryStatus {
  /// Nothing has been requested yet
  #[default]
  Uninitialized,
  /// A fetch is in flight
  Loading,
  /// The latest fetch succeeded
  Success,
  /// The latest fetch failed
  Error,
}

/// What a subscriber sees of a cache entry.
///
/// `data` is the result of the newest completed successful fetch and survives
/// both later failures and in-flight refetches.
#[derive(Debug)]
pub struct QuerySnapshot<T> {
  pub status: QueryStatus,
  pub data: Option<Arc<T>>,
  pub error: Option<ApiError>,
  /// Invalidated since the data was fetched
  pub is_stale: bool,
  pub fulfilled_at: Option<DateTime<Utc>>,
}

impl<T> Default for QuerySnapshot<T> {
  fn default() -> Self {
    Self {
      status: QueryStatus::Uninitialized,
      data: None,
      error: None,
      is_stale: false,
      fulfilled_at: None,
    }
  }
}

impl<T> Clone for QuerySnapshot<T> {
  fn clone(&self) -> Self {
    Self {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      is_stale: self.is_stale,
      fulfilled_at: self.fulfilled_at,
    }
  }
}

impl<T> QuerySnapshot<T> {
  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&ApiError> {
    self.error.as_ref()
  }

  /// First load: fetching with nothing to show yet.
  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Loading && self.data.is_none()
  }

  /// Any fetch in flight, including background refetches.
  pub fn is_fetching(&self) -> bool {
    self.status == QueryStatus::Loading
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  /// No fetch pending and at least one has completed.
  pub fn is_settled(&self) -> bool {
    matches!(self.status, QueryStatus::Success | QueryStatus::Error)
  }

  /// The data if the latest fetch succeeded, otherwise the error.
  pub fn into_result(self) -> Result<Arc<T>, ApiError> {
    match (self.status, self.data, self.error) {
      (QueryStatus::Error, _, Some(error)) => Err(error),
      (_, Some(data), _) => Ok(data),
      (_, None, Some(error)) => Err(error),
      (status, None, None) => Err(ApiError::fetch(format!(
        "query finished without data (status {:?})",
        status
      ))),
    }
  }
}

/// Lifecycle of one mutation: `Idle -> Pending -> (Fulfilled | Rejected)`.
#[derive(Debug, Clone, Default)]
pub enum MutationState<T> {
  #[default]
  Idle,
  Pending,
  Fulfilled(T),
  Rejected(ApiError),
}

impl<T> MutationState<T> {
  pub fn is_pending(&self) -> bool {
    matches!(self, Self::Pending)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      Self::Fulfilled(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&ApiError> {
    match self {
      Self::Rejected(error) => Some(error),
      _ => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_snapshot_is_uninitialized() {
    let snapshot = QuerySnapshot::<u32>::default();
    assert_eq!(snapshot.status, QueryStatus::Uninitialized);
    assert!(!snapshot.is_settled());
    assert!(!snapshot.is_loading());
  }

  #[test]
  fn test_refetch_with_data_is_not_first_load() {
    let snapshot = QuerySnapshot {
      status: QueryStatus::Loading,
      data: Some(Arc::new(1)),
      ..Default::default()
    };
    assert!(!snapshot.is_loading());
    assert!(snapshot.is_fetching());
  }

  #[test]
  fn test_into_result_prefers_error_status() {
    let snapshot = QuerySnapshot {
      status: QueryStatus::Error,
      data: Some(Arc::new(1)),
      error: Some(ApiError::http(500, serde_json::Value::Null)),
      ..Default::default()
    };
    assert!(snapshot.clone().into_result().is_err());
    assert_eq!(snapshot.data(), Some(&1));
  }

  #[test]
  fn test_mutation_state_accessors() {
    let state: MutationState<u32> = MutationState::Fulfilled(7);
    assert_eq!(state.data(), Some(&7));
    assert!(!state.is_pending());
    assert!(MutationState::<u32>::Pending.is_pending());
  }
}

//! Write operations and the invalidation they trigger.

use tokio::sync::watch;
use tracing::{info, warn};

use crate::transport::ApiError;

use super::endpoint::MutationEndpoint;
use super::state::MutationState;
use super::store::QueryStore;

impl QueryStore {
  /// Run a mutation and invalidate the tags it declares.
  ///
  /// Validation failures return before anything is sent and invalidate
  /// nothing. Every other outcome is handed to `invalidates_tags` and then
  /// returned to the caller unchanged. Mutations are never deduplicated.
  pub async fn mutate<E: MutationEndpoint>(&self, args: E::Args) -> Result<E::Output, ApiError> {
    if let Err(error) = E::validate(&args) {
      warn!(endpoint = E::NAME, %error, "mutation rejected before sending");
      return Err(error);
    }

    let request = E::request(&args);
    info!(
      endpoint = E::NAME,
      method = %request.method,
      path = %request.path,
      "running mutation"
    );

    let outcome = match self.transport().send(request).await {
      Ok(response) => E::transform(response.body),
      Err(error) => Err(error),
    };

    if let Err(error) = &outcome {
      warn!(endpoint = E::NAME, %error, "mutation failed");
    }

    let tags = E::invalidates_tags(outcome.as_ref(), &args);
    self.invalidate_tags(&tags);

    outcome
  }

  /// A handle that tracks the state of triggered mutations for display.
  pub fn mutation<E: MutationEndpoint>(&self) -> MutationHandle<E> {
    let (state, _) = watch::channel(MutationState::Idle);
    MutationHandle {
      store: self.clone(),
      state,
    }
  }
}

/// Triggers one kind of mutation and exposes its latest state.
pub struct MutationHandle<E: MutationEndpoint> {
  store: QueryStore,
  state: watch::Sender<MutationState<E::Output>>,
}

impl<E: MutationEndpoint> MutationHandle<E> {
  pub fn state(&self) -> MutationState<E::Output> {
    self.state.borrow().clone()
  }

  /// Receiver for observing state changes, e.g. to drive a progress indicator.
  pub fn watch(&self) -> watch::Receiver<MutationState<E::Output>> {
    self.state.subscribe()
  }

  pub async fn trigger(&self, args: E::Args) -> Result<E::Output, ApiError> {
    self.state.send_replace(MutationState::Pending);

    let outcome = self.store.mutate::<E>(args).await;

    self.state.send_replace(match &outcome {
      Ok(output) => MutationState::Fulfilled(output.clone()),
      Err(error) => MutationState::Rejected(error.clone()),
    });

    outcome
  }
}

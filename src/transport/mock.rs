//! Scripted in-memory transport for tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ApiError;
use super::request::{RawResponse, Request};
use super::Transport;

type Handler = dyn Fn(&Request) -> Result<RawResponse, ApiError> + Send + Sync;

/// Replies to every request through a handler closure and records what it saw.
#[derive(Clone)]
pub struct MockTransport {
  handler: Arc<Mutex<Arc<Handler>>>,
  requests: Arc<Mutex<Vec<Request>>>,
  delay: Duration,
}

impl MockTransport {
  pub fn new<F>(handler: F) -> Self
  where
    F: Fn(&Request) -> Result<RawResponse, ApiError> + Send + Sync + 'static,
  {
    Self {
      handler: Arc::new(Mutex::new(Arc::new(handler))),
      requests: Arc::new(Mutex::new(Vec::new())),
      delay: Duration::ZERO,
    }
  }

  /// Delay every reply, keeping requests in flight long enough to observe them.
  pub fn with_delay(mut self, delay: Duration) -> Self {
    self.delay = delay;
    self
  }

  /// Swap the handler, e.g. to simulate the backend starting to fail.
  pub fn respond_with<F>(&self, handler: F)
  where
    F: Fn(&Request) -> Result<RawResponse, ApiError> + Send + Sync + 'static,
  {
    *self.handler.lock().unwrap() = Arc::new(handler);
  }

  pub fn requests(&self) -> Vec<Request> {
    self.requests.lock().unwrap().clone()
  }

  /// Number of requests sent to the given path.
  pub fn calls_to(&self, path: &str) -> usize {
    self
      .requests
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.path == path)
      .count()
  }

  pub fn call_count(&self) -> usize {
    self.requests.lock().unwrap().len()
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn send(&self, request: Request) -> Result<RawResponse, ApiError> {
    self.requests.lock().unwrap().push(request.clone());
    if !self.delay.is_zero() {
      tokio::time::sleep(self.delay).await;
    }
    let handler = self.handler.lock().unwrap().clone();
    handler(&request)
  }
}

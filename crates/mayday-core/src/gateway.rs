//! The `MessageGateway` trait — the single wire boundary to the external
//! messaging provider.

use std::{future::Future, time::Duration};

use thiserror::Error;

/// A failed send attempt, as reported by (or on behalf of) the provider.
#[derive(Debug, Error)]
pub enum DeliveryError {
  #[error("provider rejected the message: {0}")]
  Provider(String),

  #[error("send timed out after {0:?}")]
  Timeout(Duration),

  #[error("transport error: {0}")]
  Transport(String),
}

/// Abstraction over the external SMS/push provider.
///
/// One method, one message, one recipient. Implementations must be cheap
/// to share behind an `Arc`; the dispatcher calls `send` concurrently for
/// the two contacts of an event.
pub trait MessageGateway: Send + Sync {
  /// Deliver `message` to `phone_number`. On success the provider's opaque
  /// payload is returned verbatim for audit storage.
  fn send<'a>(
    &'a self,
    phone_number: &'a str,
    message: &'a str,
  ) -> impl Future<Output = Result<String, DeliveryError>> + Send + 'a;
}

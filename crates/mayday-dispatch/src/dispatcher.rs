//! [`AlertDispatcher`] — the trigger protocol and the concurrent
//! per-contact delivery fan-out.

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use mayday_core::{
  alert::{AlertEvent, DeliveryOutcome, Location},
  gateway::{DeliveryError, MessageGateway},
  store::{AlertEventStore, ContactStore},
};

use crate::message;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Tunable timing constants for the per-contact delivery tasks.
#[derive(Debug, Clone, Copy)]
pub struct DispatchPolicy {
  /// Fixed delay before the single retry of a failed send. No jitter, no
  /// further attempts.
  pub retry_backoff: Duration,
  /// Upper bound on one gateway call; exceeding it is a failed attempt.
  pub send_timeout:  Duration,
}

impl Default for DispatchPolicy {
  fn default() -> Self {
    Self {
      retry_backoff: Duration::from_secs(2),
      send_timeout:  Duration::from_secs(10),
    }
  }
}

// ─── Input / output ──────────────────────────────────────────────────────────

/// One trigger request, as handed over by the authenticating front layer.
#[derive(Debug, Clone)]
pub struct TriggerRequest {
  pub user_id:      Uuid,
  /// Shown to the contacts in the message text; resolved by the caller's
  /// user directory.
  pub display_name: String,
  pub latitude:     f64,
  pub longitude:    f64,
  pub address:      Option<String>,
}

/// A freshly-created alert plus handles to its in-flight delivery tasks.
///
/// Dropping the handles detaches the tasks; they always run to completion.
/// Callers that need a settled event (tests, batch tooling) await them.
#[derive(Debug)]
pub struct TriggeredAlert {
  /// Snapshot taken at trigger time: both records SENT, nothing delivered
  /// yet.
  pub event: AlertEvent,
  tasks:     Vec<JoinHandle<()>>,
}

impl TriggeredAlert {
  /// Discard the task handles and keep the event. The delivery tasks keep
  /// running detached.
  pub fn into_event(self) -> AlertEvent { self.event }

  /// Wait until both delivery tasks (including retries) have finished.
  ///
  /// The returned event is still the trigger-time snapshot; reload it from
  /// the store to observe final delivery states.
  pub async fn settled(self) -> AlertEvent {
    for task in self.tasks {
      let _ = task.await;
    }
    self.event
  }
}

/// Why a trigger was rejected synchronously. Delivery failures never appear
/// here — they are recorded outcomes, not trigger failures.
#[derive(Debug, Error)]
pub enum TriggerError {
  #[error(transparent)]
  InvalidLocation(mayday_core::Error),

  #[error("no emergency contacts configured for user {0}")]
  ContactsNotConfigured(Uuid),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Orchestrates one trigger and the concurrent fan-out that follows it.
pub struct AlertDispatcher<S, G> {
  store:   Arc<S>,
  gateway: Arc<G>,
  policy:  DispatchPolicy,
}

impl<S, G> AlertDispatcher<S, G>
where
  S: ContactStore + AlertEventStore + 'static,
  G: MessageGateway + 'static,
{
  pub fn new(store: Arc<S>, gateway: Arc<G>, policy: DispatchPolicy) -> Self {
    Self { store, gateway, policy }
  }

  /// Validate, snapshot the contact pair, persist the new event, and
  /// launch one delivery task per contact.
  ///
  /// Returns as soon as the event is persisted: the caller learns that the
  /// contacts are *being* notified, never that they have been. The spawned
  /// tasks are fully decoupled from this call and run to completion
  /// whether or not the handles in the returned [`TriggeredAlert`] are
  /// awaited.
  pub async fn trigger(
    &self,
    request: TriggerRequest,
  ) -> Result<TriggeredAlert, TriggerError> {
    let location =
      Location::new(request.latitude, request.longitude, request.address)
        .map_err(TriggerError::InvalidLocation)?;

    let contacts = self
      .store
      .get_contacts(request.user_id)
      .await
      .map_err(|e| TriggerError::Store(Box::new(e)))?
      .ok_or(TriggerError::ContactsNotConfigured(request.user_id))?;

    let event = AlertEvent::new(request.user_id, location, &contacts);
    let event = self
      .store
      .create_alert(event)
      .await
      .map_err(|e| TriggerError::Store(Box::new(e)))?;

    tracing::info!(
      alert_id = %event.alert_id,
      user_id = %event.user_id,
      "alert triggered, dispatching to both contacts"
    );

    // One message per event, shared by both deliveries.
    let text = message::compose(&request.display_name, &event);

    let tasks = event
      .deliveries
      .iter()
      .enumerate()
      .map(|(slot, record)| {
        tokio::spawn(deliver(
          Arc::clone(&self.store),
          Arc::clone(&self.gateway),
          self.policy,
          event.alert_id,
          slot,
          record.phone_number.clone(),
          text.clone(),
        ))
      })
      .collect();

    Ok(TriggeredAlert { event, tasks })
  }
}

// ─── Delivery task ───────────────────────────────────────────────────────────

/// One contact's delivery lifecycle: a send, then at most one retry after
/// the fixed backoff. Attempts for one record run strictly in sequence;
/// the tasks for the two contacts of an event run concurrently.
async fn deliver<S, G>(
  store: Arc<S>,
  gateway: Arc<G>,
  policy: DispatchPolicy,
  alert_id: Uuid,
  slot: usize,
  phone: String,
  text: String,
) where
  S: AlertEventStore,
  G: MessageGateway,
{
  let first_err =
    match attempt(&*gateway, policy.send_timeout, &phone, &text).await {
      Ok(payload) => {
        record_outcome(&*store, alert_id, slot, DeliveryOutcome::Delivered {
          provider_response: payload,
          at:                Utc::now(),
        })
        .await;
        return;
      }
      Err(err) => err,
    };

  tracing::warn!(
    %alert_id, slot, error = %first_err,
    "delivery attempt failed, retrying once"
  );
  record_outcome(&*store, alert_id, slot, DeliveryOutcome::Failed {
    provider_response: first_err.to_string(),
    at:                Utc::now(),
  })
  .await;

  tokio::time::sleep(policy.retry_backoff).await;

  match attempt(&*gateway, policy.send_timeout, &phone, &text).await {
    Ok(payload) => {
      record_outcome(&*store, alert_id, slot, DeliveryOutcome::Delivered {
        provider_response: payload,
        at:                Utc::now(),
      })
      .await;
    }
    Err(err) => {
      tracing::error!(
        %alert_id, slot, error = %err,
        "delivery failed permanently"
      );
      record_outcome(&*store, alert_id, slot, DeliveryOutcome::Failed {
        provider_response: err.to_string(),
        at:                Utc::now(),
      })
      .await;
    }
  }
}

/// One bounded send attempt.
async fn attempt<G: MessageGateway>(
  gateway: &G,
  timeout: Duration,
  phone: &str,
  text: &str,
) -> Result<String, DeliveryError> {
  match tokio::time::timeout(timeout, gateway.send(phone, text)).await {
    Ok(result) => result,
    Err(_) => Err(DeliveryError::Timeout(timeout)),
  }
}

/// Write one outcome back. Failures here cannot reach the trigger caller;
/// they are logged and the record keeps its previous state.
async fn record_outcome<S: AlertEventStore>(
  store: &S,
  alert_id: Uuid,
  slot: usize,
  outcome: DeliveryOutcome,
) {
  if let Err(err) = store.apply_delivery_outcome(alert_id, slot, outcome).await
  {
    tracing::error!(
      %alert_id, slot, error = %err,
      "failed to record delivery outcome"
    );
  }
}

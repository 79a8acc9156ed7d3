//! Dispatcher and admin-service tests against an in-memory store and a
//! scripted gateway stub.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex},
  time::Duration,
};

use mayday_core::{
  alert::{DeliveryState, OverallStatus},
  contact::{Contact, EmergencyContactSet},
  gateway::{DeliveryError, MessageGateway},
  store::{AlertEventStore, AlertQuery, ContactStore},
};
use mayday_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{
  admin::{AdminError, AlertAdminService, to_csv},
  dispatcher::{
    AlertDispatcher, DispatchPolicy, TriggerError, TriggerRequest,
  },
};

const MOM: &str = "+919998887777";
const DAD: &str = "+919997776666";

// ─── Gateway stub ────────────────────────────────────────────────────────────

/// Per-number behavior scripted for the stub gateway.
#[derive(Clone, Copy)]
enum Script {
  AlwaysSucceed,
  AlwaysFail,
  FailThenSucceed,
  /// Never completes within any test timeout.
  Hang,
}

/// Scripted gateway recording every attempt and the text it carried.
struct StubGateway {
  scripts:  HashMap<String, Script>,
  attempts: Mutex<HashMap<String, u32>>,
  messages: Mutex<Vec<(String, String)>>,
}

impl StubGateway {
  fn new(scripts: impl IntoIterator<Item = (&'static str, Script)>) -> Self {
    Self {
      scripts:  scripts
        .into_iter()
        .map(|(phone, script)| (phone.to_owned(), script))
        .collect(),
      attempts: Mutex::new(HashMap::new()),
      messages: Mutex::new(Vec::new()),
    }
  }

  fn attempts_for(&self, phone: &str) -> u32 {
    self.attempts.lock().unwrap().get(phone).copied().unwrap_or(0)
  }

  fn messages_for(&self, phone: &str) -> Vec<String> {
    self
      .messages
      .lock()
      .unwrap()
      .iter()
      .filter(|(p, _)| p == phone)
      .map(|(_, m)| m.clone())
      .collect()
  }
}

impl MessageGateway for StubGateway {
  async fn send(
    &self,
    phone_number: &str,
    message: &str,
  ) -> Result<String, DeliveryError> {
    let attempt = {
      let mut attempts = self.attempts.lock().unwrap();
      let counter = attempts.entry(phone_number.to_owned()).or_insert(0);
      *counter += 1;
      *counter
    };
    self
      .messages
      .lock()
      .unwrap()
      .push((phone_number.to_owned(), message.to_owned()));

    let script = self
      .scripts
      .get(phone_number)
      .copied()
      .unwrap_or(Script::AlwaysSucceed);

    match script {
      Script::AlwaysSucceed => Ok(format!("msg-{attempt}")),
      Script::AlwaysFail => {
        Err(DeliveryError::Provider("number unreachable".into()))
      }
      Script::FailThenSucceed if attempt == 1 => {
        Err(DeliveryError::Provider("temporary outage".into()))
      }
      Script::FailThenSucceed => Ok(format!("msg-{attempt}")),
      Script::Hang => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("too late".into())
      }
    }
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Zero backoff keeps the retry path fast in tests without changing the
/// dispatcher's control flow.
fn policy() -> DispatchPolicy {
  DispatchPolicy {
    retry_backoff: Duration::from_millis(0),
    send_timeout:  Duration::from_millis(100),
  }
}

fn contact_set(user_id: Uuid) -> EmergencyContactSet {
  EmergencyContactSet::new(
    user_id,
    vec![
      Contact {
        display_name: "Mom".into(),
        phone_number: "9998887777".into(),
        dialing_code: "+91".into(),
      },
      Contact {
        display_name: "Dad".into(),
        phone_number: "9997776666".into(),
        dialing_code: "+91".into(),
      },
    ],
  )
  .unwrap()
}

fn request(user_id: Uuid) -> TriggerRequest {
  TriggerRequest {
    user_id,
    display_name: "Asha".into(),
    latitude: 12.34,
    longitude: 56.78,
    address: None,
  }
}

async fn setup(
  gateway: StubGateway,
) -> (Arc<SqliteStore>, Arc<StubGateway>, AlertDispatcher<SqliteStore, StubGateway>)
{
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let gateway = Arc::new(gateway);
  let dispatcher =
    AlertDispatcher::new(Arc::clone(&store), Arc::clone(&gateway), policy());
  (store, gateway, dispatcher)
}

// ─── Trigger protocol ────────────────────────────────────────────────────────

#[tokio::test]
async fn trigger_without_contacts_creates_no_event() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();

  let err = dispatcher.trigger(request(user)).await.unwrap_err();
  assert!(matches!(err, TriggerError::ContactsNotConfigured(u) if u == user));

  let page = store.list_alerts(&AlertQuery::default()).await.unwrap();
  assert_eq!(page.total, 0);
}

#[tokio::test]
async fn trigger_with_invalid_coordinates_is_rejected() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let mut bad = request(user);
  bad.latitude = 123.0;
  let err = dispatcher.trigger(bad).await.unwrap_err();
  assert!(matches!(err, TriggerError::InvalidLocation(_)));

  let page = store.list_alerts(&AlertQuery::default()).await.unwrap();
  assert_eq!(page.total, 0);
}

#[tokio::test]
async fn trigger_returns_event_before_delivery_completes() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();

  // The synchronous response is the trigger-time snapshot.
  let event = &triggered.event;
  assert_eq!(event.status, OverallStatus::Sent);
  assert_eq!(event.deliveries[0].phone_number, MOM);
  assert_eq!(event.deliveries[1].phone_number, DAD);
  for record in &event.deliveries {
    assert_eq!(record.state, DeliveryState::Sent);
    assert!(record.provider_response.is_none());
  }

  triggered.settled().await;
}

// ─── Delivery outcomes ───────────────────────────────────────────────────────

#[tokio::test]
async fn both_deliveries_succeed_on_first_attempt() {
  let (store, gateway, dispatcher) = setup(StubGateway::new([
    (MOM, Script::AlwaysSucceed),
    (DAD, Script::AlwaysSucceed),
  ]))
  .await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::Sent);
  for record in &event.deliveries {
    assert_eq!(record.state, DeliveryState::Delivered);
    assert!(record.delivered_at.is_some());
    assert!(record.failed_at.is_none());
  }
  assert_eq!(gateway.attempts_for(MOM), 1);
  assert_eq!(gateway.attempts_for(DAD), 1);
}

#[tokio::test]
async fn failed_then_retried_delivery_recovers() {
  let (store, gateway, dispatcher) = setup(StubGateway::new([
    (MOM, Script::AlwaysSucceed),
    (DAD, Script::FailThenSucceed),
  ]))
  .await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::Sent);

  let dad = &event.deliveries[1];
  assert_eq!(dad.state, DeliveryState::Delivered);
  // The first attempt's failure stays recorded next to the delivery.
  assert!(dad.failed_at.is_some());
  assert!(dad.delivered_at.is_some());
  assert!(dad.delivered_at.unwrap() >= dad.failed_at.unwrap());

  assert_eq!(gateway.attempts_for(MOM), 1);
  assert_eq!(gateway.attempts_for(DAD), 2);
}

#[tokio::test]
async fn permanent_failure_of_both_contacts() {
  let (store, gateway, dispatcher) = setup(StubGateway::new([
    (MOM, Script::AlwaysFail),
    (DAD, Script::AlwaysFail),
  ]))
  .await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::Failed);
  for record in &event.deliveries {
    assert_eq!(record.state, DeliveryState::Failed);
    assert!(record.failed_at.is_some());
    assert!(
      record
        .provider_response
        .as_deref()
        .unwrap()
        .contains("unreachable")
    );
  }

  // Exactly one retry per contact: two attempts, never three or one.
  assert_eq!(gateway.attempts_for(MOM), 2);
  assert_eq!(gateway.attempts_for(DAD), 2);
}

#[tokio::test]
async fn single_permanent_failure_is_partial() {
  let (store, gateway, dispatcher) = setup(StubGateway::new([
    (MOM, Script::AlwaysSucceed),
    (DAD, Script::AlwaysFail),
  ]))
  .await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::PartialFailed);
  assert_eq!(event.deliveries[0].state, DeliveryState::Delivered);
  assert_eq!(event.deliveries[1].state, DeliveryState::Failed);
  assert_eq!(gateway.attempts_for(MOM), 1);
  assert_eq!(gateway.attempts_for(DAD), 2);
}

#[tokio::test]
async fn gateway_timeout_is_a_failed_attempt() {
  let (store, gateway, dispatcher) =
    setup(StubGateway::new([(MOM, Script::Hang), (DAD, Script::Hang)])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::Failed);
  for record in &event.deliveries {
    assert_eq!(record.state, DeliveryState::Failed);
    assert!(
      record.provider_response.as_deref().unwrap().contains("timed out")
    );
  }
  assert_eq!(gateway.attempts_for(MOM), 2);
  assert_eq!(gateway.attempts_for(DAD), 2);
}

#[tokio::test]
async fn both_contacts_receive_identical_text() {
  let (store, gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  dispatcher.trigger(request(user)).await.unwrap().settled().await;

  let mom_messages = gateway.messages_for(MOM);
  let dad_messages = gateway.messages_for(DAD);
  assert_eq!(mom_messages.len(), 1);
  assert_eq!(mom_messages, dad_messages);
  assert!(mom_messages[0].contains("Asha needs help"));
  assert!(mom_messages[0].contains("https://maps.google.com/?q=12.34,56.78"));
}

// ─── Admin service ───────────────────────────────────────────────────────────

#[tokio::test]
async fn admin_details_and_resolve() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  let operator = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let alert_id = dispatcher
    .trigger(request(user))
    .await
    .unwrap()
    .settled()
    .await
    .alert_id;

  let admin = AlertAdminService::new(Arc::clone(&store));

  let details = admin.details(alert_id).await.unwrap();
  assert_eq!(details.alert_id, alert_id);

  let resolved = admin.resolve(alert_id, operator).await.unwrap();
  assert_eq!(resolved.status, OverallStatus::Resolved);
  assert!(resolved.resolved_at.is_some());
  assert_eq!(resolved.resolved_by, Some(operator));

  let err = admin.details(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, AdminError::NotFound(_)));

  let err = admin.resolve(Uuid::new_v4(), operator).await.unwrap_err();
  assert!(matches!(err, AdminError::NotFound(_)));
}

#[tokio::test]
async fn resolution_survives_late_delivery_outcome() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let triggered = dispatcher.trigger(request(user)).await.unwrap();
  let alert_id = triggered.event.alert_id;

  let admin = AlertAdminService::new(Arc::clone(&store));
  admin.resolve(alert_id, Uuid::new_v4()).await.unwrap();

  // Deliveries settle after the operator already closed the event.
  triggered.settled().await;

  let event = store.get_alert(alert_id).await.unwrap().unwrap();
  assert_eq!(event.status, OverallStatus::Resolved);
  assert!(
    event.deliveries.iter().all(|r| r.state == DeliveryState::Delivered)
  );
}

/// A store that is always offline, for the read-degradation contract.
struct FailingStore;

#[derive(Debug, thiserror::Error)]
#[error("store offline")]
struct OfflineError;

impl AlertEventStore for FailingStore {
  type Error = OfflineError;

  async fn create_alert(
    &self,
    _event: mayday_core::alert::AlertEvent,
  ) -> Result<mayday_core::alert::AlertEvent, OfflineError> {
    Err(OfflineError)
  }

  async fn get_alert(
    &self,
    _alert_id: Uuid,
  ) -> Result<Option<mayday_core::alert::AlertEvent>, OfflineError> {
    Err(OfflineError)
  }

  async fn apply_delivery_outcome(
    &self,
    _alert_id: Uuid,
    _slot: usize,
    _outcome: mayday_core::alert::DeliveryOutcome,
  ) -> Result<mayday_core::alert::AlertEvent, OfflineError> {
    Err(OfflineError)
  }

  async fn list_alerts(
    &self,
    _query: &AlertQuery,
  ) -> Result<mayday_core::store::AlertPage, OfflineError> {
    Err(OfflineError)
  }

  async fn resolve_alert(
    &self,
    _alert_id: Uuid,
    _operator_id: Uuid,
  ) -> Result<Option<mayday_core::alert::AlertEvent>, OfflineError> {
    Err(OfflineError)
  }
}

#[tokio::test]
async fn admin_list_degrades_to_empty_page() {
  let admin = AlertAdminService::new(Arc::new(FailingStore));

  let page = admin.list(&AlertQuery::default()).await;
  assert!(page.events.is_empty());
  assert_eq!(page.total, 0);
  assert_eq!(page.page, 1);
}

#[tokio::test]
async fn admin_resolve_propagates_store_failure() {
  let admin = AlertAdminService::new(Arc::new(FailingStore));

  let err =
    admin.resolve(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, AdminError::Store(_)));
}

// ─── CSV export ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn csv_export_includes_delivery_states() {
  let (store, _gateway, dispatcher) = setup(StubGateway::new([])).await;
  let user = Uuid::new_v4();
  store.save_contacts(contact_set(user)).await.unwrap();

  let alert_id = dispatcher
    .trigger(request(user))
    .await
    .unwrap()
    .settled()
    .await
    .alert_id;

  let page = store.list_alerts(&AlertQuery::default()).await.unwrap();
  let csv = to_csv(&page.events);

  let mut lines = csv.lines();
  assert!(lines.next().unwrap().starts_with("alert_id,user_id,"));
  let row = lines.next().unwrap();
  assert!(row.contains(&alert_id.to_string()));
  assert!(row.contains(MOM));
  assert!(row.contains("DELIVERED"));
  assert_eq!(lines.next(), None);
}

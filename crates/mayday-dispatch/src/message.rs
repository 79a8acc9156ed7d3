//! Composition of the alert text sent to both contacts.

use mayday_core::alert::AlertEvent;

/// Build the message once per event; both contacts receive identical text.
///
/// The address is preferred when the user supplied one; otherwise the raw
/// coordinates are spelled out next to the map link.
pub fn compose(display_name: &str, event: &AlertEvent) -> String {
  let place = match &event.address {
    Some(address) => address.clone(),
    None => format!("{}, {}", event.latitude, event.longitude),
  };

  format!(
    "EMERGENCY: {display_name} needs help.\n\
     Location: {place}\n\
     Map: {map_link}\n\
     Triggered at {time} UTC",
    map_link = event.map_link,
    time = event.triggered_at.format("%Y-%m-%d %H:%M"),
  )
}

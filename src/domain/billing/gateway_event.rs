//! Gateway webhook payloads and the event-type mapping.
//!
//! The gateway's payload schema is only partially known, so parsing is
//! lenient: every field is optional and unknown event names map to
//! `EventAction::Ignore`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::webhook_event::payload_hash;
use super::WebhookError;

/// What a webhook does to the subscription record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Renewal charge succeeded: extend and activate.
    Charged,
    /// Subscription cancelled at the gateway.
    Cancelled,
    /// Renewal charge failed: mark past due.
    Failed,
    /// Acknowledge without touching the ledger.
    Ignore,
}

/// Maps external event names to actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventTypeMap {
    actions: HashMap<String, EventAction>,
}

impl EventTypeMap {
    /// Builds a map from overrides layered on top of the defaults.
    pub fn with_overrides(overrides: &HashMap<String, EventAction>) -> Self {
        let mut map = Self::default();
        for (name, action) in overrides {
            map.actions.insert(name.clone(), *action);
        }
        map
    }

    /// Action for an event name. Unmapped names are ignored.
    pub fn action_for(&self, event_type: &str) -> EventAction {
        self.actions
            .get(event_type)
            .copied()
            .unwrap_or(EventAction::Ignore)
    }
}

impl Default for EventTypeMap {
    fn default() -> Self {
        let actions = [
            ("subscription.charged", EventAction::Charged),
            ("subscription.cancelled", EventAction::Cancelled),
            ("payment.failed", EventAction::Failed),
        ]
        .into_iter()
        .map(|(name, action)| (name.to_string(), action))
        .collect();
        Self { actions }
    }
}

/// Fields extracted from a verified webhook body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    /// Dedup key: header id, else body `id`, else hash of the body.
    pub event_id: String,
    pub event_type: String,
    pub subscription_id: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    id: Option<String>,
    event: Option<String>,
    #[serde(default)]
    payload: Value,
}

impl GatewayEvent {
    /// Parses a body whose signature has already been verified.
    ///
    /// `header_event_id` takes precedence over any id found in the body.
    pub fn parse(raw_body: &[u8], header_event_id: Option<&str>) -> Result<Self, WebhookError> {
        let envelope: RawEnvelope = serde_json::from_slice(raw_body)
            .map_err(|e| WebhookError::ParseError(e.to_string()))?;

        let event_type = envelope
            .event
            .filter(|e| !e.is_empty())
            .ok_or(WebhookError::MissingField("event"))?;

        let event_id = header_event_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or(envelope.id.filter(|id| !id.is_empty()))
            .unwrap_or_else(|| payload_hash(raw_body));

        let payment = entity(&envelope.payload, "payment");
        let subscription_id = entity(&envelope.payload, "subscription")
            .and_then(|s| string_field(s, "id"))
            .or_else(|| payment.and_then(|p| string_field(p, "subscription_id")));
        let payment_id = payment.and_then(|p| string_field(p, "id"));

        Ok(Self {
            event_id,
            event_type,
            subscription_id,
            payment_id,
        })
    }
}

/// `payload.<name>.entity`
fn entity<'a>(payload: &'a Value, name: &str) -> Option<&'a Value> {
    payload.get(name).and_then(|v| v.get("entity"))
}

fn string_field(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

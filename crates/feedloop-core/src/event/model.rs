use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kind::{EventType, UnknownEventType};

static NULL: Value = Value::Null;

/// User behind an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Initiator {
    #[serde(default)]
    pub user: Option<User>,
}

/// One decoded event. Has no identity beyond its position in a batch;
/// `id` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub initiator: Initiator,
    #[serde(default)]
    pub payload: Value,
}

impl Event {
    pub fn new(event_type: EventType, username: &str, body: Value) -> Self {
        let mut payload = serde_json::Map::new();
        payload.insert(event_type.payload_field().to_string(), body);
        Self {
            id: None,
            event_type: event_type.as_str().to_string(),
            timestamp: None,
            initiator: Initiator {
                user: Some(User {
                    username: Some(username.to_string()),
                    ..User::default()
                }),
            },
            payload: Value::Object(payload),
        }
    }

    pub fn kind(&self) -> Result<EventType, UnknownEventType> {
        self.event_type.parse()
    }

    pub fn initiator_username(&self) -> Option<&str> {
        self.initiator.user.as_ref()?.username.as_deref()
    }

    /// Body for this event's type, or `Null` when the field is missing.
    pub fn body(&self, kind: EventType) -> &Value {
        self.payload.get(kind.payload_field()).unwrap_or(&NULL)
    }
}

/// Result of one feed read: the next cursor and the (possibly empty) batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBatch {
    #[serde(default)]
    pub ack_id: String,
    #[serde(default)]
    pub events: Vec<Event>,
}

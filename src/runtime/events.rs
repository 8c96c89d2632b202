// ABOUTME: Typed engine event as written by the system events stream.
// ABOUTME: Covers current (Type/Action/Actor) and legacy (status/id/from) fields.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One event. Unknown fields are ignored, missing ones default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventMessage {
    /// Object type: `container`, `image`, `network`, `volume`, ...
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Action")]
    pub action: String,
    #[serde(rename = "Actor")]
    pub actor: EventActor,
    /// `local` or `swarm`.
    pub scope: String,
    /// Unix seconds.
    pub time: i64,
    #[serde(rename = "timeNano")]
    pub time_nano: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

/// Object an event is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventActor {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Attributes")]
    pub attributes: HashMap<String, String>,
}

impl EventMessage {
    /// Actor name attribute, falling back to a short id.
    pub fn actor_name(&self) -> &str {
        match self.actor.attributes.get("name") {
            Some(name) => name.as_str(),
            None => self.actor.id.get(..12).unwrap_or(self.actor.id.as_str()),
        }
    }
}

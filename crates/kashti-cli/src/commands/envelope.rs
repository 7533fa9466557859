//! Event envelope parsing.
//!
//! The host runtime delivers events as JSON envelopes; the provider
//! payload inside may be a pre-encoded string or an inline object.

use serde::Deserialize;

use kashti_core::event::{Event, EventKind, Revision};

#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(rename = "buildID", default)]
    build_id: String,
    #[serde(default)]
    payload: serde_json::Value,
    #[serde(default)]
    revision: RevisionEnvelope,
}

#[derive(Debug, Default, Deserialize)]
struct RevisionEnvelope {
    #[serde(default)]
    commit: String,
    #[serde(default, rename = "ref")]
    r#ref: String,
}

impl EventEnvelope {
    pub fn into_event(self) -> Event {
        let payload = match self.payload {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        };

        Event {
            kind: EventKind::parse(&self.kind),
            build_id: self.build_id,
            payload,
            revision: Revision {
                commit: self.revision.commit,
                r#ref: self.revision.r#ref,
            },
        }
    }
}

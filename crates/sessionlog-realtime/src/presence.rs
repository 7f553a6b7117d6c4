//! Join/leave announcements.
//!
//! Relayed client payloads are opaque; presence notices are the one message
//! the server itself originates, so they carry a `type` tag.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Joined,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "presence")]
pub struct PresenceNotice {
    pub client_id: String,
    pub status: PresenceStatus,
}

impl PresenceNotice {
    pub fn joined(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            status: PresenceStatus::Joined,
        }
    }

    pub fn left(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            status: PresenceStatus::Left,
        }
    }

    pub fn to_json(&self) -> String {
        // Plain struct of strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn notice_wire_shape() {
        let value: serde_json::Value =
            serde_json::from_str(&PresenceNotice::left("bob").to_json()).unwrap();
        assert_eq!(
            value,
            json!({"type": "presence", "client_id": "bob", "status": "left"})
        );
    }

    #[test]
    fn notice_parses_back() {
        let raw = r#"{"type":"presence","client_id":"alice","status":"joined"}"#;
        let notice: PresenceNotice = serde_json::from_str(raw).unwrap();
        assert_eq!(notice, PresenceNotice::joined("alice"));
    }
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use memento_core::reactions::ReactionMap;

use crate::models::{ChatMessage, DirectoryRecord, Moment, Notification};

/// Events pushed over the WebSocket gateway. Records are always sent whole;
/// receivers replace what they hold instead of merging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful authentication
    Ready { user_id: Uuid, username: String },

    /// A user came online or went offline
    PresenceUpdate {
        user_id: Uuid,
        username: String,
        online: bool,
    },

    /// A user started typing in the public chat
    TypingStart { user_id: Uuid, username: String },

    MessageCreate { message: ChatMessage },

    /// Edited or soft-deleted message
    MessageUpdate { message: ChatMessage },

    ReactionsUpdate {
        message_id: Uuid,
        reactions: ReactionMap,
    },

    /// Someone saved their profile
    ProfileUpdate { record: DirectoryRecord },

    /// New moment or fresh counters on an existing one
    MomentUpsert { moment: Moment },

    /// Targeted at the recipient only
    NotificationCreate { notification: Notification },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    StartTyping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_wire_format() {
        let id = Uuid::nil();
        let event = GatewayEvent::ReactionsUpdate {
            message_id: id,
            reactions: ReactionMap::new(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ReactionsUpdate");
        assert_eq!(json["data"]["reactions"], serde_json::json!({}));

        let cmd: GatewayCommand = serde_json::from_str(r#"{"type":"Identify","data":{"token":"t"}}"#).unwrap();
        assert!(matches!(cmd, GatewayCommand::Identify { token } if token == "t"));

        let typing: GatewayCommand = serde_json::from_str(r#"{"type":"StartTyping"}"#).unwrap();
        assert!(matches!(typing, GatewayCommand::StartTyping));
    }
}

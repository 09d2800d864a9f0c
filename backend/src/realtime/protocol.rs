use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{Couple, UserPublic};

/// Messages a socket may send. `coupleId` arrives as a string and is parsed
/// during the join handshake so a malformed id degrades to a validation
/// error rather than a dropped frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    #[serde(rename_all = "camelCase")]
    JoinCoupleRoom { user_id: String, couple_id: String },
    /// Opaque collaboration payload; relayed verbatim to the rest of the
    /// room with the sender stamped on.
    CollaborationUpdate {
        #[serde(flatten)]
        data: Map<String, Value>,
    },
}

/// Messages the relay emits. Lifecycle variants (`couple-bound`,
/// `couple-unbound`) originate from the pairing service, the rest from
/// socket activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    JoinedRoom { couple_id: Uuid },
    Error {
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    RemoteUpdate {
        #[serde(flatten)]
        data: Map<String, Value>,
        from_user_id: String,
    },
    CoupleBound {
        couple: Couple,
        users: Vec<UserPublic>,
    },
    #[serde(rename_all = "camelCase")]
    CoupleUnbound { couple_id: Uuid },
    #[serde(rename_all = "camelCase")]
    PartnerOnline { user_id: String },
    #[serde(rename_all = "camelCase")]
    PartnerOffline { user_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn join_message_parses_camel_case_fields() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "join-couple-room",
            "userId": "u1",
            "coupleId": "7d4f9763-55ec-4f73-a0d1-0f0a92f4d1a1",
        }))
        .unwrap();

        match msg {
            ClientMessage::JoinCoupleRoom { user_id, couple_id } => {
                assert_eq!(user_id, "u1");
                assert_eq!(couple_id, "7d4f9763-55ec-4f73-a0d1-0f0a92f4d1a1");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn collaboration_update_keeps_arbitrary_fields() {
        let msg: ClientMessage = serde_json::from_value(json!({
            "type": "collaboration-update",
            "kind": "x",
            "payload": { "nested": true },
        }))
        .unwrap();

        let ClientMessage::CollaborationUpdate { data } = msg else {
            panic!("expected collaboration-update");
        };
        assert_eq!(data["kind"], "x");
        assert_eq!(data["payload"]["nested"], true);
        // The tag is consumed by the envelope, not relayed as payload.
        assert!(!data.contains_key("type"));
    }

    #[test]
    fn remote_update_adds_sender_and_keeps_payload() {
        let mut data = Map::new();
        data.insert("kind".to_string(), json!("x"));

        let out = serde_json::to_value(ServerMessage::RemoteUpdate {
            data,
            from_user_id: "u1".to_string(),
        })
        .unwrap();

        assert_eq!(out["type"], "remote-update");
        assert_eq!(out["kind"], "x");
        assert_eq!(out["fromUserId"], "u1");
    }

    #[test]
    fn lifecycle_and_presence_tags_are_kebab_case() {
        let couple_id = Uuid::new_v4();
        let cases = [
            (
                serde_json::to_value(ServerMessage::JoinedRoom { couple_id }).unwrap(),
                "joined-room",
            ),
            (
                serde_json::to_value(ServerMessage::CoupleUnbound { couple_id }).unwrap(),
                "couple-unbound",
            ),
            (
                serde_json::to_value(ServerMessage::PartnerOnline {
                    user_id: "u1".to_string(),
                })
                .unwrap(),
                "partner-online",
            ),
            (
                serde_json::to_value(ServerMessage::PartnerOffline {
                    user_id: "u1".to_string(),
                })
                .unwrap(),
                "partner-offline",
            ),
            (
                serde_json::to_value(ServerMessage::Error {
                    message: "无效的绑定关系".to_string(),
                })
                .unwrap(),
                "error",
            ),
        ];

        for (value, tag) in cases {
            assert_eq!(value["type"], tag);
        }
    }
}

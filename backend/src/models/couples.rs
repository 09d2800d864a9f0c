use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::UserPublic;

/// Normalizes a pair of member ids to `(min, max)` so that a couple row can
/// be found by either member in either argument order with a single lookup.
pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b { (a, b) } else { (b, a) }
}

/// An active pairing between exactly two users. `user1_id < user2_id` always
/// holds; the database enforces it alongside a partial unique index on the
/// active pair.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Couple {
    pub id: Uuid,
    pub user1_id: String,
    pub user2_id: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Couple {
    pub fn contains(&self, user_id: &str) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other member's id, if `user_id` is a member at all.
    pub fn partner_of(&self, user_id: &str) -> Option<&str> {
        if self.user1_id == user_id {
            Some(&self.user2_id)
        } else if self.user2_id == user_id {
            Some(&self.user1_id)
        } else {
            None
        }
    }
}

/// A one-directional pairing proposal. Unique per (from, to); re-sending
/// refreshes `created_at` instead of inserting a second row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PairRequest {
    pub id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A pending request as shown to its recipient, sender identity attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingRequest {
    #[serde(flatten)]
    pub request: PairRequest,
    pub from_user: UserPublic,
}

/// A couple as seen from one member's side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupleWithPartner {
    pub couple: Couple,
    pub partner: UserPublic,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn couple(a: &str, b: &str) -> Couple {
        let (u1, u2) = ordered_pair(a, b);
        Couple {
            id: Uuid::new_v4(),
            user1_id: u1.to_string(),
            user2_id: u2.to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ordered_pair_is_argument_order_independent() {
        assert_eq!(ordered_pair("u1", "u2"), ("u1", "u2"));
        assert_eq!(ordered_pair("u2", "u1"), ("u1", "u2"));
        assert_eq!(ordered_pair("a", "a"), ("a", "a"));
    }

    #[test]
    fn partner_resolves_from_either_side() {
        let c = couple("u2", "u1");
        assert_eq!(c.user1_id, "u1");
        assert_eq!(c.user2_id, "u2");
        assert_eq!(c.partner_of("u1"), Some("u2"));
        assert_eq!(c.partner_of("u2"), Some("u1"));
        assert_eq!(c.partner_of("u3"), None);
        assert!(c.contains("u1") && c.contains("u2"));
        assert!(!c.contains("u3"));
    }

    #[test]
    fn incoming_request_flattens_request_fields() {
        let req = IncomingRequest {
            request: PairRequest {
                id: Uuid::new_v4(),
                from_user_id: "u1".to_string(),
                to_user_id: "u2".to_string(),
                created_at: Utc::now(),
            },
            from_user: UserPublic {
                id: "u1".to_string(),
                username: "阿明".to_string(),
                avatar_url: None,
            },
        };

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["fromUserId"], "u1");
        assert_eq!(json["toUserId"], "u2");
        assert_eq!(json["fromUser"]["username"], "阿明");
    }
}

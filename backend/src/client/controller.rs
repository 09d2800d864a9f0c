use uuid::Uuid;

use crate::client::api::{ClientError, PairingApi};
use crate::models::{CoupleWithPartner, IncomingRequest};
use crate::realtime::ServerMessage;

/// Locally cached view of the pairing state. Mutated only on confirmed HTTP
/// responses or relay events — there is no optimistic write.
#[derive(Debug, Default)]
pub struct PairingState {
    pub couple: Option<CoupleWithPartner>,
    pub connected: bool,
    pub partner_online: bool,
    pub pending: Vec<IncomingRequest>,
    pub last_error: Option<String>,
}

/// Drives the pairing flow for one signed-in user: write-through operations
/// against the service, plus `handle_relay` fed by the channel task.
pub struct PairingController {
    api: PairingApi,
    user_id: String,
    pub state: PairingState,
}

impl PairingController {
    pub fn new(api: PairingApi, user_id: impl Into<String>) -> Self {
        Self {
            api,
            user_id: user_id.into(),
            state: PairingState::default(),
        }
    }

    pub fn couple_id(&self) -> Option<Uuid> {
        self.state.couple.as_ref().map(|view| view.couple.id)
    }

    pub fn partner_id(&self) -> Option<&str> {
        self.state
            .couple
            .as_ref()
            .map(|view| view.partner.id.as_str())
    }

    /// Stores the error message for display and hands the value on.
    fn record<T>(&mut self, result: Result<T, ClientError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.state.last_error = None;
                Some(value)
            }
            Err(err) => {
                self.state.last_error = Some(err.to_string());
                None
            }
        }
    }

    pub async fn load_relation(&mut self) -> bool {
        let result = self.api.relation().await;
        match self.record(result) {
            Some(view) => {
                self.state.couple = view;
                true
            }
            None => false,
        }
    }

    pub async fn load_requests(&mut self) -> bool {
        let result = self.api.pending_requests().await;
        match self.record(result) {
            Some(pending) => {
                self.state.pending = pending;
                true
            }
            None => false,
        }
    }

    pub async fn bind(&mut self, partner_id: &str) -> bool {
        let result = self.api.bind(partner_id).await;
        self.record(result).is_some()
    }

    pub async fn accept(&mut self, request_id: Uuid) -> bool {
        let result = self.api.accept(request_id).await;
        match self.record(result) {
            Some(response) => {
                self.state.couple = Some(CoupleWithPartner {
                    couple: response.couple,
                    partner: response.partner,
                });
                self.state.pending.retain(|r| r.request.id != request_id);
                true
            }
            None => false,
        }
    }

    pub async fn reject(&mut self, request_id: Uuid) -> bool {
        let result = self.api.reject(request_id).await;
        match self.record(result) {
            Some(_) => {
                self.state.pending.retain(|r| r.request.id != request_id);
                true
            }
            None => false,
        }
    }

    pub async fn unbind(&mut self) -> bool {
        let result = self.api.unbind().await;
        match self.record(result) {
            Some(()) => {
                self.clear_relation();
                true
            }
            None => false,
        }
    }

    fn clear_relation(&mut self) {
        self.state.couple = None;
        self.state.partner_online = false;
    }

    /// Applies one relay event to the cache. `couple-bound` merges straight
    /// from the payload; `remote-update` is the embedding application's to
    /// interpret, so it passes through untouched.
    pub fn handle_relay(&mut self, event: ServerMessage) -> Option<ServerMessage> {
        match event {
            ServerMessage::JoinedRoom { .. } => {
                self.state.connected = true;
                None
            }
            ServerMessage::CoupleBound { couple, users } => {
                let partner = users.into_iter().find(|user| user.id != self.user_id);
                if let Some(partner) = partner {
                    self.state.couple = Some(CoupleWithPartner { couple, partner });
                }
                None
            }
            ServerMessage::CoupleUnbound { .. } => {
                self.clear_relation();
                self.state.connected = false;
                None
            }
            ServerMessage::PartnerOnline { .. } => {
                self.state.partner_online = true;
                None
            }
            ServerMessage::PartnerOffline { .. } => {
                self.state.partner_online = false;
                None
            }
            ServerMessage::Error { message } => {
                self.state.last_error = Some(message);
                None
            }
            update @ ServerMessage::RemoteUpdate { .. } => Some(update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Couple, UserPublic, ordered_pair};
    use chrono::Utc;
    use serde_json::Map;

    fn controller() -> PairingController {
        PairingController::new(PairingApi::new("http://localhost:3000", "token"), "u1")
    }

    fn bound_event() -> ServerMessage {
        let (u1, u2) = ordered_pair("u1", "u2");
        ServerMessage::CoupleBound {
            couple: Couple {
                id: Uuid::new_v4(),
                user1_id: u1.to_string(),
                user2_id: u2.to_string(),
                active: true,
                created_at: Utc::now(),
            },
            users: vec![
                UserPublic {
                    id: "u1".to_string(),
                    username: "阿明".to_string(),
                    avatar_url: None,
                },
                UserPublic {
                    id: "u2".to_string(),
                    username: "小雨".to_string(),
                    avatar_url: None,
                },
            ],
        }
    }

    #[test]
    fn couple_bound_merges_partner_from_payload() {
        let mut ctl = controller();
        ctl.handle_relay(bound_event());

        assert_eq!(ctl.partner_id(), Some("u2"));
        assert!(ctl.couple_id().is_some());
    }

    #[test]
    fn couple_unbound_clears_the_cache() {
        let mut ctl = controller();
        ctl.handle_relay(bound_event());
        ctl.handle_relay(ServerMessage::PartnerOnline {
            user_id: "u2".to_string(),
        });
        assert!(ctl.state.partner_online);

        let couple_id = ctl.couple_id().unwrap();
        ctl.handle_relay(ServerMessage::CoupleUnbound { couple_id });

        assert!(ctl.state.couple.is_none());
        assert!(!ctl.state.partner_online);
    }

    #[test]
    fn presence_events_flip_the_flag() {
        let mut ctl = controller();
        ctl.handle_relay(ServerMessage::PartnerOnline {
            user_id: "u2".to_string(),
        });
        assert!(ctl.state.partner_online);
        ctl.handle_relay(ServerMessage::PartnerOffline {
            user_id: "u2".to_string(),
        });
        assert!(!ctl.state.partner_online);
    }

    #[test]
    fn joined_room_sets_connected() {
        let mut ctl = controller();
        assert!(!ctl.state.connected);
        ctl.handle_relay(ServerMessage::JoinedRoom {
            couple_id: Uuid::new_v4(),
        });
        assert!(ctl.state.connected);
    }

    #[test]
    fn remote_update_passes_through() {
        let mut ctl = controller();
        let mut data = Map::new();
        data.insert("kind".to_string(), serde_json::json!("x"));
        let passed = ctl.handle_relay(ServerMessage::RemoteUpdate {
            data,
            from_user_id: "u2".to_string(),
        });
        assert!(matches!(passed, Some(ServerMessage::RemoteUpdate { .. })));
    }

    #[test]
    fn relay_error_surfaces_as_last_error() {
        let mut ctl = controller();
        ctl.handle_relay(ServerMessage::Error {
            message: "无效的绑定关系".to_string(),
        });
        assert_eq!(ctl.state.last_error.as_deref(), Some("无效的绑定关系"));
    }
}

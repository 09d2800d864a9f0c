use std::collections::HashMap;

use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use crate::realtime::protocol::ServerMessage;

/// Ephemeral room membership: couple id → connected sockets. Constructed
/// once at process start and shared through `AppState`; nothing here is
/// persisted, so after a restart every socket must rejoin.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: Mutex<HashMap<Uuid, HashMap<Uuid, UnboundedSender<ServerMessage>>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn join(
        &self,
        couple_id: Uuid,
        socket_id: Uuid,
        tx: UnboundedSender<ServerMessage>,
    ) {
        let mut rooms = self.rooms.lock().await;
        rooms.entry(couple_id).or_default().insert(socket_id, tx);
    }

    /// Removes one socket; the room entry is dropped once empty.
    pub async fn leave(&self, couple_id: Uuid, socket_id: Uuid) {
        let mut rooms = self.rooms.lock().await;
        if let Some(members) = rooms.get_mut(&couple_id) {
            members.remove(&socket_id);
            if members.is_empty() {
                rooms.remove(&couple_id);
            }
        }
    }

    /// Fan-out to every socket in the room. A room nobody has joined yet is
    /// a no-op, not an error.
    pub async fn broadcast(&self, couple_id: Uuid, message: &ServerMessage) {
        self.send_to_room(couple_id, None, message).await;
    }

    /// Fan-out to every socket in the room except the sender.
    pub async fn broadcast_except(
        &self,
        couple_id: Uuid,
        sender_socket: Uuid,
        message: &ServerMessage,
    ) {
        self.send_to_room(couple_id, Some(sender_socket), message).await;
    }

    /// Broadcasts the unbound notice, then tears the room down.
    pub async fn notify_unbound(&self, couple_id: Uuid) {
        self.broadcast(couple_id, &ServerMessage::CoupleUnbound { couple_id })
            .await;
        self.drop_room(couple_id).await;
    }

    pub async fn drop_room(&self, couple_id: Uuid) {
        self.rooms.lock().await.remove(&couple_id);
    }

    pub async fn room_size(&self, couple_id: Uuid) -> usize {
        self.rooms
            .lock()
            .await
            .get(&couple_id)
            .map_or(0, HashMap::len)
    }

    async fn send_to_room(&self, couple_id: Uuid, skip: Option<Uuid>, message: &ServerMessage) {
        let rooms = self.rooms.lock().await;
        if let Some(members) = rooms.get(&couple_id) {
            for (socket_id, tx) in members {
                if Some(*socket_id) == skip {
                    continue;
                }
                // A closed receiver just means that socket is tearing down.
                let _ = tx.send(message.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member() -> (
        Uuid,
        UnboundedSender<ServerMessage>,
        mpsc::UnboundedReceiver<ServerMessage>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    #[tokio::test]
    async fn broadcast_reaches_all_members() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let (a, tx_a, mut rx_a) = member();
        let (b, tx_b, mut rx_b) = member();
        registry.join(room, a, tx_a).await;
        registry.join(room, b, tx_b).await;

        registry
            .broadcast(room, &ServerMessage::CoupleUnbound { couple_id: room })
            .await;

        assert!(matches!(
            rx_a.try_recv(),
            Ok(ServerMessage::CoupleUnbound { .. })
        ));
        assert!(matches!(
            rx_b.try_recv(),
            Ok(ServerMessage::CoupleUnbound { .. })
        ));
    }

    #[tokio::test]
    async fn broadcast_except_skips_the_sender() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let (a, tx_a, mut rx_a) = member();
        let (b, tx_b, mut rx_b) = member();
        registry.join(room, a, tx_a).await;
        registry.join(room, b, tx_b).await;

        registry
            .broadcast_except(
                room,
                a,
                &ServerMessage::PartnerOnline {
                    user_id: "u1".to_string(),
                },
            )
            .await;

        assert!(rx_a.try_recv().is_err());
        assert!(matches!(
            rx_b.try_recv(),
            Ok(ServerMessage::PartnerOnline { .. })
        ));
    }

    #[tokio::test]
    async fn broadcast_to_unknown_room_is_a_noop() {
        let registry = RoomRegistry::new();
        registry
            .broadcast(
                Uuid::new_v4(),
                &ServerMessage::PartnerOnline {
                    user_id: "u1".to_string(),
                },
            )
            .await;
    }

    #[tokio::test]
    async fn leave_drops_emptied_room() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let (a, tx_a, _rx_a) = member();
        let (b, tx_b, _rx_b) = member();
        registry.join(room, a, tx_a).await;
        registry.join(room, b, tx_b).await;
        assert_eq!(registry.room_size(room).await, 2);

        registry.leave(room, a).await;
        assert_eq!(registry.room_size(room).await, 1);

        registry.leave(room, b).await;
        assert_eq!(registry.room_size(room).await, 0);
        assert!(registry.rooms.lock().await.is_empty());
    }

    #[tokio::test]
    async fn notify_unbound_broadcasts_then_drops() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let (a, tx_a, mut rx_a) = member();
        registry.join(room, a, tx_a).await;

        registry.notify_unbound(room).await;

        assert!(matches!(
            rx_a.try_recv(),
            Ok(ServerMessage::CoupleUnbound { couple_id }) if couple_id == room
        ));
        assert_eq!(registry.room_size(room).await, 0);
    }

    #[tokio::test]
    async fn rejoin_replaces_the_previous_sender() {
        let registry = RoomRegistry::new();
        let room = Uuid::new_v4();
        let (a, tx_old, _rx_old) = member();
        let (_, tx_new, mut rx_new) = member();
        registry.join(room, a, tx_old).await;
        registry.join(room, a, tx_new).await;
        assert_eq!(registry.room_size(room).await, 1);

        registry
            .broadcast(room, &ServerMessage::CoupleUnbound { couple_id: room })
            .await;
        assert!(rx_new.try_recv().is_ok());
    }
}

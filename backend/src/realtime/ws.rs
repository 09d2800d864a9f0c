use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;
use crate::db::couples;
use crate::realtime::protocol::{ClientMessage, ServerMessage};

pub async fn couple_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: AppState, socket: WebSocket) {
    let socket_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();

    // Everything addressed to this socket funnels through one writer task.
    let forward_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let Ok(text) = serde_json::to_string(&message) else {
                continue;
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Session stamp; until join-couple-room succeeds the socket may not
    // send or receive collaboration traffic.
    let mut session: Option<(String, Uuid)> = None;

    while let Some(Ok(message)) = stream.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(client_message) = serde_json::from_str::<ClientMessage>(&text) else {
            let _ = tx.send(ServerMessage::Error {
                message: "无法解析的消息".to_string(),
            });
            continue;
        };

        match client_message {
            ClientMessage::JoinCoupleRoom { user_id, couple_id } => {
                if user_id.is_empty() || couple_id.is_empty() {
                    let _ = tx.send(ServerMessage::Error {
                        message: "缺少用户ID或绑定ID".to_string(),
                    });
                    continue;
                }

                // Join stays retryable: any failure leaves the socket
                // outside every room.
                let Ok(couple_id) = Uuid::parse_str(&couple_id) else {
                    let _ = tx.send(ServerMessage::Error {
                        message: "无效的绑定关系".to_string(),
                    });
                    continue;
                };

                match couples::relation_is_valid(&state.pool, couple_id, &user_id).await {
                    Ok(true) => {}
                    Ok(false) => {
                        let _ = tx.send(ServerMessage::Error {
                            message: "无效的绑定关系".to_string(),
                        });
                        continue;
                    }
                    Err(err) => {
                        tracing::error!("room join validation failed: {err:#}");
                        let _ = tx.send(ServerMessage::Error {
                            message: "服务器内部错误".to_string(),
                        });
                        continue;
                    }
                }

                if let Some((_, previous)) = session.take() {
                    if previous != couple_id {
                        state.rooms.leave(previous, socket_id).await;
                    }
                }

                state.rooms.join(couple_id, socket_id, tx.clone()).await;
                session = Some((user_id.clone(), couple_id));

                let _ = tx.send(ServerMessage::JoinedRoom { couple_id });
                state
                    .rooms
                    .broadcast_except(couple_id, socket_id, &ServerMessage::PartnerOnline { user_id })
                    .await;
                tracing::debug!(%couple_id, "socket joined couple room");
            }
            ClientMessage::CollaborationUpdate { data } => {
                let Some((user_id, couple_id)) = session.as_ref() else {
                    let _ = tx.send(ServerMessage::Error {
                        message: "尚未加入房间".to_string(),
                    });
                    continue;
                };

                state
                    .rooms
                    .broadcast_except(
                        *couple_id,
                        socket_id,
                        &ServerMessage::RemoteUpdate {
                            data,
                            from_user_id: user_id.clone(),
                        },
                    )
                    .await;
            }
        }
    }

    // Transport closed: leave the room and tell whoever is still there.
    if let Some((user_id, couple_id)) = session {
        state.rooms.leave(couple_id, socket_id).await;
        state
            .rooms
            .broadcast(couple_id, &ServerMessage::PartnerOffline { user_id })
            .await;
    }

    forward_task.abort();
}

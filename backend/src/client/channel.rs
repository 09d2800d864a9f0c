use anyhow::Result;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use uuid::Uuid;

use crate::realtime::{ClientMessage, ServerMessage};

/// Client side of the realtime relay. Connects, performs the room-join
/// handshake, then pumps in both directions until either side closes:
/// server events flow into `inbound`, local collaboration payloads drain
/// from `outbound`. There is no buffering beyond the transport — anything
/// sent while this task is down is simply missed, and the caller reconciles
/// by re-fetching state after reconnecting.
pub async fn run(
    ws_url: &str,
    user_id: String,
    couple_id: Uuid,
    inbound: UnboundedSender<ServerMessage>,
    mut outbound: UnboundedReceiver<Map<String, Value>>,
) -> Result<()> {
    let (stream, _) = connect_async(ws_url).await?;
    let (mut sink, mut source) = stream.split();

    let join = ClientMessage::JoinCoupleRoom {
        user_id,
        couple_id: couple_id.to_string(),
    };
    sink.send(Message::Text(serde_json::to_string(&join)?)).await?;

    loop {
        tokio::select! {
            frame = source.next() => {
                let Some(frame) = frame else { break };
                let Message::Text(text) = frame? else { continue };
                match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(event) => {
                        if inbound.send(event).is_err() {
                            break;
                        }
                    }
                    Err(err) => tracing::warn!("unrecognized relay frame: {err}"),
                }
            }
            update = outbound.recv() => {
                let Some(data) = update else { break };
                let message = ClientMessage::CollaborationUpdate { data };
                sink.send(Message::Text(serde_json::to_string(&message)?)).await?;
            }
        }
    }

    Ok(())
}

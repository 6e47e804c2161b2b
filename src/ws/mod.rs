pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::{Sink, SinkExt},
    stream::StreamExt,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::broadcast::{RoomFeed, RoomMutationEvent};
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use handlers::Seat;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Resume a seat straight away
    pub room: Option<String>,
    pub player: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={:?}, player={:?}",
        params.room,
        params.player
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Serialize and send one message. `false` once the peer is gone.
async fn send<S>(sender: &mut S, msg: &ServerMessage) -> bool
where
    S: Sink<Message> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize server message: {}", e);
            true
        }
    }
}

/// Tell the client its message could not be read
async fn reject_unparsable<S>(sender: &mut S, err: &serde_json::Error) -> bool
where
    S: Sink<Message> + Unpin,
{
    tracing::error!("Failed to parse client message: {}", err);
    let error = ServerMessage::error("PARSE_ERROR", format!("Invalid message format: {}", err));
    send(sender, &error).await
}

/// Snapshot of the seat's room, or the error if it cannot be read
async fn snapshot_message(state: &AppState, room_id: &str) -> ServerMessage {
    match state.snapshot(room_id).await {
        Ok(snapshot) => snapshot.into(),
        Err(e) => e.into(),
    }
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut seat: Option<Seat> = None;
    let mut feed: Option<RoomFeed> = None;

    if let (Some(room_code), Some(player_id)) = (params.room, params.player) {
        let resume = ClientMessage::Resume {
            room_code,
            player_id,
        };
        if let Some(reply) = handlers::handle_message(resume, &mut seat, &state).await {
            if !send(&mut sender, &reply).await {
                return;
            }
        }
    }

    loop {
        // Follow the seat: (re)subscribe whenever it moves, then resync
        let seat_room = seat.as_ref().map(|s| s.room_id.as_str());
        if feed.as_ref().map(|f| f.room_id()) != seat_room {
            feed = None;
            if let Some(room_id) = seat_room.map(str::to_string) {
                match state.subscribe(&room_id).await {
                    Ok(new_feed) => {
                        feed = Some(new_feed);
                        let snapshot = snapshot_message(&state, &room_id).await;
                        if !send(&mut sender, &snapshot).await {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Could not subscribe to room {}: {}", room_id, e);
                        seat = None;
                        if !send(&mut sender, &ServerMessage::from(e)).await {
                            break;
                        }
                    }
                }
            }
        }

        tokio::select! {
            // Room replication (only while seated)
            event = async {
                match &mut feed {
                    Some(feed) => feed.recv().await,
                    None => std::future::pending::<Option<RoomMutationEvent>>().await,
                }
            } => {
                let msg = match event {
                    Some(RoomMutationEvent::RoomUpdated(room)) => ServerMessage::RoomState { room },
                    Some(RoomMutationEvent::Roster(event)) => event.into(),
                    Some(RoomMutationEvent::Lagged { missed }) => {
                        let Some(room_id) = seat.as_ref().map(|s| s.room_id.clone()) else {
                            continue;
                        };
                        tracing::warn!(
                            "Connection fell {} events behind in room {}, resyncing",
                            missed,
                            room_id
                        );
                        snapshot_message(&state, &room_id).await
                    }
                    None => {
                        feed = None;
                        continue;
                    }
                };
                if !send(&mut sender, &msg).await {
                    break;
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &mut seat, &state).await
                                {
                                    if !send(&mut sender, &response).await {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                if !reject_unparsable(&mut sender, &e).await {
                                    tracing::error!("Failed to send parse error");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // A dropped connection keeps its seat; only LeaveRoom gives it up
    tracing::info!("WebSocket connection closed for seat: {:?}", seat);
}

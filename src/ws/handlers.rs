//! WebSocket message dispatch
//!
//! Every action is validated and committed through [`AppState`]; the reply goes
//! only to the connection that sent it. Everyone in the room learns about the
//! outcome through the room's replication feed.

use crate::error::SessionError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::*;
use std::sync::Arc;

/// The seat a connection occupies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room_id: RoomId,
    pub player_id: PlayerId,
}

/// Macro to require a seat and return early if the connection has none
macro_rules! require_seat {
    ($seat:expr, $action:expr) => {
        match $seat.as_ref() {
            Some(seat) => seat.clone(),
            None => {
                return Some(ServerMessage::error(
                    "NOT_SEATED",
                    format!("Join a room before you {}", $action),
                ))
            }
        }
    };
}

/// Macro to refuse taking a second seat on one connection
macro_rules! require_no_seat {
    ($seat:expr) => {
        if let Some(seat) = $seat.as_ref() {
            return Some(ServerMessage::error(
                "ALREADY_SEATED",
                format!("Already seated in room {}", seat.room_id),
            ));
        }
    };
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    seat: &mut Option<Seat>,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom {
            nickname,
            mood_emoji,
            code,
        } => {
            require_no_seat!(seat);
            let result = state
                .create_room(code.as_deref(), &nickname, &mood_emoji)
                .await;
            Some(take_seat(seat, result.map(|(_, player)| player)))
        }

        ClientMessage::CreateSoloRoom {
            nickname,
            mood_emoji,
            mode,
        } => {
            require_no_seat!(seat);
            let result = state.create_solo_room(&nickname, &mood_emoji, mode).await;
            Some(take_seat(seat, result.map(|(_, player)| player)))
        }

        ClientMessage::JoinRoom {
            code,
            nickname,
            mood_emoji,
        } => {
            require_no_seat!(seat);
            let result = state.join_room(&code, &nickname, &mood_emoji).await;
            Some(take_seat(seat, result.map(|(_, player)| player)))
        }

        ClientMessage::Resume {
            room_code,
            player_id,
        } => {
            require_no_seat!(seat);
            let Some(room_id) = normalize_room_code(&room_code) else {
                return Some(SessionError::RoomNotFound(room_code).into());
            };
            let result = state.resume(&room_id, &player_id).await;
            if result.is_ok() {
                tracing::info!("Player {} resumed in room {}", player_id, room_id);
            }
            Some(take_seat(seat, result))
        }

        ClientMessage::StartGame { mode } => {
            let current = require_seat!(seat, "start a game");
            Some(ack(
                state
                    .start_game(&current.room_id, &current.player_id, mode)
                    .await,
            ))
        }

        ClientMessage::Draw { kind } => {
            let current = require_seat!(seat, "draw a prompt");
            Some(ack(
                state
                    .draw(&current.room_id, &current.player_id, kind)
                    .await,
            ))
        }

        ClientMessage::SubmitAnswer { text } => {
            let current = require_seat!(seat, "answer");
            Some(ack(
                state
                    .submit_answer(&current.room_id, &current.player_id, &text)
                    .await,
            ))
        }

        ClientMessage::Advance => {
            let current = require_seat!(seat, "advance the turn");
            Some(ack(
                state.advance(&current.room_id, &current.player_id).await,
            ))
        }

        ClientMessage::LeaveRoom => {
            let current = require_seat!(seat, "leave");
            match state
                .leave_room(&current.room_id, &current.player_id)
                .await
            {
                Ok(_) => {
                    *seat = None;
                    Some(ServerMessage::Left {
                        room_id: current.room_id,
                    })
                }
                Err(e) => Some(e.into()),
            }
        }
    }
}

fn take_seat(seat: &mut Option<Seat>, result: Result<Player, SessionError>) -> ServerMessage {
    match result {
        Ok(player) => {
            *seat = Some(Seat {
                room_id: player.room_id.clone(),
                player_id: player.id.clone(),
            });
            ServerMessage::Seated {
                room_id: player.room_id.clone(),
                player,
            }
        }
        Err(e) => e.into(),
    }
}

fn ack(result: Result<Room, SessionError>) -> ServerMessage {
    match result {
        Ok(room) => ServerMessage::Ack {
            version: room.version,
        },
        Err(e) => e.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seated(state: &Arc<AppState>, msg: ClientMessage) -> (Option<Seat>, Player) {
        let mut seat = None;
        match handle_message(msg, &mut seat, state).await {
            Some(ServerMessage::Seated { player, .. }) => (seat, player),
            other => panic!("Expected Seated message, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_action_without_seat() {
        let state = Arc::new(AppState::default());
        let mut seat = None;

        let result = handle_message(ClientMessage::Advance, &mut seat, &state).await;
        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "NOT_SEATED");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_create_and_join() {
        let state = Arc::new(AppState::default());
        let (mut host_seat, host) = seated(
            &state,
            ClientMessage::CreateRoom {
                nickname: "Ama".to_string(),
                mood_emoji: "😊".to_string(),
                code: None,
            },
        )
        .await;
        assert!(host.is_host);
        assert_eq!(host_seat.as_ref().unwrap().room_id, host.room_id);

        let (_, guest) = seated(
            &state,
            ClientMessage::JoinRoom {
                code: host.room_id.to_lowercase(),
                nickname: "Ben".to_string(),
                mood_emoji: "😎".to_string(),
            },
        )
        .await;
        assert!(!guest.is_host);

        // A seated connection cannot create another room
        let result = handle_message(
            ClientMessage::CreateRoom {
                nickname: "Ama".to_string(),
                mood_emoji: "😊".to_string(),
                code: None,
            },
            &mut host_seat,
            &state,
        )
        .await;
        if let Some(ServerMessage::Error { code, .. }) = result {
            assert_eq!(code, "ALREADY_SEATED");
        } else {
            panic!("Expected Error message");
        }
    }

    #[tokio::test]
    async fn test_rule_errors_reach_only_the_actor() {
        let state = Arc::new(AppState::default());
        let (mut host_seat, host) = seated(
            &state,
            ClientMessage::CreateRoom {
                nickname: "Ama".to_string(),
                mood_emoji: "😊".to_string(),
                code: None,
            },
        )
        .await;
        let (mut guest_seat, _) = seated(
            &state,
            ClientMessage::JoinRoom {
                code: host.room_id.clone(),
                nickname: "Ben".to_string(),
                mood_emoji: "😎".to_string(),
            },
        )
        .await;

        let result = handle_message(
            ClientMessage::StartGame { mode: Mode::Crush },
            &mut guest_seat,
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::Error { ref code, retryable: false, .. }) if code == "NOT_HOST"
        ));

        let result = handle_message(
            ClientMessage::StartGame { mode: Mode::Crush },
            &mut host_seat,
            &state,
        )
        .await;
        assert!(matches!(result, Some(ServerMessage::Ack { .. })));

        let result = handle_message(
            ClientMessage::Draw { kind: None },
            &mut guest_seat,
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::Error { ref code, .. }) if code == "NOT_YOUR_TURN"
        ));
    }

    #[tokio::test]
    async fn test_resume_and_leave() {
        let state = Arc::new(AppState::default());
        let (mut seat, player) = seated(
            &state,
            ClientMessage::CreateRoom {
                nickname: "Ama".to_string(),
                mood_emoji: "😊".to_string(),
                code: Some("LOVE42".to_string()),
            },
        )
        .await;

        // Dropping the connection keeps the seat
        let (resumed_seat, resumed) = seated(
            &state,
            ClientMessage::Resume {
                room_code: "love42".to_string(),
                player_id: player.id.clone(),
            },
        )
        .await;
        assert_eq!(resumed, player);
        assert_eq!(resumed_seat, seat);

        let result = handle_message(ClientMessage::LeaveRoom, &mut seat, &state).await;
        assert!(matches!(result, Some(ServerMessage::Left { ref room_id }) if room_id == "LOVE42"));
        assert!(seat.is_none());

        let mut fresh = None;
        let result = handle_message(
            ClientMessage::Resume {
                room_code: "LOVE42".to_string(),
                player_id: player.id,
            },
            &mut fresh,
            &state,
        )
        .await;
        assert!(matches!(
            result,
            Some(ServerMessage::Error { ref code, .. }) if code == "PLAYER_NOT_FOUND"
        ));
        assert!(fresh.is_none());
    }
}

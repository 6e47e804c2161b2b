use super::AppState;
use crate::engine::{invariants, roster};
use crate::error::{SessionError, SessionResult};
use crate::types::*;
use rand::Rng;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_ATTEMPTS: usize = 8;

fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a multiplayer room and seat its creator as host and first turn holder.
    /// Without a code one is generated.
    pub async fn create_room(
        &self,
        code: Option<&str>,
        nickname: &str,
        mood_emoji: &str,
    ) -> SessionResult<(Room, Player)> {
        let (nickname, mood) =
            roster::validate_profile(nickname, mood_emoji, self.config.nickname_max_chars)?;

        let room = match code {
            Some(code) => {
                let code = normalize_room_code(code).ok_or_else(|| {
                    SessionError::InvalidInput(
                        "Room code must be 6 letters or digits".to_string(),
                    )
                })?;
                self.gateway
                    .create_room(Room::new(
                        code,
                        RoomKind::Multiplayer,
                        self.config.max_rounds,
                    ))
                    .await?
            }
            None => {
                self.create_with_generated_code(RoomKind::Multiplayer, None)
                    .await?
            }
        };

        self.seat_creator(&room.id, &nickname, &mood).await
    }

    /// Create a solo room that is already playing in `mode`
    pub async fn create_solo_room(
        &self,
        nickname: &str,
        mood_emoji: &str,
        mode: Mode,
    ) -> SessionResult<(Room, Player)> {
        let (nickname, mood) =
            roster::validate_profile(nickname, mood_emoji, self.config.nickname_max_chars)?;

        // Stored already playing, so seating the player is the only write left
        let room = self
            .create_with_generated_code(RoomKind::Solo, Some(mode))
            .await?;
        let (room, player) = self.seat_creator(&room.id, &nickname, &mood).await?;

        tracing::info!("Solo room {} started in {} mode", room.id, mode);
        Ok((room, player))
    }

    /// Host starts the game in `mode`
    pub async fn start_game(
        &self,
        room_id: &str,
        requester: &str,
        mode: Mode,
    ) -> SessionResult<Room> {
        let room = self
            .commit(room_id, |room, players| {
                let min_players = match room.kind {
                    RoomKind::Multiplayer => self.config.min_players,
                    RoomKind::Solo => 1,
                };
                self.engine_for(room)
                    .start(room, players, requester, mode, min_players)
            })
            .await?;

        tracing::info!("Room {} started in {} mode", room_id, mode);
        Ok(room)
    }

    /// Store a room under a fresh code. With a mode it is stored already playing.
    async fn create_with_generated_code(
        &self,
        kind: RoomKind,
        mode: Option<Mode>,
    ) -> SessionResult<Room> {
        for _ in 0..CODE_ATTEMPTS {
            let mut room = Room::new(generate_room_code(), kind, self.config.max_rounds);
            if let Some(mode) = mode {
                room.mode = Some(mode);
                room.status = RoomStatus::Playing;
            }
            match self.gateway.create_room(room).await {
                Err(SessionError::RoomAlreadyExists(code)) => {
                    tracing::debug!("Room code {} taken, generating another", code);
                }
                result => return result,
            }
        }
        Err(SessionError::GatewayUnavailable(
            "Could not allocate a free room code".to_string(),
        ))
    }

    /// Add the room's first player; the gateway gives them the vacant turn
    async fn seat_creator(
        &self,
        room_id: &str,
        nickname: &str,
        mood: &str,
    ) -> SessionResult<(Room, Player)> {
        let (room, player) = self.gateway.add_player(room_id, nickname, mood).await?;
        invariants::assert_room_invariants(&room, std::slice::from_ref(&player));
        Ok((room, player))
    }
}

use super::AppState;
use crate::engine::{invariants, roster};
use crate::error::{SessionError, SessionResult};
use crate::types::*;

impl AppState {
    /// Join an existing multiplayer room by its code
    pub async fn join_room(
        &self,
        code: &str,
        nickname: &str,
        mood_emoji: &str,
    ) -> SessionResult<(Room, Player)> {
        let (nickname, mood) =
            roster::validate_profile(nickname, mood_emoji, self.config.nickname_max_chars)?;
        let room_id = normalize_room_code(code)
            .ok_or_else(|| SessionError::RoomNotFound(code.trim().to_string()))?;

        let room = self.gateway.get_room(&room_id).await?;
        if room.kind == RoomKind::Solo {
            return Err(SessionError::InvalidInput(
                "Solo rooms cannot be joined".to_string(),
            ));
        }

        // Joining an emptied room also picks up its vacant turn
        let (room, player) = self.gateway.add_player(&room_id, &nickname, &mood).await?;
        let players = self.gateway.list_players(&room_id).await?;
        invariants::assert_room_invariants(&room, &players);
        Ok((room, player))
    }

    /// Reattach a dropped connection to its seat
    pub async fn resume(&self, room_id: &str, player_id: &str) -> SessionResult<Player> {
        let players = self.gateway.list_players(room_id).await?;
        roster::find(&players, player_id)
            .cloned()
            .ok_or_else(|| SessionError::PlayerNotFound(player_id.to_string()))
    }

    /// Leave a room for good.
    ///
    /// A leaving turn holder passes the turn to the next player in order and
    /// any unresolved prompt is discarded without a history entry. A leaving
    /// host hands the host role to the earliest-joined remaining player.
    pub async fn leave_room(&self, room_id: &str, player_id: &str) -> SessionResult<Room> {
        let attempts = self.config.commit_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let room = self.gateway.get_room(room_id).await?;
            let players = self.gateway.list_players(room_id).await?;
            let leaver = roster::find(&players, player_id)
                .cloned()
                .ok_or_else(|| SessionError::PlayerNotFound(player_id.to_string()))?;
            let remaining: Vec<Player> = players
                .iter()
                .filter(|p| p.id != leaver.id)
                .cloned()
                .collect();
            let next = hand_off_turn(&room, &remaining, &leaver);

            // Removal and turn hand-off land in one write
            match self
                .gateway
                .remove_player(next, player_id, Some(room.version))
                .await
            {
                Ok((committed, promoted)) => {
                    if let Some(host_id) = &promoted {
                        tracing::info!("Player {} is now host of room {}", host_id, room_id);
                    }
                    let players = self.gateway.list_players(room_id).await?;
                    invariants::assert_room_invariants(&committed, &players);
                    return Ok(committed);
                }
                Err(SessionError::VersionConflict { expected, actual }) if attempt < attempts => {
                    tracing::debug!(
                        "Room {} moved from version {} to {} during leave, retrying",
                        room_id,
                        expected,
                        actual
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// The room as it should look once `leaver` is gone from the roster
fn hand_off_turn(room: &Room, remaining: &[Player], leaver: &Player) -> Room {
    let mut next = room.clone();
    let holder_gone = match &room.turn_holder {
        Some(holder) => roster::find(remaining, holder).is_none(),
        None => !remaining.is_empty(),
    };
    if !holder_gone {
        return next;
    }

    next.turn_holder = roster::successor_after(remaining, leaver).map(|p| p.id);
    if !room.turn.is_finished() {
        if let Some(prompt) = room.active_prompt() {
            tracing::info!(
                "Discarding unresolved {} in room {} after turn holder left",
                prompt.kind,
                room.id
            );
        }
        next.turn = TurnState::Idle;
    }
    next
}

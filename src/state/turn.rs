use super::AppState;
use crate::error::{SessionError, SessionResult};
use crate::types::*;

impl AppState {
    /// Draw a prompt for the turn holder; `None` spins the wheel
    pub async fn draw(
        &self,
        room_id: &str,
        requester: &str,
        kind: Option<PromptKind>,
    ) -> SessionResult<Room> {
        let result = self
            .commit(room_id, |room, players| {
                let engine = self.engine_for(room);
                self.with_rng(|rng| engine.draw(room, players, requester, kind, &self.catalog, rng))
            })
            .await;

        if let Ok(room) = &result {
            if let Some(prompt) = room.active_prompt() {
                tracing::info!(
                    "Room {} round {}: {} drew {}",
                    room_id,
                    room.round,
                    requester,
                    prompt.kind
                );
            }
        }
        log_rejection(room_id, requester, "draw", result)
    }

    /// Answer the active truth; resolves and advances the turn
    pub async fn submit_answer(
        &self,
        room_id: &str,
        requester: &str,
        text: &str,
    ) -> SessionResult<Room> {
        let result = self
            .commit(room_id, |room, players| {
                self.engine_for(room)
                    .submit_answer(room, players, requester, text)
            })
            .await;
        log_rejection(room_id, requester, "submit_answer", result)
    }

    /// Resolve the active prompt (done or skipped) and pass the turn on
    pub async fn advance(&self, room_id: &str, requester: &str) -> SessionResult<Room> {
        let result = self
            .commit(room_id, |room, players| {
                self.engine_for(room).advance(room, players, requester)
            })
            .await;

        if let Ok(room) = &result {
            tracing::info!(
                "Room {} advanced to round {} ({:?})",
                room_id,
                room.round,
                room.turn
            );
        }
        log_rejection(room_id, requester, "advance", result)
    }
}

fn log_rejection(
    room_id: &str,
    requester: &str,
    action: &str,
    result: SessionResult<Room>,
) -> SessionResult<Room> {
    match &result {
        Err(SessionError::AlreadyAdvanced) => {
            tracing::debug!(
                "Duplicate {} from {} in room {} ignored",
                action,
                requester,
                room_id
            );
        }
        Err(e) if e.is_retryable() => {
            tracing::warn!("{} in room {} failed: {}", action, room_id, e);
        }
        Err(e) => {
            tracing::debug!(
                "Rejected {} from {} in room {}: {}",
                action,
                requester,
                room_id,
                e
            );
        }
        Ok(_) => {}
    }
    result
}

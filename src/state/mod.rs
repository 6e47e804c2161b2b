mod player;
mod room;
mod turn;

use crate::broadcast::{ReplicationHub, RoomFeed};
use crate::catalog::{PromptCatalog, PromptRng, SystemRng};
use crate::config::ServerConfig;
use crate::engine::{invariants, TurnEngine};
use crate::error::{SessionError, SessionResult};
use crate::gateway::{InMemoryGateway, SessionGateway};
use crate::types::*;
use std::sync::{Arc, Mutex, PoisonError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub gateway: Arc<dyn SessionGateway>,
    pub catalog: Arc<PromptCatalog>,
    rng: Arc<Mutex<Box<dyn PromptRng>>>,
    multiplayer: TurnEngine,
    solo: TurnEngine,
}

impl AppState {
    /// In-memory store, built-in prompts, OS randomness
    pub fn new(config: ServerConfig) -> Self {
        let hub = Arc::new(ReplicationHub::new(config.channel_capacity));
        Self::with_parts(
            config,
            Arc::new(InMemoryGateway::new(hub)),
            PromptCatalog::builtin(),
            Box::new(SystemRng),
        )
    }

    pub fn with_parts(
        config: ServerConfig,
        gateway: Arc<dyn SessionGateway>,
        catalog: PromptCatalog,
        rng: Box<dyn PromptRng>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            gateway,
            catalog: Arc::new(catalog),
            rng: Arc::new(Mutex::new(rng)),
            multiplayer: TurnEngine::multiplayer(),
            solo: TurnEngine::solo(),
        }
    }

    pub fn engine_for(&self, room: &Room) -> TurnEngine {
        match room.kind {
            RoomKind::Multiplayer => self.multiplayer,
            RoomKind::Solo => self.solo,
        }
    }

    /// Run `f` with the shared prompt RNG. Never held across an await.
    fn with_rng<T>(&self, f: impl FnOnce(&mut dyn PromptRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(rng.as_mut())
    }

    /// Read-modify-write a room against its current version.
    ///
    /// `apply` sees the latest stored room and roster and returns the next room.
    /// On a version conflict the whole step is re-run against fresh state, so a
    /// transition is never applied to a room it was not validated against.
    pub async fn commit<F>(&self, room_id: &str, mut apply: F) -> SessionResult<Room>
    where
        F: FnMut(&Room, &[Player]) -> SessionResult<Room> + Send,
    {
        let attempts = self.config.commit_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let room = self.gateway.get_room(room_id).await?;
            let players = self.gateway.list_players(room_id).await?;
            let next = apply(&room, &players)?;

            match self.gateway.update_room(next, Some(room.version)).await {
                Ok(committed) => {
                    invariants::assert_room_invariants(&committed, &players);
                    return Ok(committed);
                }
                Err(SessionError::VersionConflict { expected, actual }) if attempt < attempts => {
                    tracing::debug!(
                        "Room {} moved from version {} to {}, retrying (attempt {}/{})",
                        room_id,
                        expected,
                        actual,
                        attempt,
                        attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Subscribe to a room's updates and roster changes
    pub async fn subscribe(&self, room_id: &str) -> SessionResult<RoomFeed> {
        let rooms = self.gateway.subscribe_room(room_id).await?;
        let roster = self.gateway.subscribe_players(room_id).await?;
        Ok(RoomFeed::new(rooms, roster))
    }

    pub async fn snapshot(&self, room_id: &str) -> SessionResult<RoomSnapshot> {
        let room = self.gateway.get_room(room_id).await?;
        let players = self.gateway.list_players(room_id).await?;
        Ok(RoomSnapshot { room, players })
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

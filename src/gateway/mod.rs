//! Persistence and replication boundary.
//!
//! The game logic only ever talks to a [`SessionGateway`]; the in-memory store
//! is one implementation, a hosted realtime database would be another. Every
//! committed write is fanned out to the room's subscribers by the gateway.

mod memory;

pub use memory::InMemoryGateway;

use crate::broadcast::Subscription;
use crate::error::SessionResult;
use crate::types::{Player, PlayerId, Room, RosterEvent};
use async_trait::async_trait;

#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Store a new room. Fails with `RoomAlreadyExists` if the code is taken.
    async fn create_room(&self, room: Room) -> SessionResult<Room>;

    async fn get_room(&self, room_id: &str) -> SessionResult<Room>;

    /// Replace the stored room and publish it.
    ///
    /// With `expected_version` set, the write only lands if the stored version
    /// still matches, otherwise `VersionConflict`. The stored version is bumped
    /// on every successful write.
    async fn update_room(&self, room: Room, expected_version: Option<u64>)
        -> SessionResult<Room>;

    /// Players in turn order
    async fn list_players(&self, room_id: &str) -> SessionResult<Vec<Player>>;

    /// Add a player. The first player of a room becomes its host, and a vacant
    /// turn (none set, or held by someone no longer seated) goes to the newcomer.
    /// Returns the room as stored after the join.
    async fn add_player(
        &self,
        room_id: &str,
        nickname: &str,
        mood_emoji: &str,
    ) -> SessionResult<(Room, Player)>;

    /// Remove a player and store `room` in the same write, promoting a new host
    /// if needed. `expected_version` guards the write like [`update_room`].
    /// Returns the stored room and the promoted host.
    ///
    /// [`update_room`]: SessionGateway::update_room
    async fn remove_player(
        &self,
        room: Room,
        player_id: &str,
        expected_version: Option<u64>,
    ) -> SessionResult<(Room, Option<PlayerId>)>;

    async fn subscribe_room(&self, room_id: &str) -> SessionResult<Subscription<Room>>;

    async fn subscribe_players(&self, room_id: &str) -> SessionResult<Subscription<RosterEvent>>;
}

use super::SessionGateway;
use crate::broadcast::{ReplicationHub, Subscription};
use crate::engine::roster;
use crate::error::{SessionError, SessionResult};
use crate::types::*;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

struct RoomRecord {
    room: Room,
    players: Vec<Player>,
    next_seq: u64,
}

/// Process-local store. Writes are published while the store lock is held so
/// subscribers see them in commit order.
pub struct InMemoryGateway {
    rooms: RwLock<HashMap<RoomId, RoomRecord>>,
    hub: Arc<ReplicationHub>,
}

impl InMemoryGateway {
    pub fn new(hub: Arc<ReplicationHub>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            hub,
        }
    }

    pub fn hub(&self) -> &Arc<ReplicationHub> {
        &self.hub
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }
}

#[async_trait]
impl SessionGateway for InMemoryGateway {
    async fn create_room(&self, mut room: Room) -> SessionResult<Room> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(SessionError::RoomAlreadyExists(room.id));
        }

        room.version = 1;
        rooms.insert(
            room.id.clone(),
            RoomRecord {
                room: room.clone(),
                players: Vec::new(),
                next_seq: 0,
            },
        );
        tracing::info!("Created {:?} room {}", room.kind, room.id);
        Ok(room)
    }

    async fn get_room(&self, room_id: &str) -> SessionResult<Room> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|record| record.room.clone())
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))
    }

    async fn update_room(
        &self,
        mut room: Room,
        expected_version: Option<u64>,
    ) -> SessionResult<Room> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .get_mut(&room.id)
            .ok_or_else(|| SessionError::RoomNotFound(room.id.clone()))?;

        let actual = record.room.version;
        if let Some(expected) = expected_version {
            if expected != actual {
                return Err(SessionError::VersionConflict { expected, actual });
            }
        }

        room.version = actual + 1;
        record.room = room.clone();
        self.hub.publish_room(&room).await;
        Ok(room)
    }

    async fn list_players(&self, room_id: &str) -> SessionResult<Vec<Player>> {
        let rooms = self.rooms.read().await;
        rooms
            .get(room_id)
            .map(|record| roster::turn_order(&record.players))
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))
    }

    async fn add_player(
        &self,
        room_id: &str,
        nickname: &str,
        mood_emoji: &str,
    ) -> SessionResult<(Room, Player)> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .get_mut(room_id)
            .ok_or_else(|| SessionError::RoomNotFound(room_id.to_string()))?;

        let player = Player {
            id: ulid::Ulid::new().to_string(),
            room_id: room_id.to_string(),
            nickname: nickname.to_string(),
            mood_emoji: mood_emoji.to_string(),
            is_host: record.players.is_empty(),
            joined_at: Utc::now(),
            join_seq: record.next_seq,
        };

        let turn_vacant = match &record.room.turn_holder {
            Some(holder) => roster::find(&record.players, holder).is_none(),
            None => true,
        };
        if turn_vacant {
            record.room.turn_holder = Some(player.id.clone());
        }

        record.next_seq += 1;
        record.players.push(player.clone());
        record.room.version += 1;

        self.hub
            .publish_roster(
                room_id,
                RosterEvent::Joined {
                    player: player.clone(),
                },
            )
            .await;
        self.hub.publish_room(&record.room).await;

        tracing::info!(
            "Player {} ({}) joined room {}",
            player.nickname,
            player.id,
            room_id
        );
        Ok((record.room.clone(), player))
    }

    async fn remove_player(
        &self,
        mut room: Room,
        player_id: &str,
        expected_version: Option<u64>,
    ) -> SessionResult<(Room, Option<PlayerId>)> {
        let mut rooms = self.rooms.write().await;
        let record = rooms
            .get_mut(&room.id)
            .ok_or_else(|| SessionError::RoomNotFound(room.id.clone()))?;

        let actual = record.room.version;
        if let Some(expected) = expected_version {
            if expected != actual {
                return Err(SessionError::VersionConflict { expected, actual });
            }
        }
        if roster::find(&record.players, player_id).is_none() {
            return Err(SessionError::PlayerNotFound(player_id.to_string()));
        }

        let promoted_host = roster::successor_host(&record.players, player_id);
        record.players.retain(|p| p.id != player_id);
        if let Some(host_id) = &promoted_host {
            for player in record.players.iter_mut() {
                player.is_host = &player.id == host_id;
            }
        }
        room.version = actual + 1;
        record.room = room.clone();

        self.hub
            .publish_roster(
                &room.id,
                RosterEvent::Left {
                    player_id: player_id.to_string(),
                    promoted_host: promoted_host.clone(),
                },
            )
            .await;
        self.hub.publish_room(&room).await;

        tracing::info!("Player {} left room {}", player_id, room.id);
        Ok((room, promoted_host))
    }

    async fn subscribe_room(&self, room_id: &str) -> SessionResult<Subscription<Room>> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(room_id) {
            return Err(SessionError::RoomNotFound(room_id.to_string()));
        }
        Ok(self.hub.subscribe_room(room_id).await)
    }

    async fn subscribe_players(&self, room_id: &str) -> SessionResult<Subscription<RosterEvent>> {
        let rooms = self.rooms.read().await;
        if !rooms.contains_key(room_id) {
            return Err(SessionError::RoomNotFound(room_id.to_string()));
        }
        Ok(self.hub.subscribe_roster(room_id).await)
    }
}

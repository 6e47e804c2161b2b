//! Per-room replication channels.
//!
//! Every committed room write is published as a full `Room` record, roster
//! changes as `RosterEvent`s. Each subscriber gets its own bounded buffer; a
//! subscriber that falls behind sees `Lagged` and must fetch a snapshot instead
//! of trying to replay what it missed.

use crate::types::{Room, RoomId, RosterEvent};
use futures::Stream;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;

/// What a subscription yields
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    Event(T),
    /// The buffer overflowed and this many events were dropped
    Lagged(u64),
}

/// Receiving end for one room's events of one kind
#[derive(Debug)]
pub struct Subscription<T> {
    room_id: RoomId,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscription<T> {
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Next event in commit order; None once the channel is gone
    pub async fn recv(&mut self) -> Option<Delivery<T>> {
        match self.rx.recv().await {
            Ok(event) => Some(Delivery::Event(event)),
            Err(RecvError::Lagged(missed)) => Some(Delivery::Lagged(missed)),
            Err(RecvError::Closed) => None,
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = Delivery<T>> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|delivery| (delivery, sub))
        })
    }
}

struct RoomChannels {
    rooms: broadcast::Sender<Room>,
    roster: broadcast::Sender<RosterEvent>,
}

impl RoomChannels {
    fn new(capacity: usize) -> Self {
        let (rooms, _) = broadcast::channel(capacity);
        let (roster, _) = broadcast::channel(capacity);
        Self { rooms, roster }
    }

    fn receiver_count(&self) -> usize {
        self.rooms.receiver_count() + self.roster.receiver_count()
    }
}

/// Fan-out hub for all rooms, created lazily per room on first subscribe
pub struct ReplicationHub {
    capacity: usize,
    channels: RwLock<HashMap<RoomId, RoomChannels>>,
}

impl ReplicationHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: RwLock::new(HashMap::new()),
        }
    }

    pub async fn subscribe_room(&self, room_id: &str) -> Subscription<Room> {
        let mut channels = self.channels.write().await;
        let entry = channels
            .entry(room_id.to_string())
            .or_insert_with(|| RoomChannels::new(self.capacity));
        Subscription {
            room_id: room_id.to_string(),
            rx: entry.rooms.subscribe(),
        }
    }

    pub async fn subscribe_roster(&self, room_id: &str) -> Subscription<RosterEvent> {
        let mut channels = self.channels.write().await;
        let entry = channels
            .entry(room_id.to_string())
            .or_insert_with(|| RoomChannels::new(self.capacity));
        Subscription {
            room_id: room_id.to_string(),
            rx: entry.roster.subscribe(),
        }
    }

    /// Publish a committed room. Returns how many subscribers it reached.
    pub async fn publish_room(&self, room: &Room) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(&room.id)
            .and_then(|c| c.rooms.send(room.clone()).ok())
            .unwrap_or(0)
    }

    pub async fn publish_roster(&self, room_id: &str, event: RosterEvent) -> usize {
        let channels = self.channels.read().await;
        channels
            .get(room_id)
            .and_then(|c| c.roster.send(event).ok())
            .unwrap_or(0)
    }

    pub async fn subscriber_count(&self, room_id: &str) -> usize {
        let channels = self.channels.read().await;
        channels.get(room_id).map_or(0, RoomChannels::receiver_count)
    }

    /// Drop channels nobody listens to. Returns how many were removed.
    pub async fn prune(&self) -> usize {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, c| c.receiver_count() > 0);
        before - channels.len()
    }
}

/// Anything that happened to a room, as seen by one connected participant
#[derive(Debug, Clone, PartialEq)]
pub enum RoomMutationEvent {
    RoomUpdated(Room),
    Roster(RosterEvent),
    Lagged { missed: u64 },
}

/// Room and roster subscriptions for one room, merged
pub struct RoomFeed {
    rooms: Subscription<Room>,
    roster: Subscription<RosterEvent>,
}

impl RoomFeed {
    pub fn new(rooms: Subscription<Room>, roster: Subscription<RosterEvent>) -> Self {
        Self { rooms, roster }
    }

    pub fn room_id(&self) -> &str {
        self.rooms.room_id()
    }

    pub async fn recv(&mut self) -> Option<RoomMutationEvent> {
        tokio::select! {
            delivery = self.rooms.recv() => delivery.map(|d| match d {
                Delivery::Event(room) => RoomMutationEvent::RoomUpdated(room),
                Delivery::Lagged(missed) => RoomMutationEvent::Lagged { missed },
            }),
            delivery = self.roster.recv() => delivery.map(|d| match d {
                Delivery::Event(event) => RoomMutationEvent::Roster(event),
                Delivery::Lagged(missed) => RoomMutationEvent::Lagged { missed },
            }),
        }
    }
}

/// Spawn a background task that drops idle room channels
pub fn spawn_channel_janitor(hub: Arc<ReplicationHub>, interval: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            let removed = hub.prune().await;
            if removed > 0 {
                tracing::debug!("Pruned {} idle room channels", removed);
            }
        }
    });
}

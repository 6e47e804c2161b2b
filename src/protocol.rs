use crate::error::SessionError;
use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        nickname: String,
        mood_emoji: String,
        /// Let the creator pick the code; generated when absent
        #[serde(default)]
        code: Option<String>,
    },
    CreateSoloRoom {
        nickname: String,
        mood_emoji: String,
        mode: Mode,
    },
    JoinRoom {
        code: String,
        nickname: String,
        mood_emoji: String,
    },
    /// Reattach after a dropped connection
    Resume {
        room_code: String,
        player_id: PlayerId,
    },
    StartGame {
        mode: Mode,
    },
    /// Draw a prompt; without a kind the server spins the wheel
    Draw {
        #[serde(default)]
        kind: Option<PromptKind>,
    },
    SubmitAnswer {
        text: String,
    },
    /// "Done" on a dare, "Next" to skip
    Advance,
    LeaveRoom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    /// Sent to the connection that created, joined or resumed a seat
    Seated {
        room_id: RoomId,
        player: Player,
    },
    /// Full state; sent after every (re)subscribe and after lagging behind
    Snapshot {
        room: Room,
        players: Vec<Player>,
    },
    RoomState {
        room: Room,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: PlayerId,
        #[serde(skip_serializing_if = "Option::is_none")]
        promoted_host: Option<PlayerId>,
    },
    /// The action was committed at this room version
    Ack {
        version: u64,
    },
    Left {
        room_id: RoomId,
    },
    Error {
        code: String,
        msg: String,
        retryable: bool,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            msg: msg.into(),
            retryable: false,
        }
    }
}

impl From<SessionError> for ServerMessage {
    fn from(err: SessionError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            msg: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<RoomSnapshot> for ServerMessage {
    fn from(snapshot: RoomSnapshot) -> Self {
        ServerMessage::Snapshot {
            room: snapshot.room,
            players: snapshot.players,
        }
    }
}

impl From<RosterEvent> for ServerMessage {
    fn from(event: RosterEvent) -> Self {
        match event {
            RosterEvent::Joined { player } => ServerMessage::PlayerJoined { player },
            RosterEvent::Left {
                player_id,
                promoted_host,
            } => ServerMessage::PlayerLeft {
                player_id,
                promoted_host,
            },
        }
    }
}

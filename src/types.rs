use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque ID types for type safety
pub type RoomId = String;
pub type PlayerId = String;

/// Length of a room code
pub const ROOM_CODE_LENGTH: usize = 6;

/// Mood glyphs offered by the profile screen
pub const MOOD_CHOICES: &[&str] = &["😇", "😎", "😊", "😏", "💞"];

/// Content theme, chosen once by the host before play
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Friendly,
    Crush,
    Adult,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Friendly, Mode::Crush, Mode::Adult];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Friendly => "friendly",
            Mode::Crush => "crush",
            Mode::Adult => "adult",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "friendly" => Ok(Mode::Friendly),
            "crush" => Ok(Mode::Crush),
            "adult" => Ok(Mode::Adult),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Truth,
    Dare,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::Truth => "truth",
            PromptKind::Dare => "dare",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
}

/// Multiplayer rooms enforce turn ownership, solo rooms have a single local player
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Multiplayer,
    Solo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

/// Where the current turn stands.
///
/// A dare only needs the turn holder to tap "Done", a truth waits for an answer.
/// `Finished` is terminal: the turn holder and round are frozen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    PromptActive { prompt: Prompt },
    AwaitingAnswer { prompt: Prompt },
    Finished,
}

impl TurnState {
    pub fn prompt(&self) -> Option<&Prompt> {
        match self {
            TurnState::PromptActive { prompt } | TurnState::AwaitingAnswer { prompt } => {
                Some(prompt)
            }
            TurnState::Idle | TurnState::Finished => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, TurnState::Finished)
    }
}

/// One resolved turn. Never mutated once appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub round: u32,
    pub kind: PromptKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub player_id: PlayerId,
    pub player_name: String,
    pub resolved_at: DateTime<Utc>,
}

/// Authoritative record for one game session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Room {
    pub id: RoomId,
    /// Bumped by the store on every committed write (room or roster)
    pub version: u64,
    pub kind: RoomKind,
    pub mode: Option<Mode>,
    pub status: RoomStatus,
    pub round: u32,
    pub max_rounds: u32,
    pub turn_holder: Option<PlayerId>,
    pub turn: TurnState,
    pub history: Vec<HistoryEntry>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    /// A fresh room in the lobby: no mode, no players, round 1
    pub fn new(id: RoomId, kind: RoomKind, max_rounds: u32) -> Self {
        Self {
            id,
            version: 0,
            kind,
            mode: None,
            status: RoomStatus::Waiting,
            round: 1,
            max_rounds,
            turn_holder: None,
            turn: TurnState::Idle,
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn active_prompt(&self) -> Option<&Prompt> {
        self.turn.prompt()
    }

    pub fn is_turn_holder(&self, player_id: &str) -> bool {
        self.turn_holder.as_deref() == Some(player_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub nickname: String,
    pub mood_emoji: String,
    pub is_host: bool,
    pub joined_at: DateTime<Utc>,
    /// Tie-break for players joining within the same clock tick
    pub join_seq: u64,
}

/// Full state of a room as a late or lagging client needs it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room: Room,
    pub players: Vec<Player>,
}

/// Roster membership changes, delivered next to room updates
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RosterEvent {
    Joined {
        player: Player,
    },
    Left {
        player_id: PlayerId,
        promoted_host: Option<PlayerId>,
    },
}

/// Normalize a user-typed room code, returning None when it is not 6 alphanumerics
pub fn normalize_room_code(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == ROOM_CODE_LENGTH && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Some(code)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_identifiers() {
        assert_eq!(serde_json::to_string(&Mode::Crush).unwrap(), "\"crush\"");
        assert_eq!(serde_json::to_string(&PromptKind::Dare).unwrap(), "\"dare\"");
        assert_eq!(
            serde_json::to_string(&RoomStatus::Waiting).unwrap(),
            "\"waiting\""
        );
        assert_eq!("Adult".parse::<Mode>().unwrap(), Mode::Adult);
        assert!("spicy".parse::<Mode>().is_err());
    }

    #[test]
    fn test_turn_state_is_tagged() {
        let state = TurnState::AwaitingAnswer {
            prompt: Prompt {
                kind: PromptKind::Truth,
                text: "What's your secret talent?".to_string(),
            },
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "awaiting_answer");
        assert_eq!(json["prompt"]["kind"], "truth");

        let idle = serde_json::to_value(TurnState::Idle).unwrap();
        assert_eq!(idle, serde_json::json!({ "state": "idle" }));
    }

    #[test]
    fn test_history_entry_omits_missing_answer() {
        let entry = HistoryEntry {
            round: 3,
            kind: PromptKind::Dare,
            text: "Dance for 30 seconds without music".to_string(),
            answer: None,
            player_id: "p1".to_string(),
            player_name: "Ama".to_string(),
            resolved_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("answer").is_none());
    }

    #[test]
    fn test_normalize_room_code() {
        assert_eq!(normalize_room_code(" ab12cd "), Some("AB12CD".to_string()));
        assert_eq!(normalize_room_code("ABC12"), None);
        assert_eq!(normalize_room_code("ABC-12"), None);
        assert_eq!(normalize_room_code("ÄBC123"), None);
    }

    #[test]
    fn test_new_room_defaults() {
        let room = Room::new("ABC123".to_string(), RoomKind::Multiplayer, 10);
        assert_eq!(room.round, 1);
        assert_eq!(room.status, RoomStatus::Waiting);
        assert!(room.mode.is_none());
        assert!(room.turn_holder.is_none());
        assert!(room.active_prompt().is_none());
    }
}

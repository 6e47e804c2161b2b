//! Error taxonomy for room and turn operations.
//!
//! Every error is scoped to one room and one action. Rule violations leave the
//! room untouched and are reported only to the participant who acted.

use crate::types::{PlayerId, RoomId};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("It is not your turn")]
    NotYourTurn,

    #[error("Room {0} not found")]
    RoomNotFound(RoomId),

    #[error("Room {0} already exists")]
    RoomAlreadyExists(RoomId),

    #[error("Room is not playing")]
    RoomNotPlaying,

    #[error("Room has no players")]
    EmptyRoster,

    #[error("Answer must not be empty")]
    EmptyAnswer,

    #[error("Turn was already advanced")]
    AlreadyAdvanced,

    #[error("All {0} rounds have been played")]
    RoundLimitReached(u32),

    #[error("No prompt is active")]
    NoActivePrompt,

    #[error("A prompt is already active")]
    PromptAlreadyActive,

    #[error("Only the host can do that")]
    NotHost,

    #[error("Game has already started")]
    AlreadyStarted,

    #[error("Need at least {required} players, have {present}")]
    NotEnoughPlayers { required: usize, present: usize },

    #[error("Player {0} not found")]
    PlayerNotFound(PlayerId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Room changed concurrently (expected version {expected}, found {actual})")]
    VersionConflict { expected: u64, actual: u64 },

    #[error("Session store unavailable: {0}")]
    GatewayUnavailable(String),
}

impl SessionError {
    /// Stable wire code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotYourTurn => "NOT_YOUR_TURN",
            SessionError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            SessionError::RoomAlreadyExists(_) => "ROOM_ALREADY_EXISTS",
            SessionError::RoomNotPlaying => "ROOM_NOT_PLAYING",
            SessionError::EmptyRoster => "EMPTY_ROSTER",
            SessionError::EmptyAnswer => "EMPTY_ANSWER",
            SessionError::AlreadyAdvanced => "ALREADY_ADVANCED",
            SessionError::RoundLimitReached(_) => "ROUND_LIMIT_REACHED",
            SessionError::NoActivePrompt => "NO_ACTIVE_PROMPT",
            SessionError::PromptAlreadyActive => "PROMPT_ALREADY_ACTIVE",
            SessionError::NotHost => "NOT_HOST",
            SessionError::AlreadyStarted => "ALREADY_STARTED",
            SessionError::NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            SessionError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            SessionError::InvalidInput(_) => "INVALID_INPUT",
            SessionError::VersionConflict { .. } => "VERSION_CONFLICT",
            SessionError::GatewayUnavailable(_) => "GATEWAY_UNAVAILABLE",
        }
    }

    /// Whether the caller may retry the same action unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::GatewayUnavailable(_) | SessionError::VersionConflict { .. }
        )
    }
}

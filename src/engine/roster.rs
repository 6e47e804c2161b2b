//! Roster rules: who is in a room, who hosts it, and in which order turns rotate.
//!
//! Turn order is join order. Everything here is a pure function over a roster
//! slice; storing players is the gateway's job.

use crate::error::{SessionError, SessionResult};
use crate::types::{Player, PlayerId};

/// Longest accepted mood glyph, in chars (some emoji are several code points)
const MOOD_MAX_CHARS: usize = 8;

/// Players sorted by join order
pub fn turn_order(players: &[Player]) -> Vec<Player> {
    let mut ordered = players.to_vec();
    ordered.sort_by(|a, b| {
        a.joined_at
            .cmp(&b.joined_at)
            .then(a.join_seq.cmp(&b.join_seq))
    });
    ordered
}

/// The player after `current` in turn order, wrapping around.
///
/// An unknown `current` (the holder left, or a stale client id) falls back to
/// the first player in turn order.
pub fn next_turn_holder(players: &[Player], current: &str) -> SessionResult<Player> {
    let ordered = turn_order(players);
    if ordered.is_empty() {
        return Err(SessionError::EmptyRoster);
    }

    match ordered.iter().position(|p| p.id == current) {
        Some(index) => Ok(ordered[(index + 1) % ordered.len()].clone()),
        None => {
            tracing::warn!(
                "Stale turn holder {}, handing the turn to {}",
                current,
                ordered[0].id
            );
            Ok(ordered[0].clone())
        }
    }
}

/// First player in turn order
pub fn first_in_order(players: &[Player]) -> SessionResult<Player> {
    turn_order(players)
        .into_iter()
        .next()
        .ok_or(SessionError::EmptyRoster)
}

pub fn find<'a>(players: &'a [Player], player_id: &str) -> Option<&'a Player> {
    players.iter().find(|p| p.id == player_id)
}

pub fn host(players: &[Player]) -> Option<&Player> {
    players.iter().find(|p| p.is_host)
}

/// Who takes the turn after `leaver` once they are gone from `players`:
/// the next player who joined after them, wrapping to the first.
pub fn successor_after(players: &[Player], leaver: &Player) -> Option<Player> {
    let ordered = turn_order(players);
    let after = ordered.iter().find(|p| {
        p.id != leaver.id && (p.joined_at, p.join_seq) > (leaver.joined_at, leaver.join_seq)
    });
    after
        .or_else(|| ordered.iter().find(|p| p.id != leaver.id))
        .cloned()
}

/// Who becomes host when `leaving` leaves: nobody unless `leaving` is the host,
/// otherwise the earliest-joined remaining player.
pub fn successor_host(players: &[Player], leaving: &str) -> Option<PlayerId> {
    let leaver = find(players, leaving)?;
    if !leaver.is_host {
        return None;
    }
    turn_order(players)
        .into_iter()
        .find(|p| p.id != leaving)
        .map(|p| p.id)
}

/// Trim and check a nickname and mood glyph
pub fn validate_profile(
    nickname: &str,
    mood_emoji: &str,
    nickname_max_chars: usize,
) -> SessionResult<(String, String)> {
    let nickname = nickname.trim();
    if nickname.is_empty() {
        return Err(SessionError::InvalidInput(
            "Nickname must not be empty".to_string(),
        ));
    }
    if nickname.chars().count() > nickname_max_chars {
        return Err(SessionError::InvalidInput(format!(
            "Nickname must be at most {} characters",
            nickname_max_chars
        )));
    }

    let mood = mood_emoji.trim();
    if mood.is_empty() || mood.chars().count() > MOOD_MAX_CHARS {
        return Err(SessionError::InvalidInput(
            "Pick a mood emoji".to_string(),
        ));
    }

    Ok((nickname.to_string(), mood.to_string()))
}

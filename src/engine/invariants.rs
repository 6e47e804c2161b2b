//! Debug assertions for room states that must never be committed.
//! Compiled out in release builds.

use crate::types::{Player, Room, RoomStatus, TurnState};

/// Validate a room against its roster after a commit
pub fn assert_room_invariants(room: &Room, players: &[Player]) {
    debug_assert!(
        room.round >= 1 && room.round <= room.max_rounds,
        "Room {} is on round {} of {}",
        room.id,
        room.round,
        room.max_rounds
    );

    // One entry per resolved round; a finished room has resolved its last round too
    let resolved = if room.turn.is_finished() {
        room.round as usize
    } else {
        room.round as usize - 1
    };
    debug_assert!(
        room.history.len() == resolved,
        "Room {} has {} history entries on round {} ({:?})",
        room.id,
        room.history.len(),
        room.round,
        room.turn
    );

    if room.status == RoomStatus::Waiting {
        debug_assert!(
            room.turn == TurnState::Idle && room.history.is_empty(),
            "Room {} has turn activity before starting",
            room.id
        );
    }

    if let Some(holder) = &room.turn_holder {
        debug_assert!(
            players.is_empty() || players.iter().any(|p| &p.id == holder),
            "Room {} turn holder {} is not in the roster",
            room.id,
            holder
        );
    }

    assert_roster_invariants(room, players);
}

/// Exactly one host in a non-empty roster, every player belongs to the room
pub fn assert_roster_invariants(room: &Room, players: &[Player]) {
    let host_count = players.iter().filter(|p| p.is_host).count();
    debug_assert!(
        players.is_empty() || host_count == 1,
        "Room {} has {} hosts, expected 1",
        room.id,
        host_count
    );

    debug_assert!(
        players.iter().all(|p| p.room_id == room.id),
        "Room {} roster contains players from another room",
        room.id
    );
}

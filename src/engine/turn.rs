//! Turn state machine.
//!
//! Every transition takes the current authoritative room (and roster) and
//! returns the next room, or an error with nothing changed. Callers commit the
//! result with a compare-and-set on the room version, so a transition is always
//! validated against the state it replaces.
//!
//! ```text
//! Idle --draw(dare)--> PromptActive --advance--> Idle (round+1, next holder)
//! Idle --draw(truth)--> AwaitingAnswer --submit_answer/advance--> Idle (round+1, next holder)
//! any resolution at round == max_rounds --> Finished
//! ```

use super::roster;
use crate::catalog::{PromptCatalog, PromptRng};
use crate::error::{SessionError, SessionResult};
use crate::types::*;
use chrono::Utc;

#[derive(Debug, Clone, Copy)]
pub struct TurnEngine {
    enforce_turn_ownership: bool,
}

impl TurnEngine {
    pub fn new(enforce_turn_ownership: bool) -> Self {
        Self {
            enforce_turn_ownership,
        }
    }

    /// Engine for shared rooms: only the turn holder may act
    pub fn multiplayer() -> Self {
        Self::new(true)
    }

    /// Engine for solo play: there is no turn ownership to enforce
    pub fn solo() -> Self {
        Self::new(false)
    }

    pub fn enforces_turn_ownership(&self) -> bool {
        self.enforce_turn_ownership
    }

    /// Host picks the mode; the room starts playing with the first-joined player on turn
    pub fn start(
        &self,
        room: &Room,
        players: &[Player],
        requester: &str,
        mode: Mode,
        min_players: usize,
    ) -> SessionResult<Room> {
        if room.status == RoomStatus::Playing {
            return Err(SessionError::AlreadyStarted);
        }
        if players.is_empty() {
            return Err(SessionError::EmptyRoster);
        }

        let player = roster::find(players, requester)
            .ok_or_else(|| SessionError::PlayerNotFound(requester.to_string()))?;
        if !player.is_host {
            return Err(SessionError::NotHost);
        }
        if players.len() < min_players {
            return Err(SessionError::NotEnoughPlayers {
                required: min_players,
                present: players.len(),
            });
        }

        let first = roster::first_in_order(players)?;
        let mut next = room.clone();
        next.mode = Some(mode);
        next.status = RoomStatus::Playing;
        next.round = 1;
        next.turn_holder = Some(first.id);
        next.turn = TurnState::Idle;
        Ok(next)
    }

    /// Draw a prompt for the turn holder. With no kind given the wheel is spun.
    pub fn draw(
        &self,
        room: &Room,
        players: &[Player],
        requester: &str,
        kind: Option<PromptKind>,
        catalog: &PromptCatalog,
        rng: &mut dyn PromptRng,
    ) -> SessionResult<Room> {
        ensure_playing(room)?;
        if room.turn.is_finished() {
            return Err(SessionError::RoundLimitReached(room.max_rounds));
        }
        self.check_turn(room, players, requester)?;
        if room.turn != TurnState::Idle {
            return Err(SessionError::PromptAlreadyActive);
        }

        let mode = room.mode.ok_or(SessionError::RoomNotPlaying)?;
        let kind = kind.unwrap_or_else(|| PromptKind::spin(rng));
        let prompt = catalog.draw(mode, kind, rng).ok_or_else(|| {
            SessionError::InvalidInput(format!("No {} prompts for {} mode", kind, mode))
        })?;

        let mut next = room.clone();
        next.turn = match kind {
            PromptKind::Dare => TurnState::PromptActive { prompt },
            PromptKind::Truth => TurnState::AwaitingAnswer { prompt },
        };
        Ok(next)
    }

    /// Answer the active truth. Resolves the turn and advances in the same step.
    pub fn submit_answer(
        &self,
        room: &Room,
        players: &[Player],
        requester: &str,
        text: &str,
    ) -> SessionResult<Room> {
        ensure_playing(room)?;
        let answer = text.trim();

        // A retried submission that already went through. A solo player, or a holder
        // with a fresh turn, falls through to the normal checks.
        let turn_moved_on = room.turn.is_finished()
            || (room.turn == TurnState::Idle && !room.is_turn_holder(requester));
        if turn_moved_on
            && room.history.last().is_some_and(|entry| {
                entry.player_id == requester && entry.answer.as_deref() == Some(answer)
            })
        {
            return Err(SessionError::AlreadyAdvanced);
        }

        if room.turn.is_finished() {
            return Err(SessionError::RoundLimitReached(room.max_rounds));
        }
        self.check_turn(room, players, requester)?;

        let prompt = match &room.turn {
            TurnState::AwaitingAnswer { prompt } => prompt.clone(),
            _ => return Err(SessionError::NoActivePrompt),
        };
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }

        self.resolve(room, players, prompt, Some(answer.to_string()))
    }

    /// Finish the current turn ("Done" on a dare, "Next" on either kind).
    ///
    /// Calling it again after the turn already moved on reports `AlreadyAdvanced`
    /// and changes nothing.
    pub fn advance(&self, room: &Room, players: &[Player], requester: &str) -> SessionResult<Room> {
        ensure_playing(room)?;

        let prompt = match &room.turn {
            TurnState::PromptActive { prompt } | TurnState::AwaitingAnswer { prompt } => {
                prompt.clone()
            }
            TurnState::Idle | TurnState::Finished => {
                let resolved_by_requester = room
                    .history
                    .last()
                    .is_some_and(|entry| entry.player_id == requester);

                if room.turn.is_finished() {
                    return Err(if resolved_by_requester {
                        SessionError::AlreadyAdvanced
                    } else {
                        SessionError::RoundLimitReached(room.max_rounds)
                    });
                }
                if resolved_by_requester || self.check_turn(room, players, requester).is_ok() {
                    return Err(SessionError::AlreadyAdvanced);
                }
                return Err(SessionError::NotYourTurn);
            }
        };

        self.check_turn(room, players, requester)?;
        self.resolve(room, players, prompt, None)
    }

    fn check_turn(&self, room: &Room, players: &[Player], requester: &str) -> SessionResult<()> {
        if !self.enforce_turn_ownership {
            return Ok(());
        }
        if !players.iter().any(|p| p.id == requester) {
            return Err(SessionError::PlayerNotFound(requester.to_string()));
        }
        if room.is_turn_holder(requester) {
            Ok(())
        } else {
            Err(SessionError::NotYourTurn)
        }
    }

    /// Append the history entry, then either rotate to the next round or finish
    fn resolve(
        &self,
        room: &Room,
        players: &[Player],
        prompt: Prompt,
        answer: Option<String>,
    ) -> SessionResult<Room> {
        let holder_id = room.turn_holder.clone().ok_or(SessionError::EmptyRoster)?;
        let player_name = match roster::find(players, &holder_id) {
            Some(player) => player.nickname.clone(),
            None => {
                tracing::warn!(
                    "Turn holder {} is not in room {} roster",
                    holder_id,
                    room.id
                );
                holder_id.clone()
            }
        };

        let mut next = room.clone();
        next.history.push(HistoryEntry {
            round: room.round,
            kind: prompt.kind,
            text: prompt.text,
            answer,
            player_id: holder_id.clone(),
            player_name,
            resolved_at: Utc::now(),
        });

        if room.round < room.max_rounds {
            let following = roster::next_turn_holder(players, &holder_id)?;
            next.round = room.round + 1;
            next.turn_holder = Some(following.id);
            next.turn = TurnState::Idle;
        } else {
            tracing::info!("Room {} finished after {} rounds", room.id, room.round);
            next.turn = TurnState::Finished;
        }

        Ok(next)
    }
}

fn ensure_playing(room: &Room) -> SessionResult<()> {
    if room.status == RoomStatus::Playing {
        Ok(())
    } else {
        Err(SessionError::RoomNotPlaying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SequenceRng;
    use chrono::Duration;

    fn players(names: &[&str]) -> Vec<Player> {
        let start = Utc::now();
        names
            .iter()
            .enumerate()
            .map(|(i, name)| Player {
                id: name.to_lowercase(),
                room_id: "ROOM01".to_string(),
                nickname: name.to_string(),
                mood_emoji: "😊".to_string(),
                is_host: i == 0,
                joined_at: start + Duration::milliseconds(i as i64),
                join_seq: i as u64,
            })
            .collect()
    }

    fn playing_room(roster: &[Player], mode: Mode) -> Room {
        let room = Room::new("ROOM01".to_string(), RoomKind::Multiplayer, 10);
        TurnEngine::multiplayer()
            .start(&room, roster, &roster[0].id, mode, 2)
            .unwrap()
    }

    fn draw(
        engine: &TurnEngine,
        room: &Room,
        roster: &[Player],
        who: &str,
        kind: PromptKind,
    ) -> SessionResult<Room> {
        let mut rng = SequenceRng::new(vec![0]);
        engine.draw(room, roster, who, Some(kind), &PromptCatalog::builtin(), &mut rng)
    }

    #[test]
    fn test_start_sets_first_joined_as_holder() {
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Crush);

        assert_eq!(room.status, RoomStatus::Playing);
        assert_eq!(room.mode, Some(Mode::Crush));
        assert_eq!(room.round, 1);
        assert_eq!(room.turn_holder.as_deref(), Some("ama"));
        assert_eq!(room.turn, TurnState::Idle);
    }

    #[test]
    fn test_start_guards() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = Room::new("ROOM01".to_string(), RoomKind::Multiplayer, 10);

        assert_eq!(
            engine
                .start(&room, &roster, "ben", Mode::Friendly, 2)
                .unwrap_err(),
            SessionError::NotHost
        );
        assert_eq!(
            engine
                .start(&room, &roster[..1], "ama", Mode::Friendly, 2)
                .unwrap_err(),
            SessionError::NotEnoughPlayers {
                required: 2,
                present: 1
            }
        );

        let started = engine
            .start(&room, &roster, "ama", Mode::Friendly, 2)
            .unwrap();
        assert_eq!(
            engine
                .start(&started, &roster, "ama", Mode::Adult, 2)
                .unwrap_err(),
            SessionError::AlreadyStarted
        );
    }

    #[test]
    fn test_draw_before_start_is_rejected() {
        let mut room = Room::new("ROOM01".to_string(), RoomKind::Multiplayer, 10);
        room.turn_holder = Some("ama".to_string());
        let roster = players(&["Ama", "Ben"]);
        let err = draw(
            &TurnEngine::multiplayer(),
            &room,
            &roster,
            "ama",
            PromptKind::Dare,
        )
        .unwrap_err();
        assert_eq!(err, SessionError::RoomNotPlaying);
    }

    #[test]
    fn test_draw_truth_awaits_answer() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Friendly);

        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();
        match &room.turn {
            TurnState::AwaitingAnswer { prompt } => {
                assert_eq!(prompt.text, "What's your funniest school memory?");
            }
            other => panic!("Expected AwaitingAnswer, got {:?}", other),
        }
        assert_eq!(
            draw(&engine, &room, &roster, "ama", PromptKind::Dare).unwrap_err(),
            SessionError::PromptAlreadyActive
        );
    }

    #[test]
    fn test_draw_without_kind_spins() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Adult);

        // First pick spins (1 = dare), second picks the prompt
        let mut rng = SequenceRng::new(vec![1, 3]);
        let room = engine
            .draw(&room, &roster, "ama", None, &PromptCatalog::builtin(), &mut rng)
            .unwrap();
        assert_eq!(
            room.turn,
            TurnState::PromptActive {
                prompt: Prompt {
                    kind: PromptKind::Dare,
                    text: "Write a short romantic message to the other player".to_string(),
                }
            }
        );
    }

    #[test]
    fn test_non_holder_cannot_act() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Friendly);

        assert_eq!(
            draw(&engine, &room, &roster, "ben", PromptKind::Truth).unwrap_err(),
            SessionError::NotYourTurn
        );

        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();
        assert_eq!(
            engine
                .submit_answer(&room, &roster, "ben", "sneaky")
                .unwrap_err(),
            SessionError::NotYourTurn
        );
        assert_eq!(
            engine.advance(&room, &roster, "ben").unwrap_err(),
            SessionError::NotYourTurn
        );
    }

    #[test]
    fn test_submit_answer_resolves_and_rotates() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Crush);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();

        let room = engine
            .submit_answer(&room, &roster, "ama", "  I like stargazing.  ")
            .unwrap();

        assert_eq!(room.round, 2);
        assert_eq!(room.turn_holder.as_deref(), Some("ben"));
        assert_eq!(room.turn, TurnState::Idle);
        assert_eq!(room.history.len(), 1);
        let entry = &room.history[0];
        assert_eq!(entry.round, 1);
        assert_eq!(entry.kind, PromptKind::Truth);
        assert_eq!(entry.answer.as_deref(), Some("I like stargazing."));
        assert_eq!(entry.player_name, "Ama");
    }

    #[test]
    fn test_empty_answer_rejected_without_history() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Crush);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();

        assert_eq!(
            engine
                .submit_answer(&room, &roster, "ama", "   ")
                .unwrap_err(),
            SessionError::EmptyAnswer
        );
        assert!(room.history.is_empty());
    }

    #[test]
    fn test_submit_answer_on_dare_is_rejected() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Crush);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Dare).unwrap();

        assert_eq!(
            engine
                .submit_answer(&room, &roster, "ama", "done it")
                .unwrap_err(),
            SessionError::NoActivePrompt
        );
    }

    #[test]
    fn test_retried_answer_reports_already_advanced() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Crush);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();
        let room = engine
            .submit_answer(&room, &roster, "ama", "Stargazing")
            .unwrap();

        assert_eq!(
            engine
                .submit_answer(&room, &roster, "ama", "Stargazing")
                .unwrap_err(),
            SessionError::AlreadyAdvanced
        );
    }

    #[test]
    fn test_dare_advance_records_entry_without_answer() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Friendly);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Dare).unwrap();

        let room = engine.advance(&room, &roster, "ama").unwrap();
        assert_eq!(room.history.len(), 1);
        assert_eq!(room.history[0].kind, PromptKind::Dare);
        assert!(room.history[0].answer.is_none());
        assert_eq!(room.round, 2);
    }

    #[test]
    fn test_double_advance_is_idempotent() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Friendly);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Dare).unwrap();
        let room = engine.advance(&room, &roster, "ama").unwrap();

        // Late duplicate from the previous holder, and a premature tap from the new one
        assert_eq!(
            engine.advance(&room, &roster, "ama").unwrap_err(),
            SessionError::AlreadyAdvanced
        );
        assert_eq!(
            engine.advance(&room, &roster, "ben").unwrap_err(),
            SessionError::AlreadyAdvanced
        );
        assert_eq!(room.round, 2);
        assert_eq!(room.history.len(), 1);
    }

    #[test]
    fn test_bystander_advance_on_idle_is_not_your_turn() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben", "Cleo"]);
        let room = playing_room(&roster, Mode::Friendly);

        assert_eq!(
            engine.advance(&room, &roster, "cleo").unwrap_err(),
            SessionError::NotYourTurn
        );
    }

    #[test]
    fn test_rotation_and_round_limit() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben", "Cleo"]);
        let mut room = playing_room(&roster, Mode::Friendly);
        let mut holders = Vec::new();

        for expected_round in 1..=10 {
            assert_eq!(room.round, expected_round);
            let holder = room.turn_holder.clone().unwrap();
            holders.push(holder.clone());
            room = draw(&engine, &room, &roster, &holder, PromptKind::Dare).unwrap();
            room = engine.advance(&room, &roster, &holder).unwrap();
            assert_eq!(room.history.len(), expected_round as usize);
        }

        assert_eq!(
            holders,
            vec!["ama", "ben", "cleo", "ama", "ben", "cleo", "ama", "ben", "cleo", "ama"]
        );
        assert_eq!(room.round, 10);
        assert_eq!(room.turn, TurnState::Finished);
        assert_eq!(room.turn_holder.as_deref(), Some("ama"));

        assert_eq!(
            draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap_err(),
            SessionError::RoundLimitReached(10)
        );
        assert_eq!(
            engine.advance(&room, &roster, "ama").unwrap_err(),
            SessionError::AlreadyAdvanced
        );
        assert_eq!(
            engine.advance(&room, &roster, "ben").unwrap_err(),
            SessionError::RoundLimitReached(10)
        );
    }

    #[test]
    fn test_skipping_truth_records_unanswered_entry() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben"]);
        let room = playing_room(&roster, Mode::Friendly);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();

        let room = engine.advance(&room, &roster, "ama").unwrap();
        assert_eq!(room.history.len(), 1);
        assert_eq!(room.history[0].kind, PromptKind::Truth);
        assert!(room.history[0].answer.is_none());
    }

    #[test]
    fn test_solo_engine_ignores_turn_ownership() {
        let engine = TurnEngine::solo();
        let roster = players(&["Ama"]);
        let room = Room::new("SOLO01".to_string(), RoomKind::Solo, 10);
        let room = engine
            .start(&room, &roster, "ama", Mode::Friendly, 1)
            .unwrap();

        let room = draw(&engine, &room, &roster, "someone-else", PromptKind::Dare).unwrap();
        let room = engine.advance(&room, &roster, "someone-else").unwrap();
        assert_eq!(room.round, 2);
        assert_eq!(room.turn_holder.as_deref(), Some("ama"));
        assert_eq!(room.history[0].player_name, "Ama");
    }

    #[test]
    fn test_holder_missing_from_roster_is_rejected() {
        let engine = TurnEngine::multiplayer();
        let roster = players(&["Ama", "Ben", "Cy"]);
        let room = playing_room(&roster, Mode::Friendly);
        let room = draw(&engine, &room, &roster, "ama", PromptKind::Dare).unwrap();

        // Ama left but the room still names them as holder
        let remaining = roster[1..].to_vec();
        assert_eq!(
            engine.advance(&room, &remaining, "ama").unwrap_err(),
            SessionError::PlayerNotFound("ama".to_string())
        );

        let mut idle = room.clone();
        idle.turn = TurnState::Idle;
        assert_eq!(
            draw(&engine, &idle, &remaining, "ama", PromptKind::Truth).unwrap_err(),
            SessionError::PlayerNotFound("ama".to_string())
        );
        assert_eq!(
            engine.submit_answer(&idle, &remaining, "ama", "hi").unwrap_err(),
            SessionError::PlayerNotFound("ama".to_string())
        );
    }

    #[test]
    fn test_solo_repeat_answer_needs_a_fresh_prompt() {
        let engine = TurnEngine::solo();
        let roster = players(&["Ama"]);
        let room = Room::new("SOLO01".to_string(), RoomKind::Solo, 10);
        let room = engine
            .start(&room, &roster, "ama", Mode::Friendly, 1)
            .unwrap();

        let room = draw(&engine, &room, &roster, "ama", PromptKind::Truth).unwrap();
        let room = engine.submit_answer(&room, &roster, "ama", "x").unwrap();
        assert_eq!(room.turn, TurnState::Idle);
        assert_eq!(
            engine.submit_answer(&room, &roster, "ama", "x").unwrap_err(),
            SessionError::NoActivePrompt
        );
        assert_eq!(room.history.len(), 1);
    }
}

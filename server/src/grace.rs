//! Seats held for players who dropped out of a room.
//!
//! At most one entry exists per player. Arming a new entry supersedes the old
//! one, so the old entry's timer no longer matches and expires as a no-op.

use crate::timers::TimerToken;
use shared::PlayerId;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceEntry {
    pub room: String,
    pub token: TimerToken,
}

#[derive(Debug, Default)]
pub struct GraceRegistry {
    entries: HashMap<PlayerId, GraceEntry>,
}

impl GraceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Holds `player_id`'s seat in `room` until the timer behind `token`
    /// fires. Returns the entry this one replaced.
    pub fn arm(&mut self, player_id: &str, room: &str, token: TimerToken) -> Option<GraceEntry> {
        self.entries.insert(
            player_id.to_string(),
            GraceEntry {
                room: room.to_string(),
                token,
            },
        )
    }

    pub fn get(&self, player_id: &str) -> Option<&GraceEntry> {
        self.entries.get(player_id)
    }

    pub fn clear(&mut self, player_id: &str) -> Option<GraceEntry> {
        self.entries.remove(player_id)
    }

    /// Consumes the entry if `token` is still the live one for this player.
    pub fn take_if_current(&mut self, player_id: &str, token: TimerToken) -> Option<GraceEntry> {
        match self.entries.get(player_id) {
            Some(entry) if entry.token == token => self.entries.remove(player_id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Deferred transitions requested by the coordinator.
//!
//! The coordinator never sleeps. It records what should happen later as a
//! `ScheduledTimer`, the network loop turns each one into a sleeping task, and
//! the fired `Timer` comes back through the same channel as player packets.
//! Each timer carries a `TimerToken` that the affected entity also stores; a
//! timer whose token no longer matches is stale and gets dropped.

use shared::PlayerId;
use std::time::Duration;

/// Unique, never reused handle for one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Timer {
    /// A disconnected player's seat is released.
    GraceExpired {
        player_id: PlayerId,
        room: String,
        token: TimerToken,
    },
    /// A full room's countdown ends and the first hand is dealt.
    Prestart { room: String, token: TimerToken },
    /// The winner screen ends and the room sees the countdown again.
    WinPause { room: String, token: TimerToken },
    /// The automatic rematch is dealt.
    Restart { room: String, token: TimerToken },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTimer {
    pub delay: Duration,
    pub timer: Timer,
}

/// Timers requested since the last drain.
#[derive(Debug, Default)]
pub struct TimerQueue {
    next_token: u64,
    pending: Vec<ScheduledTimer>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_token(&mut self) -> TimerToken {
        self.next_token += 1;
        TimerToken(self.next_token)
    }

    pub fn schedule(&mut self, delay: Duration, timer: Timer) {
        self.pending.push(ScheduledTimer { delay, timer });
    }

    pub fn drain(&mut self) -> Vec<ScheduledTimer> {
        std::mem::take(&mut self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

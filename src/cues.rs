//! Side-effect port between the simulation and its presentation.
//!
//! The engine never plays sounds, speaks, or spawns particles itself. It
//! queues [`MatchEvent`]s and hands them to whatever implements [`CueSink`]:
//! an audio/speech layer or the batch runner's tally.

use std::collections::BTreeMap;

use crate::types::MatchEvent;

pub trait CueSink {
    fn cue(&mut self, event: &MatchEvent);
}

#[derive(Clone, Debug, Default)]
pub struct CueTally {
    pub counts: BTreeMap<&'static str, usize>,
    /// Whether the continuous background audio would be playing.
    pub music_playing: bool,
}

impl CueTally {
    pub fn count(&self, key: &str) -> usize {
        self.counts.get(key).copied().unwrap_or(0)
    }
}

pub fn event_key(event: &MatchEvent) -> &'static str {
    match event {
        MatchEvent::MatchStarted => "match_started",
        MatchEvent::AttackStarted { .. } => "attack_started",
        MatchEvent::Hit { .. } => "hit",
        MatchEvent::Blocked { .. } => "blocked",
        MatchEvent::Ko { .. } => "ko",
        MatchEvent::TimeUp => "time_up",
        MatchEvent::MatchEnded { .. } => "match_ended",
    }
}

impl CueSink for CueTally {
    fn cue(&mut self, event: &MatchEvent) {
        *self.counts.entry(event_key(event)).or_insert(0) += 1;
        match event {
            MatchEvent::MatchStarted => self.music_playing = true,
            MatchEvent::MatchEnded { .. } => self.music_playing = false,
            _ => {}
        }
    }
}

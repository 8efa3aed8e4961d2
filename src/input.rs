use std::collections::{BTreeSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::constants::INPUT_HISTORY_LEN;
use crate::error::ConfigError;
use crate::types::Facing;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
    Punch,
    Kick,
    Block,
    Special,
}

impl Action {
    pub const ALL: [Action; 8] = [
        Action::Up,
        Action::Down,
        Action::Left,
        Action::Right,
        Action::Punch,
        Action::Kick,
        Action::Block,
        Action::Special,
    ];

    fn bit(self) -> u8 {
        1 << (self as u8)
    }

    pub fn toward(facing: Facing) -> Self {
        match facing {
            Facing::Left => Action::Left,
            Facing::Right => Action::Right,
        }
    }
}

/// Symbols currently held for one tick. Built once, never mutated.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    symbols: BTreeSet<String>,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.contains(symbol)
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for InputSnapshot {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            symbols: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HeldActions(u8);

impl HeldActions {
    pub fn none() -> Self {
        Self(0)
    }

    pub fn of(actions: &[Action]) -> Self {
        let mut held = Self::none();
        for action in actions {
            held.insert(*action);
        }
        held
    }

    pub fn insert(&mut self, action: Action) {
        self.0 |= action.bit();
    }

    pub fn contains(self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Actions held now that were released on the previous tick.
    pub fn newly_pressed(self, previous: HeldActions) -> HeldActions {
        Self(self.0 & !previous.0)
    }

    pub fn iter(self) -> impl Iterator<Item = Action> {
        Action::ALL
            .into_iter()
            .filter(move |action| self.contains(*action))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMap {
    pub up: String,
    pub down: String,
    pub left: String,
    pub right: String,
    pub punch: String,
    pub kick: String,
    pub block: String,
    pub special: String,
}

impl KeyMap {
    pub fn player_one() -> Self {
        Self {
            up: "w".to_string(),
            down: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            punch: "f".to_string(),
            kick: "g".to_string(),
            block: "v".to_string(),
            special: "r".to_string(),
        }
    }

    pub fn player_two() -> Self {
        Self {
            up: "ArrowUp".to_string(),
            down: "ArrowDown".to_string(),
            left: "ArrowLeft".to_string(),
            right: "ArrowRight".to_string(),
            punch: "k".to_string(),
            kick: "l".to_string(),
            block: "m".to_string(),
            special: "p".to_string(),
        }
    }

    pub fn symbol(&self, action: Action) -> &str {
        match action {
            Action::Up => &self.up,
            Action::Down => &self.down,
            Action::Left => &self.left,
            Action::Right => &self.right,
            Action::Punch => &self.punch,
            Action::Kick => &self.kick,
            Action::Block => &self.block,
            Action::Special => &self.special,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (idx, action) in Action::ALL.iter().enumerate() {
            let symbol = self.symbol(*action);
            if symbol.trim().is_empty() {
                return Err(ConfigError::EmptySymbol(*action));
            }
            if let Some(first) = Action::ALL[..idx]
                .iter()
                .find(|other| self.symbol(**other) == symbol)
            {
                return Err(ConfigError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                    first: *first,
                    second: *action,
                });
            }
        }
        Ok(())
    }

    pub fn shared_symbol(&self, other: &KeyMap) -> Option<String> {
        Action::ALL
            .iter()
            .map(|action| self.symbol(*action))
            .find(|symbol| Action::ALL.iter().any(|a| other.symbol(*a) == *symbol))
            .map(str::to_string)
    }

    pub fn resolve(&self, snapshot: &InputSnapshot) -> HeldActions {
        let mut held = HeldActions::none();
        for action in Action::ALL {
            if snapshot.contains(self.symbol(action)) {
                held.insert(action);
            }
        }
        held
    }

    pub fn encode(&self, held: HeldActions) -> InputSnapshot {
        held.iter().map(|action| self.symbol(action)).collect()
    }
}

/// Recent action presses, oldest first, used for motion inputs.
#[derive(Clone, Debug, Default)]
pub struct InputHistory {
    entries: VecDeque<(Action, u64)>,
}

impl InputHistory {
    pub fn record(&mut self, action: Action, at_ms: u64) {
        if self.entries.len() == INPUT_HISTORY_LEN {
            self.entries.pop_front();
        }
        self.entries.push_back((action, at_ms));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the newest entries are exactly `sequence` and the first of
    /// them happened no more than `window_ms` before `now_ms`.
    pub fn ends_with_motion(&self, sequence: &[Action], window_ms: u64, now_ms: u64) -> bool {
        if sequence.is_empty() || self.entries.len() < sequence.len() {
            return false;
        }
        let start = self.entries.len() - sequence.len();
        let tail = self.entries.range(start..);
        let mut first_at = None;
        for ((action, at_ms), expected) in tail.zip(sequence.iter()) {
            if action != expected {
                return false;
            }
            first_at.get_or_insert(*at_ms);
        }
        first_at.is_some_and(|at| now_ms.saturating_sub(at) <= window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_key_maps_are_valid_and_disjoint() {
        let p1 = KeyMap::player_one();
        let p2 = KeyMap::player_two();
        assert_eq!(p1.validate(), Ok(()));
        assert_eq!(p2.validate(), Ok(()));
        assert_eq!(p1.shared_symbol(&p2), None);
    }

    #[test]
    fn empty_symbol_fails_validation() {
        let mut keys = KeyMap::player_one();
        keys.kick = "  ".to_string();
        assert_eq!(keys.validate(), Err(ConfigError::EmptySymbol(Action::Kick)));
    }

    #[test]
    fn duplicate_symbol_fails_validation() {
        let mut keys = KeyMap::player_one();
        keys.special = "f".to_string();
        assert_eq!(
            keys.validate(),
            Err(ConfigError::DuplicateSymbol {
                symbol: "f".to_string(),
                first: Action::Punch,
                second: Action::Special,
            })
        );
    }

    #[test]
    fn resolve_ignores_foreign_symbols() {
        let keys = KeyMap::player_one();
        let snapshot: InputSnapshot = ["a", "f", "ArrowUp", "k"].into_iter().collect();
        let held = keys.resolve(&snapshot);
        assert!(held.contains(Action::Left));
        assert!(held.contains(Action::Punch));
        assert!(!held.contains(Action::Up));
        assert_eq!(held.iter().count(), 2);
    }

    #[test]
    fn encode_round_trips_through_resolve() {
        let keys = KeyMap::player_two();
        let held = HeldActions::of(&[Action::Block, Action::Right]);
        let snapshot = keys.encode(held);
        assert!(snapshot.contains("m"));
        assert!(snapshot.contains("ArrowRight"));
        assert_eq!(keys.resolve(&snapshot), held);
    }

    #[test]
    fn newly_pressed_only_reports_edges() {
        let before = HeldActions::of(&[Action::Down]);
        let now = HeldActions::of(&[Action::Down, Action::Punch]);
        let pressed = now.newly_pressed(before);
        assert!(pressed.contains(Action::Punch));
        assert!(!pressed.contains(Action::Down));
    }

    #[test]
    fn history_is_bounded_to_five_entries() {
        let mut history = InputHistory::default();
        for at in 0..8 {
            history.record(Action::Up, at);
        }
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn motion_requires_order_and_window() {
        let mut history = InputHistory::default();
        history.record(Action::Down, 1_000);
        history.record(Action::Right, 1_100);
        history.record(Action::Punch, 1_300);
        let motion = [Action::Down, Action::Right, Action::Punch];
        assert!(history.ends_with_motion(&motion, 500, 1_300));
        assert!(!history.ends_with_motion(&motion, 500, 1_600));
        assert!(!history.ends_with_motion(
            &[Action::Down, Action::Left, Action::Punch],
            500,
            1_300
        ));
    }

    #[test]
    fn key_map_loads_from_json() {
        let keys: KeyMap = serde_json::from_str(
            r#"{"up":"i","down":"k","left":"j","right":"l","punch":"u","kick":"o","block":"n","special":"y"}"#,
        )
        .expect("key map should parse");
        assert_eq!(keys.symbol(Action::Special), "y");
        assert_eq!(keys.validate(), Ok(()));
    }
}

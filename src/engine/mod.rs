use crate::ai::AiController;
use crate::constants::{get_ai_meter_regen, ticks_to_ms, ROUND_SECONDS};
use crate::cues::CueSink;
use crate::error::ConfigError;
use crate::fighter::{AttackStart, Fighter, FighterConfig};
use crate::input::InputSnapshot;
use crate::rng::Rng;
use crate::types::{
    Difficulty, EndReason, FighterSummary, MatchEvent, MatchPhase, MatchSummary, Outcome,
    Snapshot,
};

pub mod combat;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    Human,
    Ai(Difficulty),
}

#[derive(Clone, Debug)]
pub struct FighterSetup {
    pub config: FighterConfig,
    pub control: Control,
}

impl FighterSetup {
    pub fn human(config: FighterConfig) -> Self {
        Self {
            config,
            control: Control::Human,
        }
    }

    pub fn ai(config: FighterConfig, difficulty: Difficulty) -> Self {
        Self {
            config,
            control: Control::Ai(difficulty),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatchOptions {
    pub p1: FighterSetup,
    pub p2: FighterSetup,
    pub round_seconds: Option<u32>,
    pub seed: u32,
}

impl MatchOptions {
    pub fn versus_ai(difficulty: Difficulty, seed: u32) -> Self {
        Self {
            p1: FighterSetup::human(FighterConfig::player_one()),
            p2: FighterSetup::ai(FighterConfig::player_two(), difficulty),
            round_seconds: None,
            seed,
        }
    }

    pub fn local_versus(seed: u32) -> Self {
        Self {
            p1: FighterSetup::human(FighterConfig::player_one()),
            p2: FighterSetup::human(FighterConfig::player_two()),
            round_seconds: None,
            seed,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MatchInputs {
    pub p1: InputSnapshot,
    pub p2: InputSnapshot,
}

#[derive(Clone, Debug)]
pub struct MatchEngine {
    pub seed: u32,

    rng: Rng,
    fighters: [Fighter; 2],
    controllers: [Option<AiController>; 2],
    events: Vec<MatchEvent>,

    phase: MatchPhase,
    outcome: Option<Outcome>,
    end_reason: Option<EndReason>,
    round_seconds: u32,
    time_left: u32,
    tick_counter: u64,
    play_ticks: u64,
}

impl MatchEngine {
    pub fn new(options: MatchOptions) -> Result<Self, ConfigError> {
        if options.p1.config.id == options.p2.config.id {
            return Err(ConfigError::DuplicateFighterId);
        }
        if let Some(symbol) = options.p1.config.keys.shared_symbol(&options.p2.config.keys) {
            return Err(ConfigError::SharedSymbol(symbol));
        }

        let mut p1 = Fighter::new(options.p1.config)?;
        let mut p2 = Fighter::new(options.p2.config)?;
        let c1 = make_controller(&mut p1, options.p1.control);
        let c2 = make_controller(&mut p2, options.p2.control);
        let round_seconds = options.round_seconds.unwrap_or(ROUND_SECONDS).max(1);

        Ok(Self {
            seed: options.seed,
            rng: Rng::new(options.seed),
            fighters: [p1, p2],
            controllers: [c1, c2],
            events: Vec::new(),
            phase: MatchPhase::Ready,
            outcome: None,
            end_reason: None,
            round_seconds,
            time_left: round_seconds,
            tick_counter: 0,
            play_ticks: 0,
        })
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == MatchPhase::GameOver
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        self.end_reason
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn fighters(&self) -> &[Fighter; 2] {
        &self.fighters
    }

    pub fn fighter(&self, id: u8) -> Option<&Fighter> {
        self.fighters.iter().find(|fighter| fighter.id == id)
    }

    pub fn is_ai(&self, id: u8) -> bool {
        self.fighters
            .iter()
            .zip(self.controllers.iter())
            .any(|(fighter, controller)| fighter.id == id && controller.is_some())
    }

    /// Ready -> Playing. Returns false when the match was not waiting.
    pub fn start(&mut self) -> bool {
        if self.phase != MatchPhase::Ready {
            return false;
        }
        self.phase = MatchPhase::Playing;
        self.events.push(MatchEvent::MatchStarted);
        true
    }

    /// Advance one fixed tick. Outside `Playing` the bodies keep settling
    /// but every input, human or computer, is ignored.
    pub fn step(&mut self, inputs: &MatchInputs) {
        self.tick_counter += 1;
        let now_ms = ticks_to_ms(self.tick_counter);
        let playing = self.phase == MatchPhase::Playing;
        if playing {
            self.play_ticks += 1;
        }

        let mut held = [InputSnapshot::empty(), InputSnapshot::empty()];
        if playing {
            held = [inputs.p1.clone(), inputs.p2.clone()];
            for idx in 0..2 {
                if let Some(controller) = self.controllers[idx].as_mut() {
                    held[idx] = controller.tick(
                        &self.fighters[idx],
                        &self.fighters[1 - idx],
                        &mut self.rng,
                    );
                }
            }
        }

        let [p1, p2] = &mut self.fighters;
        let p1_started = p1.update(&held[0], p2.position().x, now_ms, playing);
        let p2_started = p2.update(&held[1], p1.position().x, now_ms, playing);
        self.push_attack_started(1, p1_started);
        self.push_attack_started(2, p2_started);

        if playing {
            self.resolve_combat();
        }
    }

    pub fn tick_round_timer(&mut self) {
        if self.phase != MatchPhase::Playing || self.time_left == 0 {
            return;
        }
        self.time_left -= 1;
        if self.time_left > 0 {
            return;
        }

        self.events.push(MatchEvent::TimeUp);
        let [p1, p2] = &self.fighters;
        let outcome = if p1.health > p2.health {
            outcome_for(p1.id)
        } else if p2.health > p1.health {
            outcome_for(p2.id)
        } else {
            Outcome::Draw
        };
        self.finish(outcome, EndReason::TimeUp);
    }

    pub fn rematch(&mut self) {
        for fighter in &mut self.fighters {
            fighter.reset();
        }
        for controller in self.controllers.iter_mut().flatten() {
            controller.clear();
        }
        self.events.clear();
        self.phase = MatchPhase::Ready;
        self.outcome = None;
        self.end_reason = None;
        self.time_left = self.round_seconds;
        self.tick_counter = 0;
        self.play_ticks = 0;
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            time_left: self.time_left,
            phase: self.phase,
            outcome: self.outcome,
            fighters: self.fighters.iter().map(Fighter::view).collect(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    /// Drains queued events into `sink`. Shares the queue with
    /// `build_snapshot(true)`, so a host uses one or the other.
    pub fn dispatch_cues(&mut self, sink: &mut dyn CueSink) {
        for event in self.events.drain(..) {
            sink.cue(&event);
        }
    }

    pub fn build_summary(&self) -> MatchSummary {
        MatchSummary {
            outcome: self.outcome,
            reason: self.end_reason,
            duration_ticks: self.play_ticks,
            time_left: self.time_left,
            fighters: self
                .fighters
                .iter()
                .map(|fighter| FighterSummary {
                    id: fighter.id,
                    name: fighter.name.clone(),
                    health: fighter.health,
                    stats: fighter.stats.clone(),
                })
                .collect(),
        }
    }

    fn push_attack_started(&mut self, slot: usize, started: Option<AttackStart>) {
        if let Some(start) = started {
            self.events.push(MatchEvent::AttackStarted {
                player: self.fighters[slot - 1].id,
                kind: start.kind,
                shortcut: start.shortcut,
            });
        }
    }

    fn resolve_combat(&mut self) {
        let [p1, p2] = &mut self.fighters;
        let reports = combat::resolve_exchange(p1, p2);
        if reports.is_empty() {
            return;
        }
        self.events
            .extend(reports.into_iter().map(|report| report.event));

        let [p1, p2] = &self.fighters;
        let (p1_dead, p2_dead) = (p1.is_dead(), p2.is_dead());
        let (p1_id, p2_id) = (p1.id, p2.id);
        if p1_dead {
            self.events.push(MatchEvent::Ko { player: p1_id });
        }
        if p2_dead {
            self.events.push(MatchEvent::Ko { player: p2_id });
        }
        match (p1_dead, p2_dead) {
            (true, true) => self.finish(Outcome::Draw, EndReason::DoubleKo),
            (true, false) => self.finish(outcome_for(p2_id), EndReason::Ko),
            (false, true) => self.finish(outcome_for(p1_id), EndReason::Ko),
            (false, false) => {}
        }
    }

    fn finish(&mut self, outcome: Outcome, reason: EndReason) {
        self.phase = MatchPhase::GameOver;
        self.outcome = Some(outcome);
        self.end_reason = Some(reason);
        if let Some(winner) = outcome.winner() {
            for fighter in &mut self.fighters {
                if fighter.id == winner && !fighter.is_dead() {
                    fighter.declare_winner();
                }
            }
        }
        self.events.push(MatchEvent::MatchEnded { outcome, reason });
    }
}

fn make_controller(fighter: &mut Fighter, control: Control) -> Option<AiController> {
    match control {
        Control::Human => None,
        Control::Ai(difficulty) => {
            let controller = AiController::new(difficulty);
            fighter.meter_regen = get_ai_meter_regen(controller.profile());
            Some(controller)
        }
    }
}

fn outcome_for(winner_id: u8) -> Outcome {
    if winner_id == 1 {
        Outcome::PlayerOneWins
    } else {
        Outcome::PlayerTwoWins
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{MAX_HEALTH, MAX_METER, METER_REGEN_PER_TICK, P1_SPAWN_X, TICK_RATE};
    use crate::cues::CueTally;
    use crate::input::{Action, HeldActions, KeyMap};
    use crate::types::PlayerState;

    fn make_engine(seed: u32) -> MatchEngine {
        MatchEngine::new(MatchOptions::local_versus(seed)).expect("preset options are valid")
    }

    fn make_ai_engine(p1: Difficulty, p2: Difficulty, seed: u32) -> MatchEngine {
        MatchEngine::new(MatchOptions {
            p1: FighterSetup::ai(FighterConfig::player_one(), p1),
            p2: FighterSetup::ai(FighterConfig::player_two(), p2),
            round_seconds: None,
            seed,
        })
        .expect("preset options are valid")
    }

    fn face_off(engine: &mut MatchEngine, distance: f32) {
        engine.fighters[0].body.position.x = 300.0;
        engine.fighters[1].body.position.x = 300.0 + distance;
    }

    fn inputs(engine: &MatchEngine, p1: &[Action], p2: &[Action]) -> MatchInputs {
        MatchInputs {
            p1: engine.fighters[0].keys.encode(HeldActions::of(p1)),
            p2: engine.fighters[1].keys.encode(HeldActions::of(p2)),
        }
    }

    fn run_until_over(engine: &mut MatchEngine, max_ticks: u64) {
        for tick in 1..=max_ticks {
            if engine.is_ended() {
                return;
            }
            engine.step(&MatchInputs::default());
            if tick % TICK_RATE as u64 == 0 {
                engine.tick_round_timer();
            }
        }
    }

    #[test]
    fn rejects_shared_symbols_and_duplicate_ids() {
        let mut options = MatchOptions::local_versus(1);
        options.p2.config.keys = KeyMap::player_one();
        assert_eq!(
            MatchEngine::new(options).err(),
            Some(ConfigError::SharedSymbol("w".to_string()))
        );

        let mut options = MatchOptions::local_versus(1);
        options.p2.config.id = 1;
        assert_eq!(
            MatchEngine::new(options).err(),
            Some(ConfigError::DuplicateFighterId)
        );
    }

    #[test]
    fn ready_phase_ignores_input_and_pauses_timer() {
        let mut engine = make_engine(1);
        assert_eq!(engine.phase(), MatchPhase::Ready);
        let walk = inputs(&engine, &[Action::Right, Action::Punch], &[]);
        for _ in 0..10 {
            engine.step(&walk);
        }
        engine.tick_round_timer();
        assert_eq!(engine.fighters[0].body.position.x, P1_SPAWN_X);
        assert!(!engine.fighters[0].is_attacking());
        assert_eq!(engine.time_left(), ROUND_SECONDS);

        assert!(engine.start());
        assert!(!engine.start());
        let snapshot = engine.build_snapshot(true);
        assert_eq!(snapshot.events, vec![MatchEvent::MatchStarted]);
        engine.tick_round_timer();
        assert_eq!(engine.time_left(), ROUND_SECONDS - 1);
    }

    #[test]
    fn knockout_ends_match_immediately() {
        let mut engine = make_engine(2);
        engine.start();
        face_off(&mut engine, 100.0);
        engine.fighters[1].health = 5.0;

        engine.step(&inputs(&engine, &[Action::Punch], &[]));
        for _ in 0..10 {
            if engine.is_ended() {
                break;
            }
            engine.step(&MatchInputs::default());
        }

        assert_eq!(engine.phase(), MatchPhase::GameOver);
        assert_eq!(engine.outcome(), Some(Outcome::PlayerOneWins));
        assert_eq!(engine.end_reason(), Some(EndReason::Ko));
        assert_eq!(engine.fighters[0].state, PlayerState::Win);
        assert_eq!(engine.fighters[1].state, PlayerState::Dead);
        assert_eq!(engine.fighters[1].health, 0.0);

        let events = engine.build_snapshot(true).events;
        assert!(events.contains(&MatchEvent::Ko { player: 2 }));
        assert_eq!(
            events.last(),
            Some(&MatchEvent::MatchEnded {
                outcome: Outcome::PlayerOneWins,
                reason: EndReason::Ko,
            })
        );
    }

    #[test]
    fn simultaneous_knockout_is_a_draw() {
        let mut engine = make_engine(3);
        engine.start();
        face_off(&mut engine, 100.0);
        engine.fighters[0].health = 5.0;
        engine.fighters[1].health = 5.0;

        engine.step(&inputs(&engine, &[Action::Punch], &[Action::Punch]));
        for _ in 0..10 {
            if engine.is_ended() {
                break;
            }
            engine.step(&MatchInputs::default());
        }

        assert_eq!(engine.outcome(), Some(Outcome::Draw));
        assert_eq!(engine.end_reason(), Some(EndReason::DoubleKo));
        assert!(engine.fighters.iter().all(Fighter::is_dead));
    }

    #[test]
    fn time_up_awards_higher_health() {
        let mut engine = make_engine(4);
        engine.start();
        engine.fighters[0].health = 60.0;
        engine.fighters[1].health = 40.0;
        engine.time_left = 1;
        engine.tick_round_timer();
        assert_eq!(engine.outcome(), Some(Outcome::PlayerOneWins));
        assert_eq!(engine.end_reason(), Some(EndReason::TimeUp));
        assert_eq!(engine.fighters[0].state, PlayerState::Win);

        let events = engine.build_snapshot(true).events;
        assert_eq!(
            events,
            vec![
                MatchEvent::MatchStarted,
                MatchEvent::TimeUp,
                MatchEvent::MatchEnded {
                    outcome: Outcome::PlayerOneWins,
                    reason: EndReason::TimeUp,
                },
            ]
        );

        engine.tick_round_timer();
        assert_eq!(engine.time_left(), 0);
    }

    #[test]
    fn time_up_with_equal_health_is_a_draw() {
        let mut engine = make_engine(5);
        engine.start();
        engine.fighters[0].health = 50.0;
        engine.fighters[1].health = 50.0;
        engine.time_left = 1;
        engine.tick_round_timer();
        assert_eq!(engine.outcome(), Some(Outcome::Draw));
        assert!(engine
            .fighters
            .iter()
            .all(|fighter| fighter.state != PlayerState::Win));
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = make_engine(6);
        engine.start();
        let peek = engine.build_snapshot(false);
        assert!(peek.events.is_empty());
        let first = engine.build_snapshot(true);
        let second = engine.build_snapshot(true);
        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 0);
    }

    #[test]
    fn dispatch_cues_feeds_the_sink() {
        let mut engine = make_engine(7);
        engine.start();
        engine.step(&inputs(&engine, &[Action::Kick], &[]));
        let mut tally = CueTally::default();
        engine.dispatch_cues(&mut tally);
        assert_eq!(tally.count("match_started"), 1);
        assert_eq!(tally.count("attack_started"), 1);
        assert!(tally.music_playing);
        assert!(engine.build_snapshot(true).events.is_empty());
    }

    #[test]
    fn same_seed_produces_same_match() {
        let mut a = make_ai_engine(Difficulty::Hard, Difficulty::Medium, 42);
        let mut b = make_ai_engine(Difficulty::Hard, Difficulty::Medium, 42);
        a.start();
        b.start();
        for tick in 1..=900u64 {
            a.step(&MatchInputs::default());
            b.step(&MatchInputs::default());
            if tick % TICK_RATE as u64 == 0 {
                a.tick_round_timer();
                b.tick_round_timer();
            }
            let left = serde_json::to_string(&a.build_snapshot(true)).expect("snapshot json");
            let right = serde_json::to_string(&b.build_snapshot(true)).expect("snapshot json");
            assert_eq!(left, right, "diverged at tick {tick}");
        }
    }

    #[test]
    fn waiting_in_ready_builds_no_meter() {
        let mut engine = MatchEngine::new(MatchOptions::versus_ai(Difficulty::Impossible, 11))
            .expect("preset options are valid");
        engine.fighters[0].register_hit();
        for _ in 0..180 {
            engine.step(&MatchInputs::default());
        }
        for fighter in &engine.fighters {
            assert_eq!(fighter.special_meter, 0.0);
        }
        assert_eq!(engine.fighters[0].combo_count, 1);

        engine.start();
        engine.step(&MatchInputs::default());
        assert!((engine.fighters[0].special_meter - METER_REGEN_PER_TICK).abs() < 1e-6);
        assert!(engine.fighters[1].special_meter > METER_REGEN_PER_TICK);
    }

    #[test]
    fn ai_fighter_regenerates_meter_faster() {
        let engine = MatchEngine::new(MatchOptions::versus_ai(Difficulty::Medium, 8))
            .expect("preset options are valid");
        assert_eq!(engine.fighters[0].meter_regen, METER_REGEN_PER_TICK);
        assert!(engine.fighters[1].meter_regen > METER_REGEN_PER_TICK);
        assert!(engine.is_ai(2));
        assert!(!engine.is_ai(1));
    }

    #[test]
    fn long_ai_match_keeps_invariants() {
        let mut engine = make_ai_engine(Difficulty::Impossible, Difficulty::Insane, 1234);
        engine.start();
        let mut dead_seen = [false; 2];
        for tick in 1..=(ROUND_SECONDS as u64 * TICK_RATE as u64 + 10) {
            engine.step(&MatchInputs::default());
            if tick % TICK_RATE as u64 == 0 {
                engine.tick_round_timer();
            }
            for (idx, fighter) in engine.fighters.iter().enumerate() {
                assert!((0.0..=MAX_HEALTH).contains(&fighter.health));
                assert!((0.0..=MAX_METER).contains(&fighter.special_meter));
                assert!(!(fighter.is_blocking && fighter.is_attacking()));
                if dead_seen[idx] {
                    assert_eq!(fighter.state, PlayerState::Dead);
                }
                dead_seen[idx] |= fighter.is_dead();
            }
        }
        assert!(engine.is_ended());
        let summary = engine.build_summary();
        assert!(summary.outcome.is_some());
        assert!(summary.duration_ticks > 0);
    }

    #[test]
    fn rematch_restores_initial_state() {
        let mut engine = make_ai_engine(Difficulty::Extreme, Difficulty::Extreme, 99);
        engine.start();
        run_until_over(&mut engine, 60 * 120);
        assert!(engine.is_ended());

        engine.rematch();
        assert_eq!(engine.phase(), MatchPhase::Ready);
        assert_eq!(engine.outcome(), None);
        assert_eq!(engine.time_left(), ROUND_SECONDS);
        assert_eq!(engine.tick(), 0);
        for fighter in &engine.fighters {
            assert_eq!(fighter.health, MAX_HEALTH);
            assert_eq!(fighter.special_meter, 0.0);
            assert_eq!(fighter.state, PlayerState::Idle);
            assert_eq!(fighter.stats.hits_landed, 0);
        }
        assert!(engine.build_snapshot(true).events.is_empty());
        assert!(engine.start());
    }

    #[test]
    fn summary_reports_per_fighter_stats() {
        let mut engine = make_engine(10);
        engine.start();
        face_off(&mut engine, 100.0);
        engine.step(&inputs(&engine, &[Action::Kick], &[]));
        for _ in 0..15 {
            engine.step(&MatchInputs::default());
        }
        let summary = engine.build_summary();
        assert_eq!(summary.fighters[0].stats.hits_landed, 1);
        assert!((summary.fighters[0].stats.damage_dealt - 8.0).abs() < 1e-4);
        assert!((summary.fighters[1].health - 92.0).abs() < 1e-4);
        assert_eq!(summary.duration_ticks, 16);
        assert_eq!(summary.outcome, None);
    }
}

use clap::Parser;
use dojo_duel::constants::{MAX_HEALTH, MAX_METER, ROUND_SECONDS, TICK_RATE};
use dojo_duel::cues::{CueSink, CueTally};
use dojo_duel::engine::{FighterSetup, MatchEngine, MatchInputs, MatchOptions};
use dojo_duel::fighter::FighterConfig;
use dojo_duel::telemetry::{emit_log, now_ms};
use dojo_duel::types::{
    AttackKind, Difficulty, EndReason, MatchEvent, Outcome, PlayerState, Snapshot,
};
use serde::Serialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    single: bool,
    #[arg(long)]
    p1: Option<String>,
    #[arg(long)]
    p2: Option<String>,
    #[arg(long)]
    rounds: Option<u32>,
    #[arg(long)]
    round_seconds: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    match_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct Scenario {
    name: String,
    p1: Difficulty,
    p2: Difficulty,
    rounds: u32,
    #[serde(rename = "roundSeconds")]
    round_seconds: u32,
    seed: u32,
}

#[derive(Clone, Debug, Default, Serialize)]
struct ScenarioResultLine {
    scenario: String,
    seed: u32,
    p1: Option<Difficulty>,
    p2: Option<Difficulty>,
    rounds: u32,
    #[serde(rename = "p1Wins")]
    p1_wins: u32,
    #[serde(rename = "p2Wins")]
    p2_wins: u32,
    draws: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    #[serde(rename = "averageDurationTicks")]
    average_duration_ticks: u64,
    hits: u32,
    blocks: u32,
    specials: u32,
    #[serde(rename = "shortcutSpecials")]
    shortcut_specials: u32,
    #[serde(rename = "maxCombo")]
    max_combo: u32,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct ScenarioRunResult {
    result: ScenarioResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
    total_duration_ticks: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "matchId")]
    match_id: String,
    #[serde(rename = "startedAtMs")]
    started_at_ms: u64,
    #[serde(rename = "finishedAtMs")]
    finished_at_ms: u64,
    #[serde(rename = "scenarioCount")]
    scenario_count: usize,
    #[serde(rename = "roundCount")]
    round_count: u32,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageDurationTicks")]
    average_duration_ticks: u64,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    scenarios: Vec<ScenarioResultLine>,
}

/// Per-fighter bookkeeping for the one-hit-per-swing check.
#[derive(Clone, Copy, Debug, Default)]
struct SwingTracker {
    swing: u64,
    landed_on_swing: Option<u64>,
}

fn main() {
    let cli = Cli::parse();
    let scenarios = resolve_scenarios(&cli);
    let run_started_at_ms = now_ms();
    let seed_hint = scenarios.first().map(|scenario| scenario.seed).unwrap_or(0);
    let match_id = cli
        .match_id
        .clone()
        .unwrap_or_else(|| default_match_id(seed_hint, run_started_at_ms));
    let mut has_anomaly = false;
    let mut total_anomalies = 0usize;
    let mut total_duration_ticks = 0u64;
    let mut total_rounds = 0u32;
    let mut reason_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut scenario_results = Vec::new();

    for scenario in scenarios {
        emit_log(
            "info",
            "scenario_started",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            None,
            json!({
                "p1": scenario.p1,
                "p2": scenario.p2,
                "rounds": scenario.rounds,
                "roundSeconds": scenario.round_seconds,
            }),
        );

        let scenario_run = match run_scenario(&scenario) {
            Ok(run) => run,
            Err(error) => {
                emit_log(
                    "error",
                    "scenario_config_invalid",
                    &match_id,
                    Some(&scenario.name),
                    Some(scenario.seed),
                    None,
                    json!({ "error": error }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &scenario_run.anomaly_records {
            emit_log(
                "warn",
                "anomaly_detected",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                Some(anomaly.tick),
                json!({
                    "message": anomaly.message,
                }),
            );
        }

        if !scenario_run.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += scenario_run.anomaly_records.len();
        total_duration_ticks += scenario_run.total_duration_ticks;
        total_rounds += scenario_run.result.rounds;
        for (reason, count) in &scenario_run.result.reason_counts {
            *reason_counts.entry(reason.clone()).or_insert(0) += count;
        }

        emit_log(
            "info",
            "scenario_finished",
            &match_id,
            Some(&scenario.name),
            Some(scenario.seed),
            Some(scenario_run.finished_tick),
            json!({
                "p1Wins": scenario_run.result.p1_wins,
                "p2Wins": scenario_run.result.p2_wins,
                "draws": scenario_run.result.draws,
                "averageDurationTicks": scenario_run.result.average_duration_ticks,
                "anomalyCount": scenario_run.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&scenario_run.result) {
            Ok(line) => println!("{line}"),
            Err(error) => emit_log(
                "error",
                "result_serialize_failed",
                &match_id,
                Some(&scenario.name),
                Some(scenario.seed),
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        scenario_results.push(scenario_run.result);
    }

    let run_finished_at_ms = now_ms();
    let summary = build_run_summary(
        match_id.clone(),
        run_started_at_ms,
        run_finished_at_ms,
        scenario_results,
        reason_counts,
        total_anomalies,
        total_rounds,
        total_duration_ticks,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            emit_log(
                "error",
                "summary_write_failed",
                &match_id,
                None,
                None,
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": error.to_string(),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    emit_log(
        "info",
        "run_finished",
        &match_id,
        None,
        None,
        None,
        json!({
            "scenarioCount": summary.scenario_count,
            "roundCount": summary.round_count,
            "anomalyCount": summary.anomaly_count,
            "averageDurationTicks": summary.average_duration_ticks,
            "reasonCounts": summary.reason_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

/// Receives the engine's cues for one round. Keeps the current tick's
/// events for the per-tick checks.
#[derive(Debug, Default)]
struct RoundCues {
    tally: CueTally,
    tick_events: Vec<MatchEvent>,
}

impl CueSink for RoundCues {
    fn cue(&mut self, event: &MatchEvent) {
        self.tally.cue(event);
        self.tick_events.push(event.clone());
    }
}

fn run_scenario(scenario: &Scenario) -> Result<ScenarioRunResult, String> {
    let mut engine = MatchEngine::new(MatchOptions {
        p1: FighterSetup::ai(FighterConfig::player_one(), scenario.p1),
        p2: FighterSetup::ai(FighterConfig::player_two(), scenario.p2),
        round_seconds: Some(scenario.round_seconds),
        seed: scenario.seed,
    })
    .map_err(|error| error.to_string())?;

    let mut result = ScenarioResultLine {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        p1: Some(scenario.p1),
        p2: Some(scenario.p2),
        ..ScenarioResultLine::default()
    };
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut total_duration_ticks = 0u64;
    let mut last_tick = 0u64;
    let tick_limit = (scenario.round_seconds as u64 + 10) * TICK_RATE as u64;
    let idle = MatchInputs::default();

    for round in 0..scenario.rounds {
        if round > 0 {
            engine.rematch();
        }
        engine.start();
        let mut swings = [SwingTracker::default(); 2];
        let mut dead_seen = [false; 2];
        let mut cues = RoundCues::default();
        let mut ticks = 0u64;

        while !engine.is_ended() {
            engine.step(&idle);
            ticks += 1;
            if ticks % TICK_RATE as u64 == 0 {
                engine.tick_round_timer();
            }
            let snapshot = engine.build_snapshot(false);
            cues.tick_events.clear();
            engine.dispatch_cues(&mut cues);
            last_tick = snapshot.tick;

            let mut messages = collect_snapshot_anomalies(&snapshot, scenario.round_seconds);
            for (idx, fighter) in snapshot.fighters.iter().enumerate() {
                if dead_seen[idx] && fighter.state != PlayerState::Dead {
                    messages.push(format!("fighter {} left DEAD before rematch", fighter.id));
                }
                dead_seen[idx] |= fighter.state == PlayerState::Dead;
            }
            messages.extend(track_swings(&mut swings, &cues.tick_events));
            tally_events(&mut result, &cues.tick_events);
            for message in messages {
                push_anomaly(
                    &mut result.anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    snapshot.tick,
                    message,
                );
            }

            if ticks > tick_limit {
                push_anomaly(
                    &mut result.anomalies,
                    &mut anomaly_records,
                    &mut anomaly_seen,
                    snapshot.tick,
                    "tick safety limit exceeded".to_string(),
                );
                break;
            }
        }

        for message in round_cue_anomalies(&cues.tally) {
            push_anomaly(
                &mut result.anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                last_tick,
                message,
            );
        }

        let summary = engine.build_summary();
        total_duration_ticks += summary.duration_ticks;
        result.rounds += 1;
        match summary.outcome {
            Some(Outcome::PlayerOneWins) => result.p1_wins += 1,
            Some(Outcome::PlayerTwoWins) => result.p2_wins += 1,
            Some(Outcome::Draw) => result.draws += 1,
            None => {}
        }
        if let Some(reason) = summary.reason {
            *result
                .reason_counts
                .entry(end_reason_key(reason))
                .or_insert(0) += 1;
        }
        for fighter in &summary.fighters {
            result.max_combo = result.max_combo.max(fighter.stats.max_combo);
        }
    }

    result.average_duration_ticks = if result.rounds == 0 {
        0
    } else {
        total_duration_ticks / result.rounds as u64
    };

    Ok(ScenarioRunResult {
        result,
        anomaly_records,
        finished_tick: last_tick,
        total_duration_ticks,
    })
}

fn collect_snapshot_anomalies(snapshot: &Snapshot, round_seconds: u32) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.time_left > round_seconds {
        anomalies.push(format!("time left above round length: {}", snapshot.time_left));
    }
    for fighter in &snapshot.fighters {
        if !fighter.health.is_finite() || !(0.0..=MAX_HEALTH).contains(&fighter.health) {
            anomalies.push(format!(
                "fighter health out of range: {} {}",
                fighter.id, fighter.health
            ));
        }
        if !fighter.special_meter.is_finite()
            || !(0.0..=MAX_METER).contains(&fighter.special_meter)
        {
            anomalies.push(format!(
                "fighter meter out of range: {} {}",
                fighter.id, fighter.special_meter
            ));
        }
        if fighter.is_blocking && fighter.is_attacking {
            anomalies.push(format!("fighter blocking while attacking: {}", fighter.id));
        }
        if fighter.state == PlayerState::Dead && fighter.health > 0.0 {
            anomalies.push(format!("fighter dead with health left: {}", fighter.id));
        }
    }
    anomalies
}

fn round_cue_anomalies(tally: &CueTally) -> Vec<String> {
    let mut anomalies = Vec::new();
    if tally.count("match_started") != 1 {
        anomalies.push(format!(
            "round started {} times",
            tally.count("match_started")
        ));
    }
    if tally.count("match_ended") != 1 {
        anomalies.push(format!("round ended {} times", tally.count("match_ended")));
    }
    if tally.music_playing {
        anomalies.push("music still playing after round end".to_string());
    }
    anomalies
}

fn track_swings(swings: &mut [SwingTracker; 2], events: &[MatchEvent]) -> Vec<String> {
    let mut anomalies = Vec::new();
    for event in events {
        match event {
            MatchEvent::AttackStarted { player, .. } => {
                if let Some(tracker) = swing_slot(swings, *player) {
                    tracker.swing += 1;
                }
            }
            MatchEvent::Hit { attacker, .. } | MatchEvent::Blocked { attacker, .. } => {
                let Some(tracker) = swing_slot(swings, *attacker) else {
                    continue;
                };
                if tracker.landed_on_swing == Some(tracker.swing) {
                    anomalies.push(format!("swing landed twice: fighter {attacker}"));
                }
                tracker.landed_on_swing = Some(tracker.swing);
            }
            _ => {}
        }
    }
    anomalies
}

fn swing_slot(swings: &mut [SwingTracker; 2], player: u8) -> Option<&mut SwingTracker> {
    match player {
        1 => swings.get_mut(0),
        2 => swings.get_mut(1),
        _ => None,
    }
}

fn tally_events(result: &mut ScenarioResultLine, events: &[MatchEvent]) {
    for event in events {
        match event {
            MatchEvent::Hit { .. } => result.hits += 1,
            MatchEvent::Blocked { .. } => result.blocks += 1,
            MatchEvent::AttackStarted {
                kind, shortcut, ..
            } if *kind == AttackKind::Special => {
                result.specials += 1;
                if *shortcut {
                    result.shortcut_specials += 1;
                }
            }
            _ => {}
        }
    }
}

fn resolve_scenarios(cli: &Cli) -> Vec<Scenario> {
    let seed = normalize_seed(cli.seed.unwrap_or_else(|| rand::random::<u32>() as u64));
    let p1 = cli.p1.as_deref().and_then(Difficulty::parse);
    let p2 = cli.p2.as_deref().and_then(Difficulty::parse);
    let round_seconds = cli.round_seconds.unwrap_or(ROUND_SECONDS).clamp(1, 999);

    if cli.single || p1.is_some() || p2.is_some() || cli.rounds.is_some() {
        let p1 = p1.unwrap_or(Difficulty::Medium);
        let p2 = p2.unwrap_or(Difficulty::Medium);
        return vec![Scenario {
            name: format!("custom-{}-vs-{}", difficulty_key(p1), difficulty_key(p2)),
            p1,
            p2,
            rounds: cli.rounds.unwrap_or(1).clamp(1, 100),
            round_seconds,
            seed,
        }];
    }

    vec![
        Scenario {
            name: "mirror-medium".to_string(),
            p1: Difficulty::Medium,
            p2: Difficulty::Medium,
            rounds: 3,
            round_seconds,
            seed,
        },
        Scenario {
            name: "beginner-vs-impossible".to_string(),
            p1: Difficulty::Beginner,
            p2: Difficulty::Impossible,
            rounds: 3,
            round_seconds,
            seed: normalize_seed(seed as u64 + 1),
        },
        Scenario {
            name: "mirror-insane".to_string(),
            p1: Difficulty::Insane,
            p2: Difficulty::Insane,
            rounds: 2,
            round_seconds,
            seed: normalize_seed(seed as u64 + 2),
        },
    ]
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_match_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

#[allow(clippy::too_many_arguments)]
fn build_run_summary(
    match_id: String,
    started_at_ms: u64,
    finished_at_ms: u64,
    scenarios: Vec<ScenarioResultLine>,
    reason_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
    round_count: u32,
    total_duration_ticks: u64,
) -> RunSummary {
    let average_duration_ticks = if round_count == 0 {
        0
    } else {
        total_duration_ticks / round_count as u64
    };
    RunSummary {
        match_id,
        started_at_ms,
        finished_at_ms,
        scenario_count: scenarios.len(),
        round_count,
        anomaly_count,
        average_duration_ticks,
        reason_counts,
        scenarios,
    }
}

fn end_reason_key(reason: EndReason) -> String {
    match reason {
        EndReason::Ko => "ko",
        EndReason::DoubleKo => "double_ko",
        EndReason::TimeUp => "time_up",
    }
    .to_string()
}

fn difficulty_key(difficulty: Difficulty) -> String {
    format!("{difficulty:?}").to_ascii_lowercase()
}

fn write_summary(path: &Path, summary: &RunSummary) -> io::Result<()> {
    let summary_text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, summary_text)
}

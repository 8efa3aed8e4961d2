use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use dojo_duel::clock::FixedStep;
use dojo_duel::constants::{ROUND_SECONDS, TICK_MS};
use dojo_duel::engine::{MatchEngine, MatchInputs, MatchOptions};
use dojo_duel::input::InputSnapshot;
use dojo_duel::server_protocol::{parse_client_message, MatchMode, ParsedClientMessage};
use dojo_duel::telemetry::emit_log;
use dojo_duel::types::{Difficulty, MatchPhase};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

const DEFAULT_READY_TIMEOUT_MS: u64 = 3_000;
const MAX_ROUND_SECONDS: i64 = 999;

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone)]
struct ClientContext {
    tx: mpsc::Sender<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

struct ServerState {
    clients: HashMap<String, ClientContext>,
    game: Option<MatchEngine>,
    match_id: String,
    inputs: MatchInputs,
    clock: FixedStep,
    last_frame_at: Option<Instant>,
    ready_timeout: Duration,
    ready_deadline: Option<Instant>,
    game_over_sent: bool,
}

impl ServerState {
    fn new(ready_timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            game: None,
            match_id: String::new(),
            inputs: MatchInputs::default(),
            clock: FixedStep::default(),
            last_frame_at: None,
            ready_timeout,
            ready_deadline: None,
            game_over_sent: false,
        }
    }
}

#[tokio::main]
async fn main() {
    let port = std::env::var("PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);
    let ready_timeout = parse_ready_timeout(std::env::var("READY_TIMEOUT_MS").ok().as_deref());

    let state = Arc::new(Mutex::new(ServerState::new(ready_timeout)));
    start_tick_loop(state.clone());
    start_round_timer(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found. set STATIC_DIR to serve the presentation bundle.");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(listener) => listener,
        Err(error) => {
            eprintln!("[server] failed to bind {bind_addr}: {error}");
            std::process::exit(2);
        }
    };

    println!("[server] listening on :{port}");
    if let Err(error) = axum::serve(listener, app).await {
        eprintln!("[server] runtime failed: {error}");
        std::process::exit(2);
    }
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("dist/client"), PathBuf::from("public")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

fn parse_ready_timeout(raw: Option<&str>) -> Duration {
    let millis = raw
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_READY_TIMEOUT_MS);
    Duration::from_millis(millis)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "ok": true }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_id("client");
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        guard
            .clients
            .insert(client_id.clone(), ClientContext { tx: tx.clone() });
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(state.clone(), &client_id, raw.to_string()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(state.clone(), &client_id, text).await;
                } else {
                    send_error_to_client(&state, &client_id, "invalid utf8 message").await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    handle_disconnect(state, &client_id).await;
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: SharedState, client_id: &str, raw: String) {
    let Some(message) = parse_client_message(&raw) else {
        send_error_to_client(&state, client_id, "invalid message").await;
        return;
    };

    let mut guard = state.lock().await;
    match message {
        ParsedClientMessage::Start {
            mode,
            difficulty,
            round_seconds,
            seed,
        } => {
            let seed = seed.map(|value| value as u32).unwrap_or_else(rand::random);
            let options = build_match_options(mode, difficulty, round_seconds, seed);
            if let Err(message) = create_match(&mut guard, options, Instant::now()) {
                send_to_client(
                    &mut guard,
                    client_id,
                    &json!({ "type": "error", "message": message }),
                    QueuePolicy::DisconnectOnFull,
                );
            }
        }
        ParsedClientMessage::Ready => {
            let started = guard.game.as_mut().is_some_and(MatchEngine::start);
            if started {
                guard.ready_deadline = None;
                log_match(&guard, "info", "match_started", json!({ "trigger": "ready" }));
            }
        }
        ParsedClientMessage::Input { player, held } => {
            if guard.game.is_none() {
                send_to_client(
                    &mut guard,
                    client_id,
                    &json!({ "type": "error", "message": "no match is running" }),
                    QueuePolicy::DisconnectOnFull,
                );
                return;
            }
            let snapshot: InputSnapshot = held.into_iter().collect();
            if player == 1 {
                guard.inputs.p1 = snapshot;
            } else {
                guard.inputs.p2 = snapshot;
            }
        }
        ParsedClientMessage::Rematch => {
            let now = Instant::now();
            let ready_timeout = guard.ready_timeout;
            let Some(game) = guard.game.as_mut() else {
                send_to_client(
                    &mut guard,
                    client_id,
                    &json!({ "type": "error", "message": "no match to rematch" }),
                    QueuePolicy::DisconnectOnFull,
                );
                return;
            };
            game.rematch();
            guard.inputs = MatchInputs::default();
            guard.clock.reset();
            guard.last_frame_at = Some(now);
            guard.ready_deadline = Some(now + ready_timeout);
            guard.game_over_sent = false;
            log_match(&guard, "info", "rematch_requested", json!({}));
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                &mut guard,
                client_id,
                &json!({
                    "type": "pong",
                    "t": t,
                }),
                QueuePolicy::DisconnectOnFull,
            );
        }
    }
}

fn build_match_options(
    mode: MatchMode,
    difficulty: Option<Difficulty>,
    round_seconds: Option<i64>,
    seed: u32,
) -> MatchOptions {
    let mut options = match mode {
        MatchMode::OnePlayer => {
            MatchOptions::versus_ai(difficulty.unwrap_or(Difficulty::Medium), seed)
        }
        MatchMode::TwoPlayer => MatchOptions::local_versus(seed),
    };
    options.round_seconds = Some(
        round_seconds
            .unwrap_or(ROUND_SECONDS as i64)
            .clamp(1, MAX_ROUND_SECONDS) as u32,
    );
    options
}

fn create_match(state: &mut ServerState, options: MatchOptions, now: Instant) -> Result<(), String> {
    let seed = options.seed;
    let game = MatchEngine::new(options).map_err(|error| error.to_string())?;
    let ai_players: Vec<u8> = [1u8, 2]
        .into_iter()
        .filter(|id| game.is_ai(*id))
        .collect();

    state.match_id = make_id("match");
    state.game = Some(game);
    state.inputs = MatchInputs::default();
    state.clock.reset();
    state.last_frame_at = Some(now);
    state.ready_deadline = Some(now + state.ready_timeout);
    state.game_over_sent = false;
    emit_log(
        "info",
        "match_created",
        &state.match_id,
        None,
        Some(seed),
        None,
        json!({ "aiPlayers": ai_players }),
    );
    Ok(())
}

async fn handle_disconnect(state: SharedState, client_id: &str) {
    let mut guard = state.lock().await;
    disconnect_client_internal(&mut guard, client_id);
}

fn disconnect_client_internal(state: &mut ServerState, client_id: &str) {
    if state.clients.remove(client_id).is_none() {
        return;
    }
    if state.clients.is_empty() && state.game.is_some() {
        log_match(state, "info", "match_abandoned", json!({}));
        state.game = None;
        state.ready_deadline = None;
        state.inputs = MatchInputs::default();
    }
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let now = Instant::now();
            let mut guard = state.lock().await;
            let frame_dt = guard
                .last_frame_at
                .map(|last| now.saturating_duration_since(last))
                .unwrap_or_default();
            guard.last_frame_at = Some(now);
            tick_game(&mut guard, frame_dt, now);
        }
    });
}

fn start_round_timer(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));
        interval.tick().await;
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            if let Some(game) = guard.game.as_mut() {
                game.tick_round_timer();
            }
        }
    });
}

fn tick_game(state: &mut ServerState, frame_dt: Duration, now: Instant) {
    let ready_expired = state
        .ready_deadline
        .is_some_and(|deadline| now >= deadline);
    let Some(game) = state.game.as_mut() else {
        return;
    };
    if ready_expired && game.phase() == MatchPhase::Ready && game.start() {
        state.ready_deadline = None;
        log_match(
            state,
            "warn",
            "match_started",
            json!({ "trigger": "ready_timeout" }),
        );
    }

    let plan = state.clock.plan(frame_dt);
    if !plan.dropped_backlog.is_zero() {
        log_match(
            state,
            "warn",
            "tick_backlog_dropped",
            json!({ "droppedMs": plan.dropped_backlog.as_millis() as u64 }),
        );
    }
    if plan.ticks_to_run == 0 {
        return;
    }

    let (snapshot, summary) = {
        let Some(game) = state.game.as_mut() else {
            return;
        };
        for _ in 0..plan.ticks_to_run {
            game.step(&state.inputs);
        }
        let summary = (game.is_ended() && !state.game_over_sent).then(|| game.build_summary());
        (game.build_snapshot(true), summary)
    };

    broadcast(
        state,
        &json!({
            "type": "state",
            "snapshot": snapshot,
        }),
        QueuePolicy::DropOnFull,
    );

    if let Some(summary) = summary {
        state.game_over_sent = true;
        log_match(
            state,
            "info",
            "match_finished",
            json!({
                "outcome": summary.outcome,
                "reason": summary.reason,
                "durationTicks": summary.duration_ticks,
            }),
        );
        broadcast(
            state,
            &json!({
                "type": "game_over",
                "summary": summary,
            }),
            QueuePolicy::DisconnectOnFull,
        );
    }
}

fn log_match(state: &ServerState, level: &str, event: &str, details: Value) {
    let (seed, tick) = state
        .game
        .as_ref()
        .map(|game| (Some(game.seed), Some(game.tick())))
        .unwrap_or((None, None));
    emit_log(level, event, &state.match_id, None, seed, tick, details);
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client.tx.try_send(message.to_string()).is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client_internal(state, client_id);
    }
}

fn broadcast(state: &mut ServerState, message: &Value, policy: QueuePolicy) {
    let payload = message.to_string();
    let mut failed_clients = Vec::new();
    for (client_id, client) in &state.clients {
        if client.tx.try_send(payload.clone()).is_err()
            && policy == QueuePolicy::DisconnectOnFull
        {
            failed_clients.push(client_id.clone());
        }
    }
    for client_id in failed_clients {
        disconnect_client_internal(state, &client_id);
    }
}

async fn send_error_to_client(state: &SharedState, client_id: &str, message: &str) {
    let mut guard = state.lock().await;
    send_to_client(
        &mut guard,
        client_id,
        &json!({
            "type": "error",
            "message": message,
        }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_id(prefix: &str) -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{seq}")
}

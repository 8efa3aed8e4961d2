use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    #[serde(rename = "timestampIso")]
    pub timestamp_iso: String,
    pub level: String,
    pub event: String,
    #[serde(rename = "matchId")]
    pub match_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

impl StructuredLogLine {
    pub fn new(
        level: &str,
        event: &str,
        match_id: &str,
        scenario: Option<&str>,
        seed: Option<u32>,
        tick: Option<u64>,
        details: Value,
    ) -> Self {
        Self {
            timestamp_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.to_string(),
            event: event.to_string(),
            match_id: match_id.to_string(),
            scenario: scenario.map(|value| value.to_string()),
            seed,
            tick,
            details,
        }
    }
}

pub fn emit_log(
    level: &str,
    event: &str,
    match_id: &str,
    scenario: Option<&str>,
    seed: Option<u32>,
    tick: Option<u64>,
    details: Value,
) {
    let line = StructuredLogLine::new(level, event, match_id, scenario, seed, tick, details);
    match serde_json::to_string(&line) {
        Ok(text) => eprintln!("{text}"),
        Err(error) => eprintln!("[log] failed to serialize {event}: {error}"),
    }
}

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn log_line_uses_camel_case_and_skips_missing_fields() {
        let line = StructuredLogLine::new(
            "info",
            "match_started",
            "sim-1-2",
            None,
            Some(7),
            None,
            json!({ "mode": "1p" }),
        );
        let value = serde_json::to_value(&line).expect("log line serializes");
        assert_eq!(value["matchId"], "sim-1-2");
        assert_eq!(value["seed"], 7);
        assert!(value.get("scenario").is_none());
        assert!(value.get("tick").is_none());
        let iso = value["timestampIso"].as_str().expect("timestamp is a string");
        assert!(iso.ends_with('Z'));
    }
}

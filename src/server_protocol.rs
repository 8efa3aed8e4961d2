use serde_json::Value;

use crate::types::Difficulty;

pub const MAX_HELD_SYMBOLS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchMode {
    OnePlayer,
    TwoPlayer,
}

impl MatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "1p" => Some(Self::OnePlayer),
            "2p" => Some(Self::TwoPlayer),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    Start {
        mode: MatchMode,
        difficulty: Option<Difficulty>,
        round_seconds: Option<i64>,
        seed: Option<i64>,
    },
    Ready,
    Input {
        player: u8,
        held: Vec<String>,
    },
    Rematch,
    Ping {
        t: f64,
    },
}

pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "start" => {
            let mode = match object.get("mode") {
                None => MatchMode::OnePlayer,
                Some(value) => MatchMode::parse(value.as_str()?)?,
            };
            let difficulty = match object.get("difficulty") {
                None => None,
                Some(value) => Some(Difficulty::parse(value.as_str()?)?),
            };
            let round_seconds = parse_optional_i64(object.get("roundSeconds"))?;
            let seed = parse_optional_i64(object.get("seed"))?;
            Some(ParsedClientMessage::Start {
                mode,
                difficulty,
                round_seconds,
                seed,
            })
        }
        "ready" => Some(ParsedClientMessage::Ready),
        "input" => {
            let player = object.get("player")?.as_u64()?;
            if !(1..=2).contains(&player) {
                return None;
            }
            let symbols = object.get("held")?.as_array()?;
            if symbols.len() > MAX_HELD_SYMBOLS {
                return None;
            }
            let held = symbols
                .iter()
                .map(|symbol| symbol.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()?;
            Some(ParsedClientMessage::Input {
                player: player as u8,
                held,
            })
        }
        "rematch" => Some(ParsedClientMessage::Rematch),
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}

fn parse_optional_i64(value: Option<&Value>) -> Option<Option<i64>> {
    const MAX_SAFE_INTEGER_F64: f64 = 9_007_199_254_740_991.0;

    let Some(value) = value else {
        return Some(None);
    };
    if let Some(number) = value.as_i64() {
        return Some(Some(number));
    }
    if let Some(number) = value.as_u64() {
        return i64::try_from(number).ok().map(Some);
    }
    if let Some(number) = value.as_f64() {
        if number.is_finite() {
            let floored = number.floor();
            if floored.abs() > MAX_SAFE_INTEGER_F64 {
                return None;
            }
            return Some(Some(floored as i64));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_start_message() {
        let parsed = parse_client_message(
            r#"{"type":"start","mode":"1p","difficulty":"Hard","roundSeconds":60,"seed":7}"#,
        )
        .expect("start message should parse");
        assert_eq!(
            parsed,
            ParsedClientMessage::Start {
                mode: MatchMode::OnePlayer,
                difficulty: Some(Difficulty::Hard),
                round_seconds: Some(60),
                seed: Some(7),
            }
        );
    }

    #[test]
    fn parse_start_defaults_to_single_player() {
        let parsed = parse_client_message(r#"{"type":"start"}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start {
                mode: MatchMode::OnePlayer,
                difficulty: None,
                ..
            })
        ));
    }

    #[test]
    fn parse_start_rejects_unknown_mode_or_difficulty() {
        assert!(parse_client_message(r#"{"type":"start","mode":"3p"}"#).is_none());
        assert!(parse_client_message(r#"{"type":"start","difficulty":"normal"}"#).is_none());
    }

    #[test]
    fn parse_start_floors_float_values() {
        let parsed = parse_client_message(r#"{"type":"start","mode":"2p","roundSeconds":30.9}"#);
        assert!(matches!(
            parsed,
            Some(ParsedClientMessage::Start {
                mode: MatchMode::TwoPlayer,
                round_seconds: Some(30),
                ..
            })
        ));
        assert!(parse_client_message(r#"{"type":"start","roundSeconds":1e100}"#).is_none());
    }

    #[test]
    fn parse_input_message() {
        let parsed =
            parse_client_message(r#"{"type":"input","player":2,"held":["ArrowLeft","k"]}"#);
        assert_eq!(
            parsed,
            Some(ParsedClientMessage::Input {
                player: 2,
                held: vec!["ArrowLeft".to_string(), "k".to_string()],
            })
        );
    }

    #[test]
    fn parse_input_rejects_bad_player_or_symbols() {
        assert!(parse_client_message(r#"{"type":"input","player":3,"held":[]}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","player":1,"held":[1]}"#).is_none());
        assert!(parse_client_message(r#"{"type":"input","player":1}"#).is_none());

        let many = vec!["\"x\""; MAX_HELD_SYMBOLS + 1].join(",");
        let raw = format!(r#"{{"type":"input","player":1,"held":[{many}]}}"#);
        assert!(parse_client_message(&raw).is_none());
    }

    #[test]
    fn parse_ping_requires_finite_number() {
        let parsed = parse_client_message(r#"{"type":"ping","t":12.5}"#);
        assert_eq!(parsed, Some(ParsedClientMessage::Ping { t: 12.5 }));
        assert!(parse_client_message(r#"{"type":"ping","t":"soon"}"#).is_none());
    }

    #[test]
    fn parse_bare_messages() {
        assert_eq!(
            parse_client_message(r#"{"type":"ready"}"#),
            Some(ParsedClientMessage::Ready)
        );
        assert_eq!(
            parse_client_message(r#"{"type":"rematch"}"#),
            Some(ParsedClientMessage::Rematch)
        );
        assert!(parse_client_message(r#"{"type":"hello"}"#).is_none());
        assert!(parse_client_message("not json").is_none());
    }
}

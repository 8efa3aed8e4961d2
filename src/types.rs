use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayerState {
    Idle,
    Walking,
    Jumping,
    Falling,
    Ducking,
    Punching,
    Kicking,
    Special,
    Blocking,
    Hit,
    Dead,
    Win,
}

impl PlayerState {
    pub fn is_airborne_pose(self) -> bool {
        matches!(self, Self::Jumping | Self::Falling)
    }

    pub fn is_final(self) -> bool {
        matches!(self, Self::Dead | Self::Win)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttackPhase {
    None,
    Startup,
    Active,
    Recovery,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    Punch,
    Kick,
    Special,
}

impl AttackKind {
    pub fn pose(self) -> PlayerState {
        match self {
            Self::Punch => PlayerState::Punching,
            Self::Kick => PlayerState::Kicking,
            Self::Special => PlayerState::Special,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Easy,
    Medium,
    Hard,
    Extreme,
    Insane,
    Impossible,
}

impl Difficulty {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            "extreme" => Some(Self::Extreme),
            "insane" => Some(Self::Insane),
            "impossible" => Some(Self::Impossible),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Inclusive on all four edges: touching rectangles overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x + self.width >= other.x
            && self.x <= other.x + other.width
            && self.y + self.height >= other.y
            && self.y <= other.y + other.height
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Ready,
    Playing,
    GameOver,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    PlayerOneWins,
    PlayerTwoWins,
    Draw,
}

impl Outcome {
    pub fn winner(self) -> Option<u8> {
        match self {
            Self::PlayerOneWins => Some(1),
            Self::PlayerTwoWins => Some(2),
            Self::Draw => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Ko,
    DoubleKo,
    TimeUp,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchEvent {
    MatchStarted,
    AttackStarted {
        player: u8,
        kind: AttackKind,
        shortcut: bool,
    },
    Hit {
        attacker: u8,
        defender: u8,
        kind: AttackKind,
        damage: f32,
        combo: u32,
        x: f32,
        y: f32,
    },
    Blocked {
        attacker: u8,
        defender: u8,
        kind: AttackKind,
        damage: f32,
    },
    Ko {
        player: u8,
    },
    TimeUp,
    MatchEnded {
        outcome: Outcome,
        reason: EndReason,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct FighterView {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub health: f32,
    #[serde(rename = "specialMeter")]
    pub special_meter: f32,
    #[serde(rename = "comboCount")]
    pub combo_count: u32,
    pub state: PlayerState,
    #[serde(rename = "attackPhase")]
    pub attack_phase: AttackPhase,
    #[serde(rename = "attackFrame")]
    pub attack_frame: u32,
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing: Facing,
    pub hurtbox: Rect,
    #[serde(rename = "attackBox")]
    pub attack_box: Rect,
    #[serde(rename = "isAttacking")]
    pub is_attacking: bool,
    #[serde(rename = "isBlocking")]
    pub is_blocking: bool,
    pub invincible: bool,
    #[serde(rename = "impactFlash")]
    pub impact_flash: u32,
    #[serde(rename = "hitStop")]
    pub hit_stop: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "timeLeft")]
    pub time_left: u32,
    pub phase: MatchPhase,
    pub outcome: Option<Outcome>,
    pub fighters: Vec<FighterView>,
    pub events: Vec<MatchEvent>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FighterStats {
    #[serde(rename = "hitsLanded")]
    pub hits_landed: u32,
    #[serde(rename = "hitsBlocked")]
    pub hits_blocked: u32,
    #[serde(rename = "damageDealt")]
    pub damage_dealt: f32,
    #[serde(rename = "maxCombo")]
    pub max_combo: u32,
    #[serde(rename = "specialsUsed")]
    pub specials_used: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct FighterSummary {
    pub id: u8,
    pub name: String,
    pub health: f32,
    pub stats: FighterStats,
}

#[derive(Clone, Debug, Serialize)]
pub struct MatchSummary {
    pub outcome: Option<Outcome>,
    pub reason: Option<EndReason>,
    #[serde(rename = "durationTicks")]
    pub duration_ticks: u64,
    #[serde(rename = "timeLeft")]
    pub time_left: u32,
    pub fighters: Vec<FighterSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn touching_rectangles_overlap() {
        let a = Rect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let b = Rect {
            x: 10.0,
            y: 10.0,
            width: 5.0,
            height: 5.0,
        };
        let c = Rect {
            x: 10.5,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn difficulty_parse_is_case_insensitive() {
        assert_eq!(Difficulty::parse("Hard"), Some(Difficulty::Hard));
        assert_eq!(Difficulty::parse(" insane "), Some(Difficulty::Insane));
        assert_eq!(Difficulty::parse("nightmare"), None);
    }

    #[test]
    fn match_event_serializes_with_type_tag() {
        let value = serde_json::to_value(MatchEvent::Ko { player: 2 }).expect("event serializes");
        assert_eq!(value["type"], "ko");
        assert_eq!(value["player"], 2);
    }
}

use crate::types::{AttackKind, Difficulty};

pub const TICK_RATE: u32 = 60;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const STAGE_WIDTH: f32 = 1024.0;
pub const CANVAS_HEIGHT: f32 = 576.0;
pub const GROUND_OFFSET: f32 = 120.0;
pub const GROUND_LEVEL: f32 = CANVAS_HEIGHT - GROUND_OFFSET;

pub const FIGHTER_WIDTH: f32 = 60.0;
pub const FIGHTER_HEIGHT: f32 = 150.0;
pub const DUCK_HURTBOX_RATIO: f32 = 0.4;
pub const AIR_HURTBOX_RATIO: f32 = 0.7;
pub const ATTACK_BOX_Y_OFFSET: f32 = 30.0;

pub const GRAVITY: f32 = 0.8;
pub const JUMP_FORCE: f32 = -20.0;
pub const MOVE_SPEED: f32 = 7.0;
pub const GROUND_FRICTION: f32 = 0.9;
pub const AIR_FRICTION: f32 = 0.98;
pub const KICK_LUNGE_SPEED: f32 = 10.0;

pub const MAX_HEALTH: f32 = 100.0;
pub const MAX_METER: f32 = 100.0;
pub const METER_REGEN_PER_TICK: f32 = 0.1;
pub const SPECIAL_METER_COST: f32 = 50.0;
pub const SPECIAL_DIRECT_THRESHOLD: f32 = 100.0;
pub const SPECIAL_SHORTCUT_THRESHOLD: f32 = 50.0;

pub const BLOCK_DAMAGE_RATIO: f32 = 0.2;
pub const COMBO_BONUS_PER_HIT: f32 = 2.0;
pub const COMBO_BONUS_CAP: f32 = 10.0;
pub const COMBO_WINDOW_TICKS: u32 = 60;

pub const HIT_TICKS: u32 = 15;
pub const STUN_TICKS: u32 = 30;
pub const INVINCIBILITY_TICKS: u32 = 60;
pub const IMPACT_FLASH_TICKS: u32 = 6;
pub const KNOCKBACK_X: f32 = 15.0;
pub const KNOCKBACK_Y: f32 = -5.0;

pub const INPUT_HISTORY_LEN: usize = 5;
pub const MOTION_WINDOW_MS: u64 = 500;

pub const ROUND_SECONDS: u32 = 99;

pub const P1_SPAWN_X: f32 = 150.0;
pub const P2_SPAWN_X: f32 = 800.0;

pub const AI_APPROACH_DISTANCE: f32 = 80.0;
pub const AI_DEFENSE_DISTANCE: f32 = 200.0;
pub const AI_ATTACK_DISTANCE: f32 = 160.0;
pub const AI_HOP_DISTANCE: f32 = 300.0;
pub const AI_HOP_CHANCE: f32 = 0.015;
pub const AI_PUNCH_SHARE: f32 = 0.6;
pub const AI_MAX_PENDING: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackSpec {
    pub startup: u32,
    pub active: u32,
    pub recovery: u32,
    pub box_width: f32,
    pub box_height: f32,
    pub ground_damage: f32,
    pub air_damage: f32,
    pub hit_stop: u32,
}

impl AttackSpec {
    pub fn total(&self) -> u32 {
        self.startup + self.active + self.recovery
    }

    /// The single attack frame on which a swing may connect.
    pub fn hit_frame(&self) -> u32 {
        self.startup + 1
    }
}

pub fn get_attack_spec(kind: AttackKind) -> AttackSpec {
    match kind {
        AttackKind::Punch => AttackSpec {
            startup: 4,
            active: 4,
            recovery: 4,
            box_width: 120.0,
            box_height: 50.0,
            ground_damage: 5.0,
            air_damage: 7.0,
            hit_stop: 2,
        },
        AttackKind::Kick => AttackSpec {
            startup: 4,
            active: 4,
            recovery: 4,
            box_width: 150.0,
            box_height: 60.0,
            ground_damage: 8.0,
            air_damage: 10.0,
            hit_stop: 3,
        },
        AttackKind::Special => AttackSpec {
            startup: 15,
            active: 10,
            recovery: 15,
            box_width: 200.0,
            box_height: 100.0,
            ground_damage: 40.0,
            air_damage: 40.0,
            hit_stop: 4,
        },
    }
}

/// Tuning knobs for the computer opponent. Probabilities above 1.0 always pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AiProfile {
    pub reaction_time: u32,
    pub attack_frequency: f32,
    pub aggression: f32,
    pub special_usage: f32,
    pub defense_timing: f32,
    pub combo_rate: f32,
}

pub fn get_ai_profile(difficulty: Difficulty) -> AiProfile {
    match difficulty {
        Difficulty::Beginner => AiProfile {
            reaction_time: 15,
            attack_frequency: 0.1,
            aggression: 0.7,
            special_usage: 0.5,
            defense_timing: 0.6,
            combo_rate: 0.5,
        },
        Difficulty::Easy => AiProfile {
            reaction_time: 10,
            attack_frequency: 0.15,
            aggression: 0.85,
            special_usage: 0.6,
            defense_timing: 0.75,
            combo_rate: 0.65,
        },
        Difficulty::Medium => AiProfile {
            reaction_time: 5,
            attack_frequency: 0.2,
            aggression: 1.0,
            special_usage: 0.75,
            defense_timing: 0.85,
            combo_rate: 0.8,
        },
        Difficulty::Hard => AiProfile {
            reaction_time: 2,
            attack_frequency: 0.3,
            aggression: 1.1,
            special_usage: 0.85,
            defense_timing: 0.95,
            combo_rate: 0.9,
        },
        Difficulty::Extreme => AiProfile {
            reaction_time: 1,
            attack_frequency: 0.45,
            aggression: 1.25,
            special_usage: 0.95,
            defense_timing: 1.0,
            combo_rate: 0.95,
        },
        Difficulty::Insane => AiProfile {
            reaction_time: 0,
            attack_frequency: 0.65,
            aggression: 1.4,
            special_usage: 1.0,
            defense_timing: 1.0,
            combo_rate: 1.0,
        },
        Difficulty::Impossible => AiProfile {
            reaction_time: 0,
            attack_frequency: 0.9,
            aggression: 1.6,
            special_usage: 1.0,
            defense_timing: 1.0,
            combo_rate: 1.0,
        },
    }
}

pub fn get_ai_meter_regen(profile: &AiProfile) -> f32 {
    METER_REGEN_PER_TICK * (1.0 + profile.aggression)
}

pub fn ticks_to_ms(ticks: u64) -> u64 {
    ticks * 1000 / TICK_RATE as u64
}

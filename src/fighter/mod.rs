use crate::constants::{
    get_attack_spec, AIR_HURTBOX_RATIO, ATTACK_BOX_Y_OFFSET, BLOCK_DAMAGE_RATIO,
    COMBO_WINDOW_TICKS, DUCK_HURTBOX_RATIO, FIGHTER_HEIGHT, FIGHTER_WIDTH, GROUND_LEVEL,
    HIT_TICKS, IMPACT_FLASH_TICKS, INVINCIBILITY_TICKS, KICK_LUNGE_SPEED, KNOCKBACK_X,
    KNOCKBACK_Y, MAX_HEALTH, MAX_METER, METER_REGEN_PER_TICK, MOTION_WINDOW_MS, P1_SPAWN_X,
    P2_SPAWN_X, SPECIAL_DIRECT_THRESHOLD, SPECIAL_METER_COST, SPECIAL_SHORTCUT_THRESHOLD,
    STUN_TICKS,
};
use crate::error::ConfigError;
use crate::input::{Action, HeldActions, InputHistory, InputSnapshot, KeyMap};
use crate::types::{
    AttackKind, Facing, FighterStats, FighterView, PlayerState, Rect, Vec2,
};

pub mod attack;
pub mod body;
pub mod locomotion;

use self::attack::AttackState;
use self::body::Body;
use self::locomotion::resolve_locomotion;

#[derive(Clone, Debug)]
pub struct FighterConfig {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub spawn_x: f32,
    pub facing: Facing,
    pub keys: KeyMap,
}

impl FighterConfig {
    pub fn player_one() -> Self {
        Self {
            id: 1,
            name: "Blue Bolt".to_string(),
            color: "#3b82f6".to_string(),
            spawn_x: P1_SPAWN_X,
            facing: Facing::Right,
            keys: KeyMap::player_one(),
        }
    }

    pub fn player_two() -> Self {
        Self {
            id: 2,
            name: "Scarlet Strike".to_string(),
            color: "#ef4444".to_string(),
            spawn_x: P2_SPAWN_X,
            facing: Facing::Left,
            keys: KeyMap::player_two(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackStart {
    pub kind: AttackKind,
    pub shortcut: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitResult {
    Ignored,
    Blocked { damage: f32, ko: bool },
    Clean { damage: f32, ko: bool },
}

#[derive(Clone, Debug)]
pub struct Fighter {
    pub id: u8,
    pub name: String,
    pub color: String,
    pub keys: KeyMap,
    pub body: Body,
    pub facing: Facing,
    pub health: f32,
    pub special_meter: f32,
    pub meter_regen: f32,
    pub state: PlayerState,
    pub attack: AttackState,
    pub is_blocking: bool,
    pub attack_box: Rect,

    pub hit_timer: u32,
    pub stun_timer: u32,
    pub invincibility_timer: u32,
    pub combo_timer: u32,
    pub hit_stop: u32,
    pub impact_flash: u32,
    pub combo_count: u32,

    pub stats: FighterStats,

    spawn_x: f32,
    spawn_facing: Facing,
    history: InputHistory,
    prev_held: HeldActions,
}

impl Fighter {
    pub fn new(config: FighterConfig) -> Result<Self, ConfigError> {
        if !(1..=2).contains(&config.id) {
            return Err(ConfigError::InvalidFighterId(config.id));
        }
        config.keys.validate()?;

        let body = Body::new(
            spawn_position(config.spawn_x),
            FIGHTER_WIDTH,
            FIGHTER_HEIGHT,
        );
        let mut fighter = Self {
            id: config.id,
            name: config.name,
            color: config.color,
            keys: config.keys,
            body,
            facing: config.facing,
            health: MAX_HEALTH,
            special_meter: 0.0,
            meter_regen: METER_REGEN_PER_TICK,
            state: PlayerState::Idle,
            attack: AttackState::idle(),
            is_blocking: false,
            attack_box: Rect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
            hit_timer: 0,
            stun_timer: 0,
            invincibility_timer: 0,
            combo_timer: 0,
            hit_stop: 0,
            impact_flash: 0,
            combo_count: 0,
            stats: FighterStats::default(),
            spawn_x: config.spawn_x,
            spawn_facing: config.facing,
            history: InputHistory::default(),
            prev_held: HeldActions::none(),
        };
        fighter.refresh_attack_box();
        Ok(fighter)
    }

    pub fn reset(&mut self) {
        self.body = Body::new(spawn_position(self.spawn_x), FIGHTER_WIDTH, FIGHTER_HEIGHT);
        self.facing = self.spawn_facing;
        self.health = MAX_HEALTH;
        self.special_meter = 0.0;
        self.state = PlayerState::Idle;
        self.attack = AttackState::idle();
        self.is_blocking = false;
        self.hit_timer = 0;
        self.stun_timer = 0;
        self.invincibility_timer = 0;
        self.combo_timer = 0;
        self.hit_stop = 0;
        self.impact_flash = 0;
        self.combo_count = 0;
        self.stats = FighterStats::default();
        self.history.clear();
        self.prev_held = HeldActions::none();
        self.refresh_attack_box();
    }

    pub fn is_attacking(&self) -> bool {
        self.attack.is_attacking()
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility_timer > 0
    }

    pub fn is_dead(&self) -> bool {
        self.state == PlayerState::Dead
    }

    pub fn is_grounded(&self) -> bool {
        self.body.is_grounded()
    }

    pub fn position(&self) -> Vec2 {
        self.body.position
    }

    pub fn hurtbox(&self) -> Rect {
        let full = self.body.bounds();
        if self.state == PlayerState::Ducking {
            let height = full.height * DUCK_HURTBOX_RATIO;
            return Rect {
                y: full.y + full.height - height,
                height,
                ..full
            };
        }
        if self.state.is_airborne_pose() {
            return Rect {
                height: full.height * AIR_HURTBOX_RATIO,
                ..full
            };
        }
        full
    }

    /// One simulation tick. Skipped entirely (apart from the countdown)
    /// while hit-stop is active. Meter and combo window only run while
    /// `playing`.
    pub fn update(
        &mut self,
        input: &InputSnapshot,
        opponent_x: f32,
        now_ms: u64,
        playing: bool,
    ) -> Option<AttackStart> {
        if self.hit_stop > 0 {
            self.hit_stop -= 1;
            return None;
        }

        let held = self.keys.resolve(input);
        let pressed = held.newly_pressed(self.prev_held);
        self.prev_held = held;

        if self.stun_timer > 0 {
            self.stun_timer -= 1;
            if self.stun_timer == 0 && self.state == PlayerState::Hit {
                self.state = PlayerState::Idle;
            }
        }
        self.invincibility_timer = self.invincibility_timer.saturating_sub(1);

        let mut request = None;
        if self.state.is_final() {
            self.is_blocking = false;
        } else if self.hit_timer > 0 {
            self.hit_timer -= 1;
            self.state = PlayerState::Hit;
        } else if self.stun_timer == 0 {
            for action in pressed.iter() {
                self.history.record(action, now_ms);
            }
            request = self.handle_input(held, pressed, now_ms);
        }

        let started = self.advance_attack(request);
        self.apply_physics();

        if !self.is_attacking() && self.state != PlayerState::Dead {
            self.facing = if self.body.position.x < opponent_x {
                Facing::Right
            } else {
                Facing::Left
            };
        }

        if playing && self.state != PlayerState::Dead {
            self.special_meter = (self.special_meter + self.meter_regen).min(MAX_METER);
        }
        if playing && self.combo_timer > 0 {
            self.combo_timer -= 1;
            if self.combo_timer == 0 {
                self.combo_count = 0;
            }
        }
        self.impact_flash = self.impact_flash.saturating_sub(1);
        self.refresh_attack_box();
        started
    }

    fn handle_input(
        &mut self,
        held: HeldActions,
        pressed: HeldActions,
        now_ms: u64,
    ) -> Option<AttackStart> {
        if !self.is_attacking() {
            let choice = resolve_locomotion(held, self.body.is_grounded());
            if let Some(pose) = choice.pose() {
                self.state = pose;
            }
            let (vx, vy) = choice.velocity();
            if let Some(vx) = vx {
                self.body.velocity.x = vx;
            }
            if let Some(vy) = vy {
                self.body.velocity.y = vy;
            }
            self.is_blocking = self.state == PlayerState::Blocking;
        }

        let motion = [Action::Down, Action::toward(self.facing), Action::Punch];
        if pressed.contains(Action::Punch)
            && self.special_meter >= SPECIAL_SHORTCUT_THRESHOLD
            && self
                .history
                .ends_with_motion(&motion, MOTION_WINDOW_MS, now_ms)
        {
            return Some(AttackStart {
                kind: AttackKind::Special,
                shortcut: true,
            });
        }

        let direct_special =
            held.contains(Action::Special) && self.special_meter >= SPECIAL_DIRECT_THRESHOLD;
        let kind = if self.is_attacking() {
            direct_special.then_some(AttackKind::Special)?
        } else if held.contains(Action::Punch) {
            AttackKind::Punch
        } else if held.contains(Action::Kick) {
            AttackKind::Kick
        } else if direct_special {
            AttackKind::Special
        } else {
            return None;
        };
        Some(AttackStart {
            kind,
            shortcut: false,
        })
    }

    fn advance_attack(&mut self, request: Option<AttackStart>) -> Option<AttackStart> {
        let step = attack::step(self.attack, request.map(|r| r.kind));
        self.attack = step.state;

        let mut started = None;
        if let Some(kind) = step.started {
            self.is_blocking = false;
            if !self.state.is_final() {
                self.state = kind.pose();
            }
            if kind == AttackKind::Special {
                self.special_meter = (self.special_meter - SPECIAL_METER_COST).max(0.0);
                self.stats.specials_used += 1;
            }
            started = Some(AttackStart {
                kind,
                shortcut: request.is_some_and(|r| r.shortcut),
            });
        }
        if step.lunge {
            self.body.velocity.x += self.facing.sign() * KICK_LUNGE_SPEED;
        }
        if step.finished && !self.state.is_final() && self.state != PlayerState::Hit {
            self.state = PlayerState::Idle;
        }
        started
    }

    fn apply_physics(&mut self) {
        let contact = self.body.integrate(self.state == PlayerState::Walking);
        if contact.grounded {
            if self.state.is_airborne_pose() {
                self.state = PlayerState::Idle;
            }
        } else if contact.falling
            && !self.is_attacking()
            && !matches!(
                self.state,
                PlayerState::Hit | PlayerState::Dead | PlayerState::Win
            )
        {
            self.state = PlayerState::Falling;
        }
    }

    fn refresh_attack_box(&mut self) {
        let spec = get_attack_spec(self.attack.kind.unwrap_or(AttackKind::Punch));
        let x = match self.facing {
            Facing::Right => self.body.position.x + self.body.width,
            Facing::Left => self.body.position.x - spec.box_width,
        };
        self.attack_box = Rect {
            x,
            y: self.body.position.y + ATTACK_BOX_Y_OFFSET,
            width: spec.box_width,
            height: spec.box_height,
        };
    }

    pub fn register_hit(&mut self) {
        self.combo_count += 1;
        self.combo_timer = COMBO_WINDOW_TICKS;
        self.stats.max_combo = self.stats.max_combo.max(self.combo_count);
    }

    pub fn take_hit(&mut self, damage: f32, attacker_x: f32, hit_stop: u32) -> HitResult {
        if self.is_invincible() {
            return HitResult::Ignored;
        }

        if self.is_blocking {
            let applied = damage * BLOCK_DAMAGE_RATIO;
            self.health = (self.health - applied).clamp(0.0, MAX_HEALTH);
            let ko = self.health <= 0.0;
            if ko {
                self.knock_out();
            }
            return HitResult::Blocked { damage: applied, ko };
        }

        self.health = (self.health - damage).clamp(0.0, MAX_HEALTH);
        self.attack = AttackState::idle();
        self.is_blocking = false;
        self.hit_timer = HIT_TICKS;
        self.stun_timer = STUN_TICKS;
        self.invincibility_timer = INVINCIBILITY_TICKS;
        self.impact_flash = IMPACT_FLASH_TICKS;
        self.hit_stop = hit_stop;
        self.state = PlayerState::Hit;

        let direction = if self.body.position.x < attacker_x {
            -1.0
        } else {
            1.0
        };
        self.body.velocity.x = direction * KNOCKBACK_X;
        self.body.velocity.y = KNOCKBACK_Y;

        let ko = self.health <= 0.0;
        if ko {
            self.knock_out();
        }
        HitResult::Clean { damage, ko }
    }

    fn knock_out(&mut self) {
        self.state = PlayerState::Dead;
        self.attack = AttackState::idle();
        self.is_blocking = false;
        self.hit_timer = 0;
        self.stun_timer = 0;
    }

    pub fn declare_winner(&mut self) {
        self.state = PlayerState::Win;
        self.is_blocking = false;
    }

    pub fn view(&self) -> FighterView {
        FighterView {
            id: self.id,
            name: self.name.clone(),
            color: self.color.clone(),
            health: self.health,
            special_meter: self.special_meter,
            combo_count: self.combo_count,
            state: self.state,
            attack_phase: self.attack.phase,
            attack_frame: self.attack.frame,
            position: self.body.position,
            velocity: self.body.velocity,
            facing: self.facing,
            hurtbox: self.hurtbox(),
            attack_box: self.attack_box,
            is_attacking: self.is_attacking(),
            is_blocking: self.is_blocking,
            invincible: self.is_invincible(),
            impact_flash: self.impact_flash,
            hit_stop: self.hit_stop,
        }
    }
}

fn spawn_position(x: f32) -> Vec2 {
    Vec2::new(x, GROUND_LEVEL - FIGHTER_HEIGHT)
}

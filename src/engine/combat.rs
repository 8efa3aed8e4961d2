use crate::constants::{get_attack_spec, COMBO_BONUS_CAP, COMBO_BONUS_PER_HIT};
use crate::fighter::{Fighter, HitResult};
use crate::types::{AttackKind, MatchEvent};

#[derive(Clone, Debug, PartialEq)]
pub struct StrikeReport {
    pub event: MatchEvent,
    pub defender_ko: bool,
}

pub fn combo_bonus(combo_count: u32) -> f32 {
    if combo_count > 1 {
        (combo_count as f32 * COMBO_BONUS_PER_HIT).min(COMBO_BONUS_CAP)
    } else {
        0.0
    }
}

pub fn compute_damage(kind: AttackKind, combo_count: u32, defender_airborne: bool) -> f32 {
    let spec = get_attack_spec(kind);
    let base = if defender_airborne {
        spec.air_damage
    } else {
        spec.ground_damage
    };
    base + combo_bonus(combo_count)
}

/// The attack kind that would land on `defender` this tick, if any.
pub fn detect_strike(attacker: &Fighter, defender: &Fighter) -> Option<AttackKind> {
    if defender.is_dead() || !attacker.attack.can_hit() {
        return None;
    }
    if !attacker.attack_box.overlaps(&defender.hurtbox()) {
        return None;
    }
    attacker.attack.kind
}

/// Apply a strike found by [`detect_strike`]. An invincible defender turns it
/// into a complete no-op for both sides.
pub fn apply_strike(
    attacker: &mut Fighter,
    defender: &mut Fighter,
    kind: AttackKind,
) -> Option<StrikeReport> {
    if defender.is_invincible() {
        return None;
    }

    let spec = get_attack_spec(kind);
    attacker.register_hit();
    attacker.attack.connected = true;
    let damage = compute_damage(kind, attacker.combo_count, !defender.is_grounded());

    match defender.take_hit(damage, attacker.position().x, spec.hit_stop) {
        HitResult::Ignored => None,
        HitResult::Blocked { damage, ko } => {
            attacker.stats.damage_dealt += damage;
            defender.stats.hits_blocked += 1;
            Some(StrikeReport {
                event: MatchEvent::Blocked {
                    attacker: attacker.id,
                    defender: defender.id,
                    kind,
                    damage,
                },
                defender_ko: ko,
            })
        }
        HitResult::Clean { damage, ko } => {
            attacker.hit_stop = spec.hit_stop;
            attacker.stats.hits_landed += 1;
            attacker.stats.damage_dealt += damage;
            let center = defender.hurtbox();
            Some(StrikeReport {
                event: MatchEvent::Hit {
                    attacker: attacker.id,
                    defender: defender.id,
                    kind,
                    damage,
                    combo: attacker.combo_count,
                    x: center.x + center.width / 2.0,
                    y: center.y + center.height / 2.0,
                },
                defender_ko: ko,
            })
        }
    }
}

/// Both hit tests run before either strike is applied, so trades happen.
pub fn resolve_exchange(first: &mut Fighter, second: &mut Fighter) -> Vec<StrikeReport> {
    let first_strike = detect_strike(first, second);
    let second_strike = detect_strike(second, first);

    let mut reports = Vec::new();
    if let Some(kind) = first_strike {
        reports.extend(apply_strike(first, second, kind));
    }
    if let Some(kind) = second_strike {
        reports.extend(apply_strike(second, first, kind));
    }
    reports
}

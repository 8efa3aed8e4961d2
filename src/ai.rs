use crate::constants::{
    get_ai_profile, AiProfile, AI_APPROACH_DISTANCE, AI_ATTACK_DISTANCE, AI_DEFENSE_DISTANCE,
    AI_HOP_CHANCE, AI_HOP_DISTANCE, AI_MAX_PENDING, AI_PUNCH_SHARE, SPECIAL_DIRECT_THRESHOLD,
};
use crate::fighter::Fighter;
use crate::input::{Action, HeldActions, InputSnapshot};
use crate::rng::Rng;
use crate::types::Difficulty;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PendingAction {
    action: Action,
    delay: u32,
}

/// Computer opponent. Decisions go through a delay buffer so lower tiers
/// react late; a released action is held for exactly one tick.
#[derive(Clone, Debug)]
pub struct AiController {
    profile: AiProfile,
    pending: Vec<PendingAction>,
}

impl AiController {
    pub fn new(difficulty: Difficulty) -> Self {
        Self {
            profile: get_ai_profile(difficulty),
            pending: Vec::new(),
        }
    }

    pub fn with_profile(profile: AiProfile) -> Self {
        Self {
            profile,
            pending: Vec::new(),
        }
    }

    pub fn profile(&self) -> &AiProfile {
        &self.profile
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn tick(&mut self, me: &Fighter, opponent: &Fighter, rng: &mut Rng) -> InputSnapshot {
        for action in self.decide(me, opponent, rng) {
            self.queue(action);
        }
        me.keys.encode(self.release())
    }

    pub fn queue(&mut self, action: Action) {
        if self.pending.len() >= AI_MAX_PENDING {
            self.pending.remove(0);
        }
        self.pending.push(PendingAction {
            action,
            delay: self.profile.reaction_time,
        });
    }

    /// Pops every action whose delay has run out and ages the rest.
    pub fn release(&mut self) -> HeldActions {
        let mut held = HeldActions::none();
        self.pending.retain_mut(|pending| {
            if pending.delay == 0 {
                held.insert(pending.action);
                false
            } else {
                pending.delay -= 1;
                true
            }
        });
        held
    }

    fn decide(&self, me: &Fighter, opponent: &Fighter, rng: &mut Rng) -> Vec<Action> {
        let mut actions = Vec::new();
        let dx = opponent.position().x - me.position().x;
        let distance = dx.abs();

        if distance > AI_APPROACH_DISTANCE && rng.chance(self.profile.aggression) {
            actions.push(if dx > 0.0 { Action::Right } else { Action::Left });
        }

        if opponent.is_attacking()
            && distance < AI_DEFENSE_DISTANCE
            && rng.chance(self.profile.defense_timing)
        {
            actions.push(Action::Block);
        }

        if distance < AI_ATTACK_DISTANCE && !me.is_attacking() {
            if opponent.stun_timer > 0 && me.combo_count > 0 && rng.chance(self.profile.combo_rate)
            {
                actions.push(Action::Punch);
            } else if rng.chance(self.profile.attack_frequency) {
                if me.special_meter >= SPECIAL_DIRECT_THRESHOLD
                    && rng.chance(self.profile.special_usage)
                {
                    actions.push(Action::Special);
                } else if rng.chance(AI_PUNCH_SHARE) {
                    actions.push(Action::Punch);
                } else {
                    actions.push(Action::Kick);
                }
            }
        }

        if distance < AI_HOP_DISTANCE && rng.chance(AI_HOP_CHANCE) {
            actions.push(Action::Up);
        }
        actions
    }
}

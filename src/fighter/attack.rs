use crate::constants::{get_attack_spec, AttackSpec};
use crate::types::{AttackKind, AttackPhase};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackState {
    pub kind: Option<AttackKind>,
    pub phase: AttackPhase,
    pub frame: u32,
    /// Set once this swing has landed; a swing never lands twice.
    pub connected: bool,
}

impl Default for AttackState {
    fn default() -> Self {
        Self::idle()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttackStep {
    pub state: AttackState,
    pub started: Option<AttackKind>,
    pub lunge: bool,
    pub finished: bool,
}

impl AttackState {
    pub fn idle() -> Self {
        Self {
            kind: None,
            phase: AttackPhase::None,
            frame: 0,
            connected: false,
        }
    }

    fn begin(kind: AttackKind) -> Self {
        Self {
            kind: Some(kind),
            phase: AttackPhase::Startup,
            frame: 0,
            connected: false,
        }
    }

    pub fn is_attacking(&self) -> bool {
        self.kind.is_some()
    }

    pub fn spec(&self) -> Option<AttackSpec> {
        self.kind.map(get_attack_spec)
    }

    /// A punch in its active window may be canceled into a special.
    pub fn in_cancel_window(&self) -> bool {
        self.kind == Some(AttackKind::Punch) && self.phase == AttackPhase::Active
    }

    pub fn accepts(&self, kind: AttackKind) -> bool {
        !self.is_attacking() || (kind == AttackKind::Special && self.in_cancel_window())
    }

    /// True only on the designated hit frame of an unlanded swing.
    pub fn can_hit(&self) -> bool {
        if self.connected || self.phase != AttackPhase::Active {
            return false;
        }
        self.spec().is_some_and(|spec| self.frame == spec.hit_frame())
    }
}

pub fn phase_for_frame(spec: &AttackSpec, frame: u32) -> AttackPhase {
    if frame <= spec.startup {
        AttackPhase::Startup
    } else if frame <= spec.startup + spec.active {
        AttackPhase::Active
    } else if frame <= spec.total() {
        AttackPhase::Recovery
    } else {
        AttackPhase::None
    }
}

/// One tick of the attack machine: accept `request` if allowed, then advance
/// the frame counter and derive the phase from it.
pub fn step(current: AttackState, request: Option<AttackKind>) -> AttackStep {
    let mut state = current;
    let mut started = None;
    if let Some(kind) = request {
        if state.accepts(kind) {
            state = AttackState::begin(kind);
            started = Some(kind);
        }
    }

    let Some(spec) = state.spec() else {
        return AttackStep {
            state,
            started,
            lunge: false,
            finished: false,
        };
    };

    state.frame += 1;
    state.phase = phase_for_frame(&spec, state.frame);
    if state.phase == AttackPhase::None {
        return AttackStep {
            state: AttackState::idle(),
            started,
            lunge: false,
            finished: true,
        };
    }

    AttackStep {
        state,
        started,
        lunge: state.kind == Some(AttackKind::Kick) && state.frame == spec.hit_frame(),
        finished: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: AttackKind) -> Vec<AttackStep> {
        let mut steps = vec![step(AttackState::idle(), Some(kind))];
        while steps.last().is_some_and(|s| !s.finished) {
            let current = steps.last().map(|s| s.state).unwrap_or_default();
            steps.push(step(current, None));
            assert!(steps.len() < 100);
        }
        steps
    }

    #[test]
    fn kick_walks_startup_active_recovery_then_ends() {
        let steps = run(AttackKind::Kick);
        let phases: Vec<AttackPhase> = steps.iter().map(|s| s.state.phase).collect();
        assert_eq!(&phases[0..4], &[AttackPhase::Startup; 4]);
        assert_eq!(&phases[4..8], &[AttackPhase::Active; 4]);
        assert_eq!(&phases[8..12], &[AttackPhase::Recovery; 4]);
        assert_eq!(phases[12], AttackPhase::None);
        assert!(steps[12].finished);
        assert_eq!(steps.len(), 13);
    }

    #[test]
    fn only_one_frame_can_hit() {
        let steps = run(AttackKind::Kick);
        let hit_frames: Vec<u32> = steps
            .iter()
            .filter(|s| s.state.can_hit())
            .map(|s| s.state.frame)
            .collect();
        assert_eq!(hit_frames, vec![5]);
    }

    #[test]
    fn connected_swing_cannot_hit_again() {
        let steps = run(AttackKind::Punch);
        let mut at_hit = steps
            .iter()
            .map(|s| s.state)
            .find(|s| s.can_hit())
            .expect("punch has a hit frame");
        at_hit.connected = true;
        assert!(!at_hit.can_hit());
    }

    #[test]
    fn kick_lunges_on_first_active_frame_only() {
        let steps = run(AttackKind::Kick);
        let lunges: Vec<u32> = steps
            .iter()
            .filter(|s| s.lunge)
            .map(|s| s.state.frame)
            .collect();
        assert_eq!(lunges, vec![5]);
        assert!(run(AttackKind::Punch).iter().all(|s| !s.lunge));
    }

    #[test]
    fn attacking_rejects_new_requests_outside_cancel_window() {
        let first = step(AttackState::idle(), Some(AttackKind::Punch));
        let second = step(first.state, Some(AttackKind::Kick));
        assert_eq!(second.started, None);
        assert_eq!(second.state.kind, Some(AttackKind::Punch));
        assert_eq!(second.state.frame, 2);
    }

    #[test]
    fn active_punch_cancels_into_special() {
        let mut state = step(AttackState::idle(), Some(AttackKind::Punch)).state;
        while state.phase != AttackPhase::Active {
            let early = step(state, Some(AttackKind::Special));
            if state.phase == AttackPhase::Startup {
                assert_eq!(early.started, None);
            }
            state = step(state, None).state;
        }
        let canceled = step(state, Some(AttackKind::Special));
        assert_eq!(canceled.started, Some(AttackKind::Special));
        assert_eq!(canceled.state.kind, Some(AttackKind::Special));
        assert_eq!(canceled.state.frame, 1);
        assert_eq!(canceled.state.phase, AttackPhase::Startup);
    }

    #[test]
    fn special_runs_forty_frames() {
        let steps = run(AttackKind::Special);
        assert_eq!(steps.len(), 41);
    }
}

use crate::constants::{JUMP_FORCE, MOVE_SPEED};
use crate::input::{Action, HeldActions};
use crate::types::PlayerState;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Locomotion {
    Block,
    Jump,
    Duck,
    Walk { velocity_x: f32, grounded: bool },
    Idle,
    /// Airborne with no directional input: keep current momentum and pose.
    Drift,
}

impl Locomotion {
    pub fn pose(self) -> Option<PlayerState> {
        match self {
            Self::Block => Some(PlayerState::Blocking),
            Self::Jump => Some(PlayerState::Jumping),
            Self::Duck => Some(PlayerState::Ducking),
            Self::Walk { grounded: true, .. } => Some(PlayerState::Walking),
            Self::Walk { grounded: false, .. } | Self::Drift => None,
            Self::Idle => Some(PlayerState::Idle),
        }
    }

    /// New (vx, vy); `None` leaves that component untouched.
    pub fn velocity(self) -> (Option<f32>, Option<f32>) {
        match self {
            Self::Block | Self::Duck | Self::Idle => (Some(0.0), None),
            Self::Jump => (None, Some(JUMP_FORCE)),
            Self::Walk { velocity_x, .. } => (Some(velocity_x), None),
            Self::Drift => (None, None),
        }
    }
}

/// Block > jump > duck > walk > idle. Block, jump, duck and idle need ground contact.
pub fn resolve_locomotion(held: HeldActions, grounded: bool) -> Locomotion {
    if grounded && held.contains(Action::Block) {
        return Locomotion::Block;
    }
    if grounded && held.contains(Action::Up) {
        return Locomotion::Jump;
    }
    if grounded && held.contains(Action::Down) {
        return Locomotion::Duck;
    }
    if held.contains(Action::Left) {
        return Locomotion::Walk {
            velocity_x: -MOVE_SPEED,
            grounded,
        };
    }
    if held.contains(Action::Right) {
        return Locomotion::Walk {
            velocity_x: MOVE_SPEED,
            grounded,
        };
    }
    if grounded {
        Locomotion::Idle
    } else {
        Locomotion::Drift
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_beats_everything_on_the_ground() {
        let held = HeldActions::of(&[Action::Block, Action::Up, Action::Down, Action::Left]);
        assert_eq!(resolve_locomotion(held, true), Locomotion::Block);
    }

    #[test]
    fn jump_beats_duck() {
        let held = HeldActions::of(&[Action::Up, Action::Down]);
        assert_eq!(resolve_locomotion(held, true), Locomotion::Jump);
    }

    #[test]
    fn airborne_ignores_block_jump_and_duck() {
        let held = HeldActions::of(&[Action::Block, Action::Up, Action::Down]);
        assert_eq!(resolve_locomotion(held, false), Locomotion::Drift);
    }

    #[test]
    fn air_steering_keeps_pose() {
        let held = HeldActions::of(&[Action::Right]);
        let choice = resolve_locomotion(held, false);
        assert_eq!(choice.pose(), None);
        assert_eq!(choice.velocity(), (Some(MOVE_SPEED), None));
    }

    #[test]
    fn left_wins_over_right() {
        let held = HeldActions::of(&[Action::Left, Action::Right]);
        assert_eq!(
            resolve_locomotion(held, true),
            Locomotion::Walk {
                velocity_x: -MOVE_SPEED,
                grounded: true
            }
        );
    }

    #[test]
    fn no_input_on_ground_is_idle() {
        let choice = resolve_locomotion(HeldActions::none(), true);
        assert_eq!(choice, Locomotion::Idle);
        assert_eq!(choice.pose(), Some(PlayerState::Idle));
        assert_eq!(choice.velocity(), (Some(0.0), None));
    }
}

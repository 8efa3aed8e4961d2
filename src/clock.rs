use std::time::Duration;

use crate::constants::TICK_RATE;

pub const DEFAULT_MAX_TICKS_PER_FRAME: u32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepPlan {
    pub ticks_to_run: u32,
    pub dropped_backlog: Duration,
}

/// Fixed-timestep accumulator: wall-clock frame deltas in, whole simulation
/// ticks out. Backlog beyond `max_ticks` per frame is dropped, not replayed.
#[derive(Clone, Debug)]
pub struct FixedStep {
    accumulator: Duration,
    fixed_dt: Duration,
    max_ticks: u32,
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(1) / TICK_RATE,
            DEFAULT_MAX_TICKS_PER_FRAME,
        )
    }
}

impl FixedStep {
    pub fn new(fixed_dt: Duration, max_ticks: u32) -> Self {
        let fixed_dt = if fixed_dt.is_zero() {
            Duration::from_secs(1) / TICK_RATE
        } else {
            fixed_dt
        };
        Self {
            accumulator: Duration::ZERO,
            fixed_dt,
            max_ticks: max_ticks.max(1),
        }
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn pending(&self) -> Duration {
        self.accumulator
    }

    pub fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    pub fn plan(&mut self, frame_dt: Duration) -> StepPlan {
        self.accumulator = self.accumulator.saturating_add(frame_dt);
        let mut ticks_to_run = 0u32;
        while self.accumulator >= self.fixed_dt && ticks_to_run < self.max_ticks {
            self.accumulator -= self.fixed_dt;
            ticks_to_run += 1;
        }

        let mut dropped_backlog = Duration::ZERO;
        if self.accumulator >= self.fixed_dt {
            dropped_backlog = self.accumulator;
            self.accumulator = Duration::ZERO;
        }
        StepPlan {
            ticks_to_run,
            dropped_backlog,
        }
    }
}

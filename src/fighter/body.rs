use crate::constants::{AIR_FRICTION, GRAVITY, GROUND_FRICTION, GROUND_LEVEL, STAGE_WIDTH};
use crate::types::{Rect, Vec2};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contact {
    pub grounded: bool,
    pub falling: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub position: Vec2,
    pub velocity: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Body {
    pub fn new(position: Vec2, width: f32, height: f32) -> Self {
        Self {
            position,
            velocity: Vec2::default(),
            width,
            height,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.position.y + self.height >= GROUND_LEVEL
    }

    pub fn bounds(&self) -> Rect {
        Rect {
            x: self.position.x,
            y: self.position.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Advance one tick. `walking` suppresses ground friction.
    pub fn integrate(&mut self, walking: bool) -> Contact {
        self.position.x += self.velocity.x;
        self.position.x = self.position.x.clamp(0.0, STAGE_WIDTH - self.width);

        self.position.y += self.velocity.y;

        if self.is_grounded() {
            if !walking {
                self.velocity.x *= GROUND_FRICTION;
            }
        } else {
            self.velocity.x *= AIR_FRICTION;
        }

        if self.position.y + self.height + self.velocity.y >= GROUND_LEVEL {
            self.velocity.y = 0.0;
            self.position.y = GROUND_LEVEL - self.height;
            Contact {
                grounded: true,
                falling: false,
            }
        } else {
            self.velocity.y += GRAVITY;
            Contact {
                grounded: false,
                falling: self.velocity.y > 0.0,
            }
        }
    }
}

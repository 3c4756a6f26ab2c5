use std::time::Duration;

use crate::error::ValidationError;
use crate::plan::{ButtonMode, ClickPlan, TargetMode, COORD_LIMIT};

/// Raw values handed in by whatever front end drives the clicker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub interval_ms: u64,
    pub button: ButtonMode,
    pub count: u64,
    /// Ignore `count` and run until stopped.
    pub continuous: bool,
    pub countdown: bool,
    pub target: TargetMode,
    pub fixed_x: i32,
    pub fixed_y: i32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            button: ButtonMode::Left,
            count: 100,
            continuous: false,
            countdown: true,
            target: TargetMode::Follow,
            fixed_x: 0,
            fixed_y: 0,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<ClickPlan, ValidationError> {
        if self.target == TargetMode::Fixed
            && (self.fixed_x.abs() > COORD_LIMIT || self.fixed_y.abs() > COORD_LIMIT)
        {
            return Err(ValidationError::CoordinateOutOfRange {
                x: self.fixed_x,
                y: self.fixed_y,
                limit: COORD_LIMIT,
            });
        }
        let total = if self.continuous { None } else { Some(self.count) };
        ClickPlan::new(Duration::from_millis(self.interval_ms), self.button, total, self.countdown)
    }
}

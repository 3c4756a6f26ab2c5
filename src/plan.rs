use std::fmt;
use std::time::Duration;

use crate::error::ValidationError;

pub const MIN_INTERVAL: Duration = Duration::from_millis(1);
/// Ten minutes, the widest interval the settings form accepts.
pub const MAX_INTERVAL: Duration = Duration::from_millis(600_000);
pub const MAX_CLICKS: u64 = 1_000_000;
/// Screen coordinates may be negative on multi-monitor setups.
pub const COORD_LIMIT: i32 = 20_000;

/// Quick interval choices offered to the user, fastest first.
pub const INTERVAL_PRESETS: &[(&str, u64)] = &[
    ("1 ms", 1),
    ("5 ms", 5),
    ("10 ms", 10),
    ("50 ms", 50),
    ("100 ms", 100),
    ("250 ms", 250),
    ("500 ms", 500),
    ("1 s", 1_000),
    ("2 s", 2_000),
    ("5 s", 5_000),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ButtonMode {
    #[default]
    Left,
    Right,
    /// Left double click; one action may produce two physical clicks.
    #[value(name = "double")]
    DoubleLeft,
}

impl fmt::Display for ButtonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ButtonMode::Left => "Left",
            ButtonMode::Right => "Right",
            ButtonMode::DoubleLeft => "Double (left)",
        })
    }
}

/// A physical mouse button as the driver sees it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickButton { Left, Right }

impl ButtonMode {
    pub fn button(self) -> ClickButton {
        match self {
            ButtonMode::Left | ButtonMode::DoubleLeft => ClickButton::Left,
            ButtonMode::Right => ClickButton::Right,
        }
    }

    /// Physical clicks for one action given the remaining quota
    /// (`None` when the run is unbounded).
    pub fn clicks_for(self, remaining: Option<u64>) -> u32 {
        match self {
            ButtonMode::Left | ButtonMode::Right => 1,
            ButtonMode::DoubleLeft => match remaining {
                Some(r) if r < 2 => 1,
                _ => 2,
            },
        }
    }
}

/// How the user wants the click location chosen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TargetMode {
    #[default]
    Follow,
    Fixed,
    ScreenCenter,
    WindowCenter,
}

/// Where the scheduler clicks. Dynamic modes are frozen into `Fixed` before a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Target {
    Follow,
    Fixed { x: i32, y: i32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Countdown,
    Running,
    Stopping,
    Completed,
    Stopped,
    Errored,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Completed | RunState::Stopped | RunState::Errored)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClickPlan {
    interval: Duration,
    button: ButtonMode,
    total_clicks: Option<u64>,
    countdown: bool,
}

impl ClickPlan {
    pub fn new(
        interval: Duration,
        button: ButtonMode,
        total_clicks: Option<u64>,
        countdown: bool,
    ) -> Result<Self, ValidationError> {
        if interval < MIN_INTERVAL {
            return Err(ValidationError::IntervalTooShort);
        }
        if interval > MAX_INTERVAL {
            return Err(ValidationError::IntervalTooLong { max_ms: MAX_INTERVAL.as_millis() as u64 });
        }
        match total_clicks {
            Some(0) => return Err(ValidationError::ZeroClicks),
            Some(n) if n > MAX_CLICKS => return Err(ValidationError::TooManyClicks { max: MAX_CLICKS }),
            _ => {}
        }
        Ok(Self { interval, button, total_clicks, countdown })
    }

    pub fn interval(&self) -> Duration { self.interval }
    pub fn button(&self) -> ButtonMode { self.button }
    pub fn total_clicks(&self) -> Option<u64> { self.total_clicks }
    pub fn countdown(&self) -> bool { self.countdown }

    pub fn clicks_per_second(&self) -> f64 {
        clicks_per_second(self.interval)
    }
}

pub fn clicks_per_second(interval: Duration) -> f64 {
    1000.0 / (interval.as_millis().max(1) as f64)
}

/// Parses `"250"`, `"250ms"`, `"1s"`, `"1.5 s"` and the preset labels.
pub fn parse_interval(text: &str) -> Result<Duration, ValidationError> {
    let bad = || ValidationError::BadInterval(text.to_string());
    let t = text.trim().to_ascii_lowercase();
    if let Some(ms) = t.strip_suffix("ms") {
        return ms.trim().parse::<u64>().map(Duration::from_millis).map_err(|_| bad());
    }
    if let Some(secs) = t.strip_suffix('s') {
        let secs: f64 = secs.trim().parse().map_err(|_| bad())?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(bad());
        }
        return Ok(Duration::from_millis((secs * 1000.0).round() as u64));
    }
    t.parse::<u64>().map(Duration::from_millis).map_err(|_| bad())
}

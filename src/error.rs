use thiserror::Error;

/// Bad configuration, caught before a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Interval must be at least 1 ms.")]
    IntervalTooShort,
    #[error("Interval must be at most {max_ms} ms.")]
    IntervalTooLong { max_ms: u64 },
    #[error("Number of clicks must be at least 1.")]
    ZeroClicks,
    #[error("Number of clicks must be at most {max}.")]
    TooManyClicks { max: u64 },
    #[error("X/Y seem out of range (±{limit}): ({x}, {y}).")]
    CoordinateOutOfRange { x: i32, y: i32, limit: i32 },
    #[error("Could not parse interval {0:?} (try \"100ms\" or \"1s\").")]
    BadInterval(String),
    #[error("Could not resolve a click target on any display.")]
    TargetUnresolved,
}

/// OS pointer-operation failure. Fatal to the run that hits it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    #[error("pointer backend unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to move to target ({x}, {y}): not on any display")]
    OutOfBounds { x: i32, y: i32 },
    #[error("{0}")]
    Os(String),
}

/// The global panic key could not be installed. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("global stop key unavailable: {0}")]
pub struct ListenerUnavailable(pub String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("a click session is already running; stop it first")]
    AlreadyRunning,
    #[error("failed to spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

//! Repeated pointer clicks at a fixed rate, driven from a background thread.
//!
//! A [`SessionController`] validates a [`SessionConfig`], freezes the click
//! target, and runs one [`ActionScheduler`] at a time. Progress and status
//! come back as [`SessionEvent`]s; a stop request (or the global ESC key,
//! with the `hooks` feature) ends a run within about 10 ms.

pub mod cancel;
pub mod config;
pub mod driver;
pub mod error;
pub mod plan;
pub mod scheduler;
pub mod session;
pub mod target;


pub use cancel::{ArmedSlot, CancelReason, CancelToken, GlobalCancelSource, NoPanicKey};
#[cfg(feature = "hooks")]
pub use cancel::RdevPanicKey;
pub use config::SessionConfig;
pub use driver::{EnigoDriver, PointerDriver};
pub use error::{DriverError, ListenerUnavailable, SessionError, ValidationError};
pub use plan::{ButtonMode, ClickButton, ClickPlan, RunState, Target, TargetMode};
pub use scheduler::{ActionScheduler, SessionEvent};
pub use session::SessionController;
pub use target::{Desktop, NativeDesktop, Screen, WindowRect};

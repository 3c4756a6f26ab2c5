//! The click loop.
//!
//! An [`ActionScheduler`] owns the run state and click counter of one run
//! and publishes snapshots of both as [`SessionEvent`]s. It is driven on a
//! background thread by the session controller; nothing outside the
//! scheduler writes to its state.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use tracing::{debug, error, info, warn};

use crate::cancel::{ArmedKey, CancelReason, CancelToken, GlobalCancelSource};
use crate::driver::PointerDriver;
use crate::error::DriverError;
use crate::plan::{ClickButton, ClickPlan, RunState, Target};

/// Upper bound on how long a stop request can go unnoticed while waiting.
pub const POLL_QUANTUM: Duration = Duration::from_millis(10);
pub const COUNTDOWN_STEP: Duration = Duration::from_secs(1);
const COUNTDOWN_FROM: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// Physical clicks performed so far.
    Progress(u64),
    Status { message: String, state: RunState },
    Error(String),
    /// Last event of every run.
    Finished(RunState),
}

pub struct ActionScheduler {
    driver: Arc<dyn PointerDriver>,
    panic_key: Arc<dyn GlobalCancelSource>,
    events: Sender<SessionEvent>,
    countdown_step: Duration,
    state: RunState,
    performed: u64,
}

impl ActionScheduler {
    pub fn new(
        driver: Arc<dyn PointerDriver>,
        panic_key: Arc<dyn GlobalCancelSource>,
        events: Sender<SessionEvent>,
    ) -> Self {
        Self {
            driver,
            panic_key,
            events,
            countdown_step: COUNTDOWN_STEP,
            state: RunState::Idle,
            performed: 0,
        }
    }

    pub fn with_countdown_step(mut self, step: Duration) -> Self {
        self.countdown_step = step;
        self
    }

    pub fn state(&self) -> RunState { self.state }
    pub fn performed(&self) -> u64 { self.performed }

    /// Executes `plan` against `target` until the quota is met, `cancel`
    /// fires or the driver fails. Blocks the calling thread.
    pub fn run(&mut self, plan: &ClickPlan, target: Target, cancel: &CancelToken) -> RunState {
        self.state = RunState::Idle;
        self.performed = 0;
        info!(
            interval_ms = plan.interval().as_millis() as u64,
            button = %plan.button(),
            total = ?plan.total_clicks(),
            ?target,
            "click run starting"
        );
        let end = self.drive(plan, target, cancel);
        info!(state = ?end, performed = self.performed, "click run finished");
        self.emit(SessionEvent::Finished(end));
        end
    }

    fn drive(&mut self, plan: &ClickPlan, target: Target, cancel: &CancelToken) -> RunState {
        if plan.countdown() && !self.countdown(cancel) {
            return self.transition(RunState::Stopped, "Start aborted.");
        }

        self.state = RunState::Running;
        let (_armed, hooked) = ArmedKey::arm(Arc::clone(&self.panic_key), cancel);
        let running = match hooked {
            Ok(()) => "Running (ESC to stop)…",
            Err(e) => {
                warn!("{e}");
                self.status(format!("{e}; use Stop instead."));
                "Running…"
            }
        };
        self.status(running);

        let button = plan.button();
        while !cancel.is_cancelled() {
            let remaining = plan.total_clicks().map(|total| total.saturating_sub(self.performed));
            if remaining == Some(0) {
                return self.transition(RunState::Completed, "Completed.");
            }

            if let Err(e) = self.act(target, button.button(), button.clicks_for(remaining)) {
                return self.fail(e);
            }

            // No point waiting out the interval once the quota is met.
            if plan.total_clicks() == Some(self.performed) {
                return self.transition(RunState::Completed, "Completed.");
            }
            cancel.sleep(plan.interval(), POLL_QUANTUM);
        }

        self.transition(RunState::Stopping, "Stop requested…");
        if cancel.reason() == Some(CancelReason::PanicKey) {
            self.status("Panic stop requested (ESC).");
        }
        self.transition(RunState::Stopped, "Stopped by user.")
    }

    /// Returns `false` if cancelled before the countdown ran out.
    fn countdown(&mut self, cancel: &CancelToken) -> bool {
        self.state = RunState::Countdown;
        for i in (1..=COUNTDOWN_FROM).rev() {
            if cancel.is_cancelled() {
                return false;
            }
            debug!(remaining = i, "countdown");
            self.status(format!("Starting in {i}… (press ESC to cancel)"));
            if cancel.sleep(self.countdown_step, POLL_QUANTUM) {
                return false;
            }
        }
        true
    }

    fn act(&mut self, target: Target, button: ClickButton, clicks: u32) -> Result<(), DriverError> {
        if let Target::Fixed { x, y } = target {
            self.driver.move_to(x, y)?;
        }
        self.driver.click(button, clicks)?;
        self.performed += u64::from(clicks);
        self.emit(SessionEvent::Progress(self.performed));
        Ok(())
    }

    fn fail(&mut self, err: DriverError) -> RunState {
        error!(performed = self.performed, "pointer driver failed: {err}");
        self.state = RunState::Errored;
        self.emit(SessionEvent::Error(format!("Automation error: {err}")));
        self.state
    }

    fn transition(&mut self, state: RunState, message: impl Into<String>) -> RunState {
        self.state = state;
        self.status(message);
        state
    }

    fn status(&self, message: impl Into<String>) {
        self.emit(SessionEvent::Status { message: message.into(), state: self.state });
    }

    fn emit(&self, event: SessionEvent) {
        // A front end that stopped listening must not break the run.
        let _ = self.events.send(event);
    }
}

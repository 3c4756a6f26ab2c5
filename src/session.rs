//! Session lifecycle: validate, resolve the target, run one scheduler at a
//! time on a background thread, relay its events.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::cancel::{CancelToken, GlobalCancelSource};
use crate::config::SessionConfig;
use crate::driver::PointerDriver;
use crate::error::SessionError;
use crate::plan::{RunState, Target, TargetMode};
use crate::scheduler::{ActionScheduler, SessionEvent, COUNTDOWN_STEP};
use crate::target::{self, Desktop};

/// How long teardown waits for a running scheduler to notice the stop.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

struct ActiveRun {
    cancel: CancelToken,
    done: Receiver<()>,
    handle: JoinHandle<RunState>,
}

pub struct SessionController {
    driver: Arc<dyn PointerDriver>,
    panic_key: Arc<dyn GlobalCancelSource>,
    desktop: Arc<dyn Desktop>,
    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    countdown_step: Duration,
    active: Option<ActiveRun>,
    last_state: Option<RunState>,
}

impl SessionController {
    pub fn new(
        driver: Arc<dyn PointerDriver>,
        panic_key: Arc<dyn GlobalCancelSource>,
        desktop: Arc<dyn Desktop>,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            driver,
            panic_key,
            desktop,
            events_tx,
            events_rx,
            countdown_step: COUNTDOWN_STEP,
            active: None,
            last_state: None,
        }
    }

    pub fn with_countdown_step(mut self, step: Duration) -> Self {
        self.countdown_step = step;
        self
    }

    /// Event stream of every run started by this controller. Clones share
    /// the same queue, so each event reaches exactly one receiver.
    pub fn events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    /// Whether a scheduler thread is still alive. Takes `&mut self` because a
    /// thread that has exited is joined here and its end state recorded in
    /// [`last_state`](Self::last_state).
    pub fn is_running(&mut self) -> bool {
        self.reap();
        self.active.is_some()
    }

    /// Terminal state of the most recently joined run.
    pub fn last_state(&self) -> Option<RunState> {
        self.last_state
    }

    /// Validates `config` and hands a new run to a background thread.
    /// Returns as soon as the thread is spawned.
    pub fn start(&mut self, config: &SessionConfig) -> Result<Target, SessionError> {
        if self.is_running() {
            return Err(SessionError::AlreadyRunning);
        }
        let plan = config.validate()?;
        let target = self.resolve_target(config)?;
        info!(rate_cps = plan.clicks_per_second(), ?target, "starting click session");

        let cancel = CancelToken::new();
        let (done_tx, done) = bounded(1);
        let mut scheduler = ActionScheduler::new(
            Arc::clone(&self.driver),
            Arc::clone(&self.panic_key),
            self.events_tx.clone(),
        )
        .with_countdown_step(self.countdown_step);
        let token = cancel.clone();
        let handle = thread::Builder::new()
            .name("click-scheduler".into())
            .spawn(move || {
                let end = scheduler.run(&plan, target, &token);
                let _ = done_tx.send(());
                end
            })?;

        self.active = Some(ActiveRun { cancel, done, handle });
        Ok(target)
    }

    /// Requests the active run to stop. Does nothing when idle or when a
    /// stop was already requested.
    pub fn stop(&self) {
        if let Some(run) = &self.active {
            if run.cancel.cancel() {
                debug!("stop requested");
            }
        }
    }

    /// Stops the active run and waits up to `timeout` for it to end.
    /// Returns `false` if the scheduler thread was still busy at the deadline;
    /// the run then stays active, so `start` keeps refusing until it exits.
    pub fn shutdown(&mut self, timeout: Duration) -> bool {
        let Some(run) = self.active.take() else { return true };
        run.cancel.cancel();
        // A panicked scheduler drops its sender, which also counts as done.
        if let Err(RecvTimeoutError::Timeout) = run.done.recv_timeout(timeout) {
            warn!(?timeout, "scheduler did not stop in time");
            self.active = Some(run);
            return false;
        }
        self.join(run);
        true
    }

    fn resolve_target(&self, config: &SessionConfig) -> Result<Target, SessionError> {
        let cursor = match config.target {
            TargetMode::ScreenCenter | TargetMode::WindowCenter => match self.driver.position() {
                Ok(pos) => Some(pos),
                Err(e) => {
                    warn!("cursor position unavailable, using primary display: {e}");
                    None
                }
            },
            TargetMode::Follow | TargetMode::Fixed => None,
        };
        let fixed = (config.fixed_x, config.fixed_y);
        Ok(target::resolve(config.target, fixed, cursor, self.desktop.as_ref())?)
    }

    /// Joins the active run if its thread has finished.
    fn reap(&mut self) {
        let finished = self.active.as_ref().is_some_and(|run| run.handle.is_finished());
        if finished {
            if let Some(run) = self.active.take() {
                self.join(run);
            }
        }
    }

    fn join(&mut self, run: ActiveRun) {
        match run.handle.join() {
            Ok(state) => {
                debug!(?state, "scheduler joined");
                self.last_state = Some(state);
            }
            Err(_) => {
                warn!("scheduler thread panicked");
                self.last_state = Some(RunState::Errored);
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if !self.shutdown(SHUTDOWN_GRACE) {
            warn!("detaching scheduler thread");
        }
    }
}

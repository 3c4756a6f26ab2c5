//! Cooperative cancellation and the global panic key.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{const_mutex, Mutex};

use crate::error::ListenerUnavailable;

const NOT_CANCELLED: u8 = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CancelReason {
    /// Explicit stop command from the front end.
    User = 1,
    /// The global panic key.
    PanicKey = 2,
}

/// One-way stop flag shared between a run and whoever may stop it.
/// Only the first request is recorded; later ones are no-ops.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    state: Arc<AtomicU8>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) -> bool {
        self.cancel_with(CancelReason::User)
    }

    /// Returns `true` only for the request that actually cancelled.
    pub fn cancel_with(&self, reason: CancelReason) -> bool {
        self.state
            .compare_exchange(NOT_CANCELLED, reason as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.load(Ordering::Acquire) != NOT_CANCELLED
    }

    /// Whether `other` is a clone of this token rather than a separate one.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn reason(&self) -> Option<CancelReason> {
        match self.state.load(Ordering::Acquire) {
            1 => Some(CancelReason::User),
            2 => Some(CancelReason::PanicKey),
            _ => None,
        }
    }

    /// Sleeps for `total`, waking at most every `quantum` to check for
    /// cancellation. Returns `true` if the sleep was cut short.
    pub fn sleep(&self, total: Duration, quantum: Duration) -> bool {
        let deadline = Instant::now() + total;
        loop {
            if self.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(quantum.min(deadline - now));
        }
    }
}

/// System-wide stop key, independent of which window has focus.
/// Armed for exactly one run at a time.
pub trait GlobalCancelSource: Send + Sync {
    /// Route the key to `token` until [`disable`](Self::disable) is called.
    fn enable(&self, token: &CancelToken) -> Result<(), ListenerUnavailable>;
    /// Stop routing the key to `token`. A no-op if another run has since
    /// armed its own token.
    fn disable(&self, token: &CancelToken);
}

/// The token a global key currently stops, if any.
pub struct ArmedSlot {
    current: Mutex<Option<CancelToken>>,
}

impl ArmedSlot {
    pub const fn new() -> Self {
        Self { current: const_mutex(None) }
    }

    pub fn arm(&self, token: &CancelToken) {
        *self.current.lock() = Some(token.clone());
    }

    /// Clears the slot only if it still holds `token`.
    pub fn disarm(&self, token: &CancelToken) -> bool {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|armed| armed.same_as(token)) {
            *current = None;
            return true;
        }
        false
    }

    pub fn clear(&self) {
        self.current.lock().take();
    }

    pub fn is_armed(&self) -> bool {
        self.current.lock().is_some()
    }

    /// Cancels the armed token. `true` if this press did the cancelling.
    pub fn trigger(&self, reason: CancelReason) -> bool {
        self.current.lock().as_ref().is_some_and(|token| token.cancel_with(reason))
    }
}

impl Default for ArmedSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Stands in when the crate is built without the `hooks` feature.
pub struct NoPanicKey;

impl GlobalCancelSource for NoPanicKey {
    fn enable(&self, _token: &CancelToken) -> Result<(), ListenerUnavailable> {
        Err(ListenerUnavailable("built without global hook support".into()))
    }

    fn disable(&self, _token: &CancelToken) {}
}

/// Disarms the panic key when dropped, whatever way the run ends.
pub(crate) struct ArmedKey {
    source: Arc<dyn GlobalCancelSource>,
    token: CancelToken,
}

impl ArmedKey {
    pub(crate) fn arm(
        source: Arc<dyn GlobalCancelSource>,
        token: &CancelToken,
    ) -> (Self, Result<(), ListenerUnavailable>) {
        let res = source.enable(token);
        (Self { source, token: token.clone() }, res)
    }
}

impl Drop for ArmedKey {
    fn drop(&mut self) {
        self.source.disable(&self.token);
    }
}

#[cfg(feature = "hooks")]
pub use self::hook::RdevPanicKey;

#[cfg(feature = "hooks")]
mod hook {
    use std::thread;
    use std::time::Duration;

    use crossbeam_channel::bounded;
    use once_cell::sync::Lazy;
    use parking_lot::Mutex;
    use rdev::{listen, Event, EventType, Key};
    use tracing::{debug, info, warn};

    use super::{ArmedSlot, CancelReason, CancelToken, GlobalCancelSource};
    use crate::error::ListenerUnavailable;

    /// How long `enable` waits for an immediate listener failure.
    const STARTUP_GRACE: Duration = Duration::from_millis(100);

    #[derive(Default)]
    struct HookState {
        started: bool,
        failed: Option<String>,
    }

    // rdev::listen cannot be torn down once running, so the process keeps a
    // single listener and runs arm and disarm it.
    static HOOK: Lazy<Mutex<HookState>> = Lazy::new(|| Mutex::new(HookState::default()));
    static ARMED: ArmedSlot = ArmedSlot::new();

    /// ESC anywhere on the desktop stops the armed run.
    pub struct RdevPanicKey;

    fn on_event(event: Event) {
        if let EventType::KeyPress(Key::Escape) = event.event_type {
            if ARMED.trigger(CancelReason::PanicKey) {
                info!("panic key pressed");
            }
        }
    }

    fn start_listener() -> Result<(), String> {
        let (fail_tx, fail_rx) = bounded::<String>(1);
        thread::Builder::new()
            .name("panic-key".into())
            .spawn(move || {
                if let Err(e) = listen(on_event) {
                    let msg = format!("{e:?}");
                    warn!("global key listener failed: {msg}");
                    HOOK.lock().failed = Some(msg.clone());
                    ARMED.clear();
                    let _ = fail_tx.send(msg);
                }
            })
            .map_err(|e| e.to_string())?;
        match fail_rx.recv_timeout(STARTUP_GRACE) {
            Ok(msg) => Err(msg),
            Err(_) => Ok(()),
        }
    }

    impl GlobalCancelSource for RdevPanicKey {
        fn enable(&self, token: &CancelToken) -> Result<(), ListenerUnavailable> {
            let needs_start = {
                let mut state = HOOK.lock();
                if let Some(msg) = &state.failed {
                    return Err(ListenerUnavailable(msg.clone()));
                }
                let first = !state.started;
                state.started = true;
                first
            };
            if needs_start {
                debug!("starting global key listener");
                if let Err(msg) = start_listener() {
                    HOOK.lock().failed = Some(msg.clone());
                    return Err(ListenerUnavailable(msg));
                }
            }
            ARMED.arm(token);
            debug!("panic key armed");
            Ok(())
        }

        fn disable(&self, token: &CancelToken) {
            if ARMED.disarm(token) {
                debug!("panic key disarmed");
            }
        }
    }
}

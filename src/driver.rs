//! OS pointer control.

use enigo::{Enigo, MouseButton, MouseControllable};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::DriverError;
use crate::plan::ClickButton;
use crate::target::{Desktop, NativeDesktop, Screen};

/// Thin seam over the OS pointer. Implementations are shared between the
/// controller thread and the scheduler thread.
pub trait PointerDriver: Send + Sync {
    fn move_to(&self, x: i32, y: i32) -> Result<(), DriverError>;
    /// Sends `repeat` press/release pairs of `button`.
    fn click(&self, button: ClickButton, repeat: u32) -> Result<(), DriverError>;
    fn position(&self) -> Result<(i32, i32), DriverError>;
}

static ENIGO: Lazy<Mutex<Enigo>> = Lazy::new(|| Mutex::new(Enigo::new()));

impl ClickButton {
    fn to_enigo(self) -> MouseButton {
        match self {
            ClickButton::Left => MouseButton::Left,
            ClickButton::Right => MouseButton::Right,
        }
    }
}

/// Native driver. Display geometry is captured once at construction and
/// used to reject moves that would land off every screen.
pub struct EnigoDriver {
    screens: Vec<Screen>,
}

impl EnigoDriver {
    pub fn new() -> Result<Self, DriverError> {
        let screens = NativeDesktop.screens();
        if screens.is_empty() {
            return Err(DriverError::Unavailable("no displays detected".into()));
        }
        debug!(count = screens.len(), "pointer driver ready");
        Ok(Self { screens })
    }

    fn on_screen(&self, x: i32, y: i32) -> bool {
        self.screens.iter().any(|s| s.contains(x, y))
    }
}

impl PointerDriver for EnigoDriver {
    fn move_to(&self, x: i32, y: i32) -> Result<(), DriverError> {
        if !self.on_screen(x, y) {
            return Err(DriverError::OutOfBounds { x, y });
        }
        ENIGO.lock().mouse_move_to(x, y);
        Ok(())
    }

    fn click(&self, button: ClickButton, repeat: u32) -> Result<(), DriverError> {
        let mut en = ENIGO.lock();
        for _ in 0..repeat {
            en.mouse_click(button.to_enigo());
        }
        Ok(())
    }

    fn position(&self) -> Result<(i32, i32), DriverError> {
        Ok(ENIGO.lock().mouse_location())
    }
}

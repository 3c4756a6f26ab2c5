//! Resolution of the click target.
//!
//! Dynamic modes (screen center, active-window center) are resolved once
//! when a session starts and frozen into [`Target::Fixed`]; the scheduler
//! never re-resolves them per click.

use display_info::DisplayInfo;
use tracing::{debug, warn};

use crate::error::ValidationError;
use crate::plan::{Target, TargetMode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub primary: bool,
}

impl Screen {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        let (left, top) = (i64::from(self.x), i64::from(self.y));
        x >= left && x < left + i64::from(self.width) && y >= top && y < top + i64::from(self.height)
    }

    pub fn center(&self) -> (i32, i32) {
        (self.x + (self.width / 2) as i32, self.y + (self.height / 2) as i32)
    }
}

/// Window frame in screen coordinates, right/bottom exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Read-only view of the desktop the clicker runs on.
pub trait Desktop: Send + Sync {
    fn screens(&self) -> Vec<Screen>;
    /// Frame of the foreground window, where the platform can tell.
    fn foreground_window(&self) -> Option<WindowRect>;
}

pub struct NativeDesktop;

impl Desktop for NativeDesktop {
    fn screens(&self) -> Vec<Screen> {
        match DisplayInfo::all() {
            Ok(displays) => displays
                .into_iter()
                .map(|d| Screen { x: d.x, y: d.y, width: d.width, height: d.height, primary: d.is_primary })
                .collect(),
            Err(e) => {
                warn!("display enumeration failed: {e}");
                Vec::new()
            }
        }
    }

    #[cfg(windows)]
    fn foreground_window(&self) -> Option<WindowRect> {
        use windows::Win32::Foundation::RECT;
        use windows::Win32::UI::WindowsAndMessaging::{GetForegroundWindow, GetWindowRect, SetProcessDPIAware};

        unsafe {
            // Best effort; without it HiDPI screens report scaled coordinates.
            let _ = SetProcessDPIAware();
            let hwnd = GetForegroundWindow();
            if hwnd.0.is_null() {
                return None;
            }
            let mut rect = RECT::default();
            GetWindowRect(hwnd, &mut rect).ok()?;
            Some(WindowRect { left: rect.left, top: rect.top, right: rect.right, bottom: rect.bottom })
        }
    }

    #[cfg(not(windows))]
    fn foreground_window(&self) -> Option<WindowRect> {
        None
    }
}

/// Center of the screen holding `cursor`, falling back to the primary
/// screen (or the first one listed) when the cursor is unknown or off-screen.
pub fn resolve_screen_center(cursor: Option<(i32, i32)>, screens: &[Screen]) -> Option<(i32, i32)> {
    cursor
        .and_then(|(x, y)| screens.iter().find(|s| s.contains(x, y)))
        .or_else(|| screens.iter().find(|s| s.primary))
        .or_else(|| screens.first())
        .map(Screen::center)
}

pub fn resolve_active_window_center(window: Option<WindowRect>) -> Option<(i32, i32)> {
    window.map(|r| ((r.left + r.right) / 2, (r.top + r.bottom) / 2))
}

/// Turns a target mode into the frozen target handed to the scheduler.
pub fn resolve(
    mode: TargetMode,
    fixed: (i32, i32),
    cursor: Option<(i32, i32)>,
    desktop: &dyn Desktop,
) -> Result<Target, ValidationError> {
    let point = match mode {
        TargetMode::Follow => return Ok(Target::Follow),
        TargetMode::Fixed => Some(fixed),
        TargetMode::ScreenCenter => resolve_screen_center(cursor, &desktop.screens()),
        TargetMode::WindowCenter => resolve_active_window_center(desktop.foreground_window()).or_else(|| {
            debug!("no foreground window available, using screen center");
            resolve_screen_center(cursor, &desktop.screens())
        }),
    };
    let (x, y) = point.ok_or(ValidationError::TargetUnresolved)?;
    Ok(Target::Fixed { x, y })
}

// common.rs: console printing shared by the game and the runner

use std::fmt;

use parking_lot::Mutex;

use crate::cvar::{cvar_get, cvar_variable_value, CvarFlags};

/// Distribution name and version (for the runner banner).
pub const DISTNAME: &str = "qmove";
pub const DISTVER: f32 = 1.0;

// ============================================================
// Redirect buffer for com_printf
// ============================================================

static RD_BUFFER: Mutex<Option<String>> = parking_lot::const_mutex(None);

/// Begin redirecting printf output into a buffer.
pub fn com_begin_redirect() {
    *RD_BUFFER.lock() = Some(String::new());
}

/// End redirect and return the captured output.
pub fn com_end_redirect() -> Option<String> {
    RD_BUFFER.lock().take()
}

// ============================================================
// com_printf / com_dprintf
// ============================================================

/// Register the console cvars.
pub fn com_init() {
    cvar_get("developer", "0", CvarFlags::empty());
    cvar_get("version", &format!("{} {:.2}", DISTNAME, DISTVER), CvarFlags::NOSET);
}

/// General-purpose print. Appends to the redirect buffer if one is active,
/// otherwise emits an `info` event.
pub fn com_printf(msg: &str) {
    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(msg);
            return;
        }
    }
    tracing::info!(target: "qmove", "{}", msg.trim_end_matches('\n'));
}

/// Developer-only print, gated by the "developer" cvar. Nothing is
/// formatted unless the gate is open.
///
/// Must not be called while the cvar context is locked.
pub fn com_dprintf(args: fmt::Arguments) {
    if cvar_variable_value("developer") == 0.0 {
        return;
    }
    let msg = args.to_string();
    {
        let mut buf = RD_BUFFER.lock();
        if let Some(ref mut s) = *buf {
            s.push_str(&msg);
            return;
        }
    }
    tracing::debug!(target: "qmove", "{}", msg.trim_end_matches('\n'));
}

// ============================================================
// Tests
// ============================================================

//! Application-wide constants
//!
//! Bounds, defaults and fixed names used throughout the dimmer, kept in one
//! place so validation, reconciliation and persistence agree on them.

/// Sane geometry bounds for any screen record (live, loaded or aggregate)
pub mod bounds {
    /// Leftmost allowed origin x
    pub const MIN_ORIGIN_X: i32 = -20_000;

    /// Rightmost allowed origin x
    pub const MAX_ORIGIN_X: i32 = 20_000;

    /// Topmost allowed origin y
    pub const MIN_ORIGIN_Y: i32 = -10_000;

    /// Bottommost allowed origin y
    pub const MAX_ORIGIN_Y: i32 = 10_000;

    /// Smallest allowed width/height
    pub const MIN_RESOLUTION: u32 = 1;

    /// Largest allowed width/height
    pub const MAX_RESOLUTION: u32 = 10_000;
}

/// Overlay opacity range and defaults
pub mod opacity {
    /// Lower bound; keeps the overlay present and adjustable
    pub const MIN: f64 = 0.05;

    /// Upper bound; a screen is never fully blacked out
    pub const MAX: f64 = 0.9;

    /// Opacity given to newly detected screens and fresh defaults
    pub const DEFAULT: f64 = 0.3;
}

/// Aggregate ("basic") region identity
pub mod aggregate {
    /// Fixed record name of the synthetic aggregate region
    pub const NAME: &str = "basic";

    /// Fixed index of the aggregate region (physical screens start at 1)
    pub const INDEX: u32 = 0;
}

/// Debounced persistence
pub mod persistence {
    use std::time::Duration;

    /// Quiet period after the last change before the settings are written
    pub const QUIET_PERIOD: Duration = Duration::from_secs(15);
}

/// X11 protocol constants
pub mod x11 {
    /// Override redirect flag for unmanaged windows
    pub const OVERRIDE_REDIRECT: u32 = 1;

    /// `_NET_WM_WINDOW_OPACITY` value for a fully opaque window
    pub const OPAQUE: u32 = u32::MAX;

    /// WM_CLASS instance and class for overlay windows
    pub const WM_CLASS: &[u8] = b"screendim\0screendim\0";
}

/// File names and paths
pub mod paths {
    /// Settings document, relative to the working directory
    pub const SETTINGS_FILE: &str = "settings.json";

    /// Directory holding the control socket (under the runtime dir)
    pub const SOCKET_DIR: &str = "screendim";

    /// Control socket file name
    pub const SOCKET_FILE: &str = "control.sock";
}

/// IPC limits
pub mod ipc {
    use std::time::Duration;

    /// Maximum message size (1 MB); the largest message is a screen listing
    pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;

    /// How long the daemon waits on a connected client before dropping it
    pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(2);
}

/// Event loop timing
pub mod daemon {
    use std::time::Duration;

    /// Longest the loop sleeps when no save is pending
    pub const IDLE_WAKEUP: Duration = Duration::from_secs(1);
}

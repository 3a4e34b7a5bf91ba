//! IPC message types for client ↔ daemon communication

use serde::{Deserialize, Serialize};

use crate::controller::{DetectReport, Snapshot};

/// Requests sent from a client command to the running daemon
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlRequest {
    /// Current record set, mode and connected count
    List,

    /// Switch between per-screen and aggregate dimming
    SetMode { separate: bool },

    /// Set one record's opacity (clamped by the daemon)
    SetOpacity { name: String, value: f64 },

    /// Show or hide one record's overlay
    SetShown { name: String, shown: bool },

    /// Pick up newly attached outputs and geometry changes
    Detect,

    /// Forget per-screen settings and rebuild from the live outputs
    Reset,

    /// Write settings now
    Save,

    /// Stop the daemon, flushing (or discarding) the pending save
    Quit { flush: bool },

    /// Health check
    Ping,
}

/// Responses sent from the daemon back to the client
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum ControlResponse {
    Snapshot(Snapshot),

    /// Opacity actually applied after clamping
    Opacity(f64),

    Detected(DetectReport),

    /// Request processed, nothing to report
    Done,

    Pong,

    Error(String),
}

//! Client side of the control socket: build requests, print responses

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Result};

use crate::cli::{Command, Mode};
use crate::controller::{DetectReport, ScreenStatus, Snapshot};
use crate::ipc::{ControlClient, ControlRequest, ControlResponse};

/// Request for a client subcommand; `None` for `run`
pub fn request_for(command: &Command) -> Option<ControlRequest> {
    Some(match command {
        Command::Run(_) => return None,
        Command::List => ControlRequest::List,
        Command::Mode { mode } => ControlRequest::SetMode {
            separate: *mode == Mode::Separate,
        },
        Command::Opacity { name, value } => ControlRequest::SetOpacity {
            name: name.clone(),
            value: *value,
        },
        Command::Show { name } => ControlRequest::SetShown {
            name: name.clone(),
            shown: true,
        },
        Command::Hide { name } => ControlRequest::SetShown {
            name: name.clone(),
            shown: false,
        },
        Command::Detect => ControlRequest::Detect,
        Command::Reset => ControlRequest::Reset,
        Command::Save => ControlRequest::Save,
        Command::Quit { discard } => ControlRequest::Quit { flush: !discard },
        Command::Ping => ControlRequest::Ping,
    })
}

/// Send one request to the daemon and print the answer
pub fn run_client(socket: &Path, request: ControlRequest) -> Result<()> {
    let mut client = ControlClient::connect_to(socket)?;
    match client.request(&request)? {
        ControlResponse::Error(message) => bail!("daemon: {message}"),
        response => {
            let text = format_response(&response);
            if !text.is_empty() {
                print!("{text}");
            }
            Ok(())
        }
    }
}

fn format_response(response: &ControlResponse) -> String {
    match response {
        ControlResponse::Snapshot(snapshot) => format_snapshot(snapshot),
        ControlResponse::Opacity(value) => format!("opacity set to {value:.2}\n"),
        ControlResponse::Detected(report) => format_report(report),
        ControlResponse::Pong => "pong\n".to_string(),
        ControlResponse::Done | ControlResponse::Error(_) => String::new(),
    }
}

fn format_status(out: &mut String, status: &ScreenStatus) {
    let mut flags = Vec::new();
    if status.shown {
        flags.push("shown");
    }
    if status.visible {
        flags.push("visible");
    }
    if !status.connected {
        flags.push("disconnected");
    }
    writeln!(
        out,
        "{:<16} {:<10} {:>6},{:<6} {:>5}x{:<5} {:.2}  {}",
        status.label,
        status.name,
        status.origin.x,
        status.origin.y,
        status.resolution.width,
        status.resolution.height,
        status.opacity,
        flags.join(" ")
    ).ok();
}

pub fn format_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    let mode = if snapshot.separate_screens {
        "separate"
    } else {
        "aggregate"
    };
    writeln!(
        out,
        "mode: {mode}, {} screen(s) connected{}",
        snapshot.connected,
        if snapshot.save_pending { ", unsaved changes" } else { "" }
    ).ok();
    format_status(&mut out, &snapshot.basic);
    for status in &snapshot.screens {
        format_status(&mut out, status);
    }
    out
}

fn format_report(report: &DetectReport) -> String {
    let mut out = format!("{} screen(s) connected\n", report.connected);
    for name in &report.added {
        writeln!(out, "added   {name}").ok();
    }
    for name in &report.patched {
        writeln!(out, "updated {name}").ok();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::RunArgs;
    use crate::types::{Dimensions, Position};

    fn status(name: &str, label: &str, connected: bool) -> ScreenStatus {
        ScreenStatus {
            name: name.into(),
            label: label.into(),
            index: 1,
            origin: Position::new(0, 0),
            resolution: Dimensions::new(1920, 1080),
            opacity: 0.3,
            enabled: true,
            shown: true,
            visible: connected,
            connected,
        }
    }

    #[test]
    fn test_request_mapping() {
        assert_eq!(request_for(&Command::Run(RunArgs::default())), None);
        assert_eq!(
            request_for(&Command::Hide { name: "DP-1".into() }),
            Some(ControlRequest::SetShown {
                name: "DP-1".into(),
                shown: false
            })
        );
        assert_eq!(
            request_for(&Command::Quit { discard: true }),
            Some(ControlRequest::Quit { flush: false })
        );
        assert_eq!(
            request_for(&Command::Mode { mode: Mode::Separate }),
            Some(ControlRequest::SetMode { separate: true })
        );
    }

    #[test]
    fn test_snapshot_listing() {
        let snapshot = Snapshot {
            separate_screens: true,
            connected: 1,
            save_pending: true,
            basic: status("basic", "Dimmer Options", true),
            screens: vec![
                status("DP-1", "Screen 1", true),
                status("HDMI-1", "Screen 2", false),
            ],
        };
        let text = format_snapshot(&snapshot);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "mode: separate, 1 screen(s) connected, unsaved changes");
        assert!(lines[2].starts_with("Screen 1"));
        assert!(lines[3].contains("HDMI-1"));
        assert!(lines[3].ends_with("shown disconnected"));
    }

    #[test]
    fn test_detect_report_listing() {
        let report = DetectReport {
            connected: 3,
            added: vec!["DP-2".into()],
            patched: vec!["DP-1".into()],
        };
        assert_eq!(
            format_report(&report),
            "3 screen(s) connected\nadded   DP-2\nupdated DP-1\n"
        );
    }
}

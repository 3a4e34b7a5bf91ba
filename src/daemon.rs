//! Daemon event loop
//!
//! A single thread owns the controller and waits on the X11 connection and the
//! control socket with `poll(2)`. The poll timeout is the debounced save
//! deadline, so saves fire on time without a timer thread.

use std::os::fd::AsFd;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, error, info, trace, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;

use crate::constants::daemon;
use crate::controller::DimmerController;
use crate::display::{DisplaySource, RandrDisplays};
use crate::ipc::{ControlClient, ControlRequest, ControlResponse, ControlServer};
use crate::overlay::{OverlayFactory, X11OverlayFactory};
use crate::settings::SettingsStore;
use crate::x11_utils::X11Context;

/// Where the daemon keeps its state
#[derive(Debug, Clone)]
pub struct DaemonPaths {
    pub settings: PathBuf,
    pub socket: PathBuf,
}

/// What the loop does after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Quit { flush: bool },
}

/// Apply one control request to the controller
pub fn dispatch<F: OverlayFactory, D: DisplaySource>(
    controller: &mut DimmerController<F, D>,
    request: ControlRequest,
    now: Instant,
) -> (ControlResponse, LoopControl) {
    debug!(request = ?request, "Handling control request");
    let response = match request {
        ControlRequest::List => Ok(ControlResponse::Snapshot(controller.snapshot())),
        ControlRequest::SetMode { separate } => controller
            .set_mode(separate, now)
            .map(|()| ControlResponse::Done),
        ControlRequest::SetOpacity { name, value } => controller
            .set_opacity(&name, value, now)
            .map(ControlResponse::Opacity),
        ControlRequest::SetShown { name, shown } => controller
            .set_shown(&name, shown)
            .map(|()| ControlResponse::Done),
        ControlRequest::Detect => controller.detect_screens(now).map(ControlResponse::Detected),
        ControlRequest::Reset => controller
            .reset_to_defaults(now)
            .map(ControlResponse::Detected),
        ControlRequest::Save => controller.save_now().map(|()| ControlResponse::Done),
        ControlRequest::Quit { flush } => {
            info!(flush = flush, "Shutdown requested via IPC");
            return (ControlResponse::Done, LoopControl::Quit { flush });
        }
        ControlRequest::Ping => Ok(ControlResponse::Pong),
    };

    let response = response.unwrap_or_else(|e| {
        warn!(error = %e, "Control request failed");
        ControlResponse::Error(format!("{e:#}"))
    });
    (response, LoopControl::Continue)
}

fn serve_client<F: OverlayFactory, D: DisplaySource>(
    controller: &mut DimmerController<F, D>,
    client: &mut ControlClient,
) -> LoopControl {
    let request = match client.recv_request() {
        Ok(request) => request,
        Err(e) => {
            warn!(error = ?e, "Dropping IPC client with unreadable request");
            return LoopControl::Continue;
        }
    };
    let (response, control) = dispatch(controller, request, Instant::now());
    if let Err(e) = client.send_response(&response) {
        warn!(error = ?e, "Failed to send IPC response");
    }
    control
}

/// Milliseconds to wait before the next save is due, capped at the idle wakeup
fn timeout_ms(deadline: Option<Instant>, now: Instant) -> u16 {
    let wait = deadline
        .map(|d| d.saturating_duration_since(now))
        .unwrap_or(daemon::IDLE_WAKEUP)
        .min(daemon::IDLE_WAKEUP);
    u16::try_from(wait.as_micros().div_ceil(1000)).unwrap_or(u16::MAX)
}

fn is_topology_event(event: &Event) -> bool {
    matches!(event, Event::RandrScreenChangeNotify(_) | Event::RandrNotify(_))
}

pub fn run_daemon(paths: DaemonPaths) -> Result<()> {
    let ctx = Rc::new(X11Context::connect()?);
    let displays = RandrDisplays::new(Rc::clone(&ctx));
    displays.select_change_events()?;
    let factory = X11OverlayFactory::new(Rc::clone(&ctx));

    let mut controller = DimmerController::start(
        factory,
        displays,
        SettingsStore::new(&paths.settings),
        Instant::now(),
    )
    .context("Failed to start dimmer")?;

    let server = ControlServer::bind_to(paths.socket).context("Failed to start control socket")?;

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, Arc::clone(&shutdown))
            .context(format!("Failed to register handler for signal {signal}"))?;
    }

    info!(
        settings = %paths.settings.display(),
        socket = %server.path().display(),
        "Dimmer daemon running"
    );

    let mut flush = true;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("Termination signal received");
            break;
        }

        let mut topology_changed = false;
        while let Some(event) = ctx
            .conn
            .poll_for_event()
            .context("Failed to read X11 event")?
        {
            match event {
                ref e if is_topology_event(e) => topology_changed = true,
                Event::Error(e) => warn!(error = ?e, "X11 error"),
                other => trace!(event = ?other, "Ignoring X11 event"),
            }
        }
        if topology_changed {
            info!("Display topology changed, re-detecting screens");
            if let Err(e) = controller.detect_screens(Instant::now()) {
                error!(error = %e, "Screen detection after topology change failed");
            }
        }

        controller.poll_save(Instant::now());
        ctx.conn
            .flush()
            .context("Failed to flush X11 connection")?;

        let timeout = PollTimeout::from(timeout_ms(controller.next_deadline(), Instant::now()));
        let ipc_ready = {
            let mut fds = [
                PollFd::new(ctx.conn.stream().as_fd(), PollFlags::POLLIN),
                PollFd::new(server.as_fd(), PollFlags::POLLIN),
            ];
            match poll(&mut fds, timeout) {
                Ok(_) => {}
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(e).context("Failed to poll event sources"),
            }
            fds[1]
                .revents()
                .is_some_and(|r| r.intersects(PollFlags::POLLIN))
        };

        if ipc_ready {
            let mut quit = None;
            loop {
                match server.try_accept() {
                    Ok(Some(mut client)) => {
                        if let LoopControl::Quit { flush } = serve_client(&mut controller, &mut client) {
                            quit = Some(flush);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = ?e, "Failed to accept IPC client");
                        break;
                    }
                }
            }
            if let Some(requested) = quit {
                flush = requested;
                break;
            }
        }
    }

    controller.shutdown(flush);
    ctx.conn
        .flush()
        .context("Failed to flush X11 connection on shutdown")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::opacity;
    use crate::display::testing::FixedDisplays;
    use crate::overlay::testing::FakeFactory;
    use crate::screen::DisplayInfo;
    use std::time::Duration;
    use tempfile::TempDir;

    fn controller(dir: &TempDir) -> DimmerController<FakeFactory, FixedDisplays> {
        DimmerController::start(
            FakeFactory::default(),
            FixedDisplays::new(vec![
                DisplayInfo::new("DP-1", 0, 0, 1920, 1080),
                DisplayInfo::new("HDMI-1", 1920, 0, 1280, 1024),
            ]),
            SettingsStore::new(dir.path().join("settings.json")),
            Instant::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_dispatch_opacity_reports_clamped_value() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        let (resp, control) = dispatch(
            &mut c,
            ControlRequest::SetOpacity {
                name: "DP-1".into(),
                value: 5.0,
            },
            Instant::now(),
        );
        assert_eq!(resp, ControlResponse::Opacity(opacity::MAX));
        assert_eq!(control, LoopControl::Continue);
    }

    #[test]
    fn test_dispatch_unknown_screen_is_error_response() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        let (resp, _) = dispatch(
            &mut c,
            ControlRequest::SetShown {
                name: "nope".into(),
                shown: true,
            },
            Instant::now(),
        );
        assert_eq!(resp, ControlResponse::Error("no screen named 'nope'".into()));
    }

    #[test]
    fn test_dispatch_list_and_quit() {
        let dir = TempDir::new().unwrap();
        let mut c = controller(&dir);
        let (resp, _) = dispatch(&mut c, ControlRequest::List, Instant::now());
        match resp {
            ControlResponse::Snapshot(snap) => {
                assert_eq!(snap.connected, 2);
                assert_eq!(snap.screens.len(), 2);
            }
            other => panic!("unexpected response {other:?}"),
        }

        let (resp, control) = dispatch(&mut c, ControlRequest::Quit { flush: false }, Instant::now());
        assert_eq!(resp, ControlResponse::Done);
        assert_eq!(control, LoopControl::Quit { flush: false });
    }

    #[test]
    fn test_timeout_tracks_save_deadline() {
        let now = Instant::now();
        assert_eq!(timeout_ms(None, now), 1000);
        assert_eq!(timeout_ms(Some(now + Duration::from_millis(250)), now), 250);
        assert_eq!(timeout_ms(Some(now + Duration::from_micros(1)), now), 1);
        assert_eq!(timeout_ms(Some(now), now + Duration::from_secs(1)), 0);
        assert_eq!(timeout_ms(Some(now + Duration::from_secs(15)), now), 1000);
    }
}

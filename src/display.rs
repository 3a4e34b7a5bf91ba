//! Live output enumeration

use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, warn};
use x11rb::protocol::randr::{ConnectionExt as RandrExt, NotifyMask};

use crate::screen::DisplayInfo;
use crate::x11_utils::{atom_name, X11Context};

/// Anything that can report the outputs currently attached
pub trait DisplaySource {
    fn displays(&self) -> Result<Vec<DisplayInfo>>;
}

/// RandR 1.5 monitor list of the default screen
pub struct RandrDisplays {
    ctx: Rc<X11Context>,
}

impl RandrDisplays {
    pub fn new(ctx: Rc<X11Context>) -> Self {
        Self { ctx }
    }

    /// Ask the server for screen/output/CRTC change notifications
    pub fn select_change_events(&self) -> Result<()> {
        self.ctx
            .conn
            .randr_select_input(
                self.ctx.root(),
                NotifyMask::SCREEN_CHANGE | NotifyMask::OUTPUT_CHANGE | NotifyMask::CRTC_CHANGE,
            )
            .context("Failed to subscribe to RandR change notifications")?;
        Ok(())
    }
}

impl DisplaySource for RandrDisplays {
    fn displays(&self) -> Result<Vec<DisplayInfo>> {
        let reply = self
            .ctx
            .conn
            .randr_get_monitors(self.ctx.root(), true)
            .context("Failed to query RandR monitors")?
            .reply()
            .context("Failed to get RandR monitors reply")?;

        let mut displays = Vec::with_capacity(reply.monitors.len());
        for monitor in reply.monitors {
            let name = match atom_name(&self.ctx.conn, monitor.name) {
                Ok(name) if !name.is_empty() => name,
                Ok(_) => {
                    warn!(atom = monitor.name, "Skipping monitor with empty name");
                    continue;
                }
                Err(e) => {
                    warn!(atom = monitor.name, error = %e, "Skipping monitor with unreadable name");
                    continue;
                }
            };
            debug!(
                monitor = %name,
                x = monitor.x,
                y = monitor.y,
                width = monitor.width,
                height = monitor.height,
                primary = monitor.primary,
                "Found monitor"
            );
            displays.push(DisplayInfo::new(
                name,
                i32::from(monitor.x),
                i32::from(monitor.y),
                u32::from(monitor.width),
                u32::from(monitor.height),
            ));
        }
        Ok(displays)
    }
}

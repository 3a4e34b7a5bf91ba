//! Overlay windows: one borderless black click-through window per record
//!
//! The controller only sees the [`OverlayWindow`] and [`OverlayFactory`]
//! traits. The X11 implementation lives here too; tests use an in-memory one.

use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use x11rb::connection::Connection;
use x11rb::protocol::shape::{ConnectionExt as ShapeExt, SK, SO};
use x11rb::protocol::xproto::*;
use x11rb::wrapper::ConnectionExt as WrapperExt;

use crate::constants::x11;
use crate::types::Rect;
use crate::x11_utils::{opacity_to_cardinal, window_geometry, X11Context};

/// A rendered dimming region.
///
/// Implementations must ignore pointer input entirely and stay above normal
/// windows. `owner` is the name of the record the overlay renders.
pub trait OverlayWindow {
    fn owner(&self) -> &str;
    fn set_geometry(&mut self, rect: Rect) -> Result<()>;
    fn set_opacity(&mut self, opacity: f64) -> Result<()>;
    fn set_visible(&mut self, visible: bool) -> Result<()>;
    /// Release the native window; the overlay is gone afterwards
    fn destroy(self: Box<Self>) -> Result<()>;
}

/// Creates overlays, initially hidden
pub trait OverlayFactory {
    fn create(&self, owner: &str, rect: Rect, opacity: f64) -> Result<Box<dyn OverlayWindow>>;
}

pub struct X11OverlayFactory {
    ctx: Rc<X11Context>,
}

impl X11OverlayFactory {
    pub fn new(ctx: Rc<X11Context>) -> Self {
        Self { ctx }
    }
}

impl OverlayFactory for X11OverlayFactory {
    fn create(&self, owner: &str, rect: Rect, opacity: f64) -> Result<Box<dyn OverlayWindow>> {
        Ok(Box::new(X11Overlay::new(Rc::clone(&self.ctx), owner, rect, opacity)?))
    }
}

pub struct X11Overlay {
    owner: String,
    window: Window,
    visible: bool,
    ctx: Rc<X11Context>,
}

impl X11Overlay {
    fn create_window(ctx: &X11Context, owner: &str, rect: &Rect) -> Result<Window> {
        let (x, y, width, height) = window_geometry(rect)
            .context(format!("Invalid overlay geometry for '{owner}'"))?;
        let screen = ctx.screen();
        let window = ctx
            .conn
            .generate_id()
            .context("Failed to generate X11 window ID")?;
        ctx.conn
            .create_window(
                screen.root_depth,
                window,
                screen.root,
                x,
                y,
                width,
                height,
                0,
                WindowClass::INPUT_OUTPUT,
                screen.root_visual,
                &CreateWindowAux::new()
                    .override_redirect(x11::OVERRIDE_REDIRECT)
                    .background_pixel(screen.black_pixel),
            )
            .context(format!("Failed to create overlay window for '{owner}'"))?;
        Ok(window)
    }

    /// WM_CLASS, always-on-top, dock type and the empty input region
    fn setup_window_properties(ctx: &X11Context, window: Window, owner: &str) -> Result<()> {
        ctx.conn
            .change_property8(
                PropMode::REPLACE,
                window,
                AtomEnum::WM_CLASS,
                AtomEnum::STRING,
                x11::WM_CLASS,
            )
            .context(format!("Failed to set WM_CLASS for '{owner}'"))?;

        ctx.conn
            .change_property32(
                PropMode::REPLACE,
                window,
                ctx.atoms.net_wm_state,
                AtomEnum::ATOM,
                &[ctx.atoms.net_wm_state_above],
            )
            .context(format!("Failed to set always-on-top for '{owner}'"))?;

        ctx.conn
            .change_property32(
                PropMode::REPLACE,
                window,
                ctx.atoms.net_wm_window_type,
                AtomEnum::ATOM,
                &[ctx.atoms.net_wm_window_type_dock],
            )
            .context(format!("Failed to set window type for '{owner}'"))?;

        // Empty input shape: every click falls through to the window below
        ctx.conn
            .shape_rectangles(SO::SET, SK::INPUT, ClipOrdering::UNSORTED, window, 0, 0, &[])
            .context(format!("Failed to make overlay for '{owner}' click-through"))?;

        Ok(())
    }

    pub fn new(ctx: Rc<X11Context>, owner: &str, rect: Rect, opacity: f64) -> Result<Self> {
        let window = Self::create_window(&ctx, owner, &rect)?;

        // Destroys the window if any later setup step fails
        struct WindowGuard<'a> {
            ctx: &'a X11Context,
            window: Window,
            owner: &'a str,
            should_cleanup: bool,
        }

        impl Drop for WindowGuard<'_> {
            fn drop(&mut self) {
                if self.should_cleanup {
                    if let Err(e) = self.ctx.conn.destroy_window(self.window) {
                        error!(window = self.window, owner = %self.owner, error = %e, "Failed to clean up overlay after initialization failure");
                    }
                    let _ = self.ctx.conn.flush();
                }
            }
        }

        let mut guard = WindowGuard {
            ctx: &ctx,
            window,
            owner,
            should_cleanup: true,
        };

        Self::setup_window_properties(&ctx, window, owner)?;
        let mut overlay = Self {
            owner: owner.to_string(),
            window,
            visible: false,
            ctx: Rc::clone(&ctx),
        };
        overlay.set_opacity(opacity)?;

        guard.should_cleanup = false;
        info!(window = window, owner = %owner, rect = ?rect, "Created overlay window");
        Ok(overlay)
    }
}

impl OverlayWindow for X11Overlay {
    fn owner(&self) -> &str {
        &self.owner
    }

    fn set_geometry(&mut self, rect: Rect) -> Result<()> {
        let (x, y, width, height) = window_geometry(&rect)
            .context(format!("Invalid overlay geometry for '{}'", self.owner))?;
        self.ctx
            .conn
            .configure_window(
                self.window,
                &ConfigureWindowAux::new()
                    .x(i32::from(x))
                    .y(i32::from(y))
                    .width(u32::from(width))
                    .height(u32::from(height)),
            )
            .context(format!("Failed to move overlay for '{}' to {:?}", self.owner, rect))?;
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after overlay move")?;
        Ok(())
    }

    fn set_opacity(&mut self, opacity: f64) -> Result<()> {
        self.ctx
            .conn
            .change_property32(
                PropMode::REPLACE,
                self.window,
                self.ctx.atoms.net_wm_window_opacity,
                AtomEnum::CARDINAL,
                &[opacity_to_cardinal(opacity)],
            )
            .context(format!("Failed to set overlay opacity for '{}'", self.owner))?;
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after opacity change")?;
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> Result<()> {
        if visible == self.visible {
            return Ok(());
        }
        if visible {
            self.ctx
                .conn
                .map_window(self.window)
                .context(format!("Failed to map overlay for '{}'", self.owner))?;
            // Raise over anything mapped since the overlay was created
            self.ctx
                .conn
                .configure_window(
                    self.window,
                    &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
                )
                .context(format!("Failed to raise overlay for '{}'", self.owner))?;
        } else {
            self.ctx
                .conn
                .unmap_window(self.window)
                .context(format!("Failed to unmap overlay for '{}'", self.owner))?;
        }
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after visibility change")?;
        self.visible = visible;
        debug!(owner = %self.owner, visible = visible, "Overlay visibility changed");
        Ok(())
    }

    fn destroy(mut self: Box<Self>) -> Result<()> {
        let window = std::mem::replace(&mut self.window, x11rb::NONE);
        self.ctx
            .conn
            .destroy_window(window)
            .context(format!("Failed to destroy overlay for '{}'", self.owner))?;
        self.ctx
            .conn
            .flush()
            .context("Failed to flush X11 connection after overlay destroy")?;
        debug!(window = window, owner = %self.owner, "Destroyed overlay window");
        Ok(())
    }
}

impl Drop for X11Overlay {
    fn drop(&mut self) {
        if self.window == x11rb::NONE {
            return;
        }
        if let Err(e) = self.ctx.conn.destroy_window(self.window) {
            error!(window = self.window, owner = %self.owner, error = %e, "Failed to destroy overlay window");
        }
        if let Err(e) = self.ctx.conn.flush() {
            error!(error = %e, "Failed to flush X11 connection during overlay cleanup");
        }
    }
}

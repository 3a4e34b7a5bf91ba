use anyhow::{Context, Result};
use tracing::info;
use x11rb::connection::Connection;
use x11rb::protocol::randr::ConnectionExt as RandrExt;
use x11rb::protocol::shape::ConnectionExt as ShapeExt;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11;
use crate::types::Rect;

/// Connection plus everything looked up once at startup
pub struct X11Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub atoms: CachedAtoms,
}

impl X11Context {
    /// Connect to the display named by `$DISPLAY` and check required extensions
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;

        let randr = conn
            .randr_query_version(1, 5)
            .context("Failed to query RandR version")?
            .reply()
            .context("RandR extension not available")?;
        if (randr.major_version, randr.minor_version) < (1, 5) {
            anyhow::bail!(
                "RandR 1.5 required for monitor enumeration, server has {}.{}",
                randr.major_version,
                randr.minor_version
            );
        }
        conn.shape_query_version()
            .context("Failed to query SHAPE version")?
            .reply()
            .context("SHAPE extension not available (needed for click-through overlays)")?;

        let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms at startup")?;
        let ctx = Self {
            conn,
            screen_num,
            atoms,
        };
        let screen = ctx.screen();
        info!(
            screen = screen_num,
            width = screen.width_in_pixels,
            height = screen.height_in_pixels,
            randr = %format!("{}.{}", randr.major_version, randr.minor_version),
            "Connected to X11 server"
        );
        Ok(ctx)
    }

    pub fn screen(&self) -> &Screen {
        &self.conn.setup().roots[self.screen_num]
    }

    pub fn root(&self) -> Window {
        self.screen().root
    }
}

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub net_wm_window_opacity: Atom,
    pub net_wm_state: Atom,
    pub net_wm_state_above: Atom,
    pub net_wm_window_type: Atom,
    pub net_wm_window_type_dock: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn
                .intern_atom(false, name.as_bytes())
                .context(format!("Failed to intern {name} atom"))?
                .reply()
                .context(format!("Failed to get reply for {name} atom"))?
                .atom)
        };
        Ok(Self {
            net_wm_window_opacity: intern("_NET_WM_WINDOW_OPACITY")?,
            net_wm_state: intern("_NET_WM_STATE")?,
            net_wm_state_above: intern("_NET_WM_STATE_ABOVE")?,
            net_wm_window_type: intern("_NET_WM_WINDOW_TYPE")?,
            net_wm_window_type_dock: intern("_NET_WM_WINDOW_TYPE_DOCK")?,
        })
    }
}

/// Map a 0..1 opacity onto the `_NET_WM_WINDOW_OPACITY` cardinal range
pub fn opacity_to_cardinal(opacity: f64) -> u32 {
    let clamped = if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) };
    (clamped * f64::from(x11::OPAQUE)).round() as u32
}

/// X11 window geometry for a record rectangle.
///
/// Core protocol coordinates are 16-bit and windows cannot be empty, so
/// zero-sized rectangles become 1x1.
pub fn window_geometry(rect: &Rect) -> Result<(i16, i16, u16, u16)> {
    let x = i16::try_from(rect.origin.x)
        .context(format!("x = {} does not fit X11 coordinates", rect.origin.x))?;
    let y = i16::try_from(rect.origin.y)
        .context(format!("y = {} does not fit X11 coordinates", rect.origin.y))?;
    let width = u16::try_from(rect.size.width.max(1))
        .context(format!("width = {} does not fit X11 dimensions", rect.size.width))?;
    let height = u16::try_from(rect.size.height.max(1))
        .context(format!("height = {} does not fit X11 dimensions", rect.size.height))?;
    Ok((x, y, width, height))
}

/// Read an atom's name, lossily decoded
pub fn atom_name(conn: &RustConnection, atom: Atom) -> Result<String> {
    let reply = conn
        .get_atom_name(atom)
        .context(format!("Failed to query name of atom {atom}"))?
        .reply()
        .context(format!("Failed to get name reply for atom {atom}"))?;
    Ok(String::from_utf8_lossy(&reply.name).into_owned())
}

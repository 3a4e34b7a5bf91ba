//! Screen records: one dimmable region each, physical or aggregate
//!
//! A record is plain data. The overlay window that renders it is owned by the
//! controller and keyed by the record's `name`, which is also the join key
//! used when reconciling against live outputs.

use crate::constants::{aggregate, bounds, opacity};
use crate::error::FieldError;
use crate::types::{Dimensions, Position, Rect};

/// One physical output as reported by the display server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayInfo {
    pub name: String,
    pub rect: Rect,
}

impl DisplayInfo {
    pub fn new(name: impl Into<String>, x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            rect: Rect::new(x, y, width, height),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenRecord {
    /// Output name, stable across sessions
    pub name: String,
    /// Label number ("Screen N"); 0 is reserved for the aggregate
    pub index: u32,
    pub origin: Position,
    pub resolution: Dimensions,
    pub opacity: f64,
    /// Participates in the current display mode
    pub enabled: bool,
    /// User wants this region dimmed
    pub shown: bool,
}

impl ScreenRecord {
    /// Record for a display seen for the first time
    pub fn detected(display: &DisplayInfo, index: u32, enabled: bool) -> Self {
        Self {
            name: display.name.clone(),
            index,
            origin: display.rect.origin,
            resolution: display.rect.size,
            opacity: opacity::DEFAULT,
            enabled,
            shown: false,
        }
    }

    /// The synthetic aggregate region with default settings
    pub fn aggregate(rect: Rect) -> Self {
        Self {
            name: aggregate::NAME.to_string(),
            index: aggregate::INDEX,
            origin: rect.origin,
            resolution: rect.size,
            opacity: opacity::DEFAULT,
            enabled: false,
            shown: false,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        self.name == aggregate::NAME
    }

    pub fn rect(&self) -> Rect {
        Rect {
            origin: self.origin,
            size: self.resolution,
        }
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.origin = rect.origin;
        self.resolution = rect.size;
    }

    pub fn is_visible(&self) -> bool {
        self.enabled && self.shown
    }

    /// "Screen N" label as shown to the user
    pub fn label(&self) -> String {
        if self.is_aggregate() {
            "Dimmer Options".to_string()
        } else {
            format!("Screen {}", self.index)
        }
    }
}

/// Clamp an opacity into the supported range.
///
/// NaN has no meaningful position in the range and maps to the minimum.
pub fn clamp_opacity(value: f64) -> f64 {
    if value.is_nan() {
        opacity::MIN
    } else {
        value.clamp(opacity::MIN, opacity::MAX)
    }
}

fn check_range(field: &'static str, value: i64, min: i64, max: i64) -> Result<i64, FieldError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(FieldError::OutOfBounds {
            field,
            value,
            min,
            max,
        })
    }
}

pub fn check_origin_x(field: &'static str, value: i64) -> Result<i32, FieldError> {
    check_range(
        field,
        value,
        i64::from(bounds::MIN_ORIGIN_X),
        i64::from(bounds::MAX_ORIGIN_X),
    )
    .map(|v| v as i32)
}

pub fn check_origin_y(field: &'static str, value: i64) -> Result<i32, FieldError> {
    check_range(
        field,
        value,
        i64::from(bounds::MIN_ORIGIN_Y),
        i64::from(bounds::MAX_ORIGIN_Y),
    )
    .map(|v| v as i32)
}

pub fn check_resolution(field: &'static str, value: i64) -> Result<u32, FieldError> {
    check_range(
        field,
        value,
        i64::from(bounds::MIN_RESOLUTION),
        i64::from(bounds::MAX_RESOLUTION),
    )
    .map(|v| v as u32)
}

/// Check a whole rectangle against the engine bounds
pub fn check_rect(rect: &Rect) -> Result<(), FieldError> {
    check_origin_x("originX", i64::from(rect.origin.x))?;
    check_origin_y("originY", i64::from(rect.origin.y))?;
    check_resolution("resX", i64::from(rect.size.width))?;
    check_resolution("resY", i64::from(rect.size.height))?;
    Ok(())
}

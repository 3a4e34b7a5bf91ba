//! Dimmer controller: sole owner of the record set, mode flag and overlays
//!
//! Every state change goes through here. Operations take the current time
//! explicitly so the debounce timer can be driven by the event loop (and by
//! tests) without reading a clock.

use std::collections::HashMap;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::constants::{aggregate, bounds, persistence};
use crate::display::DisplaySource;
use crate::error::{ControlError, SaveError};
use crate::overlay::{OverlayFactory, OverlayWindow};
use crate::reconcile::reconcile;
use crate::scheduler::SaveScheduler;
use crate::screen::{clamp_opacity, ScreenRecord};
use crate::settings::{GlobalOptions, SettingsStore};
use crate::types::{Dimensions, Position, Rect};

/// Read-only view of one record, as reported to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenStatus {
    pub name: String,
    pub label: String,
    pub index: u32,
    pub origin: Position,
    pub resolution: Dimensions,
    pub opacity: f64,
    pub enabled: bool,
    pub shown: bool,
    pub visible: bool,
    pub connected: bool,
}

/// Read-only view of the whole controller state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub separate_screens: bool,
    /// Number of outputs attached right now
    pub connected: usize,
    pub save_pending: bool,
    pub basic: ScreenStatus,
    pub screens: Vec<ScreenStatus>,
}

/// What a detection pass changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectReport {
    pub connected: usize,
    pub added: Vec<String>,
    pub patched: Vec<String>,
}

/// Aggregate rectangle for a bounding box, clamped into the engine bounds
fn fit_aggregate(bbox: Rect) -> Rect {
    Rect::new(
        bbox.origin.x.clamp(bounds::MIN_ORIGIN_X, bounds::MAX_ORIGIN_X),
        bbox.origin.y.clamp(bounds::MIN_ORIGIN_Y, bounds::MAX_ORIGIN_Y),
        bbox.size.width.min(bounds::MAX_RESOLUTION),
        bbox.size.height.min(bounds::MAX_RESOLUTION),
    )
}

pub struct DimmerController<F: OverlayFactory, D: DisplaySource> {
    factory: F,
    displays: D,
    store: SettingsStore,
    scheduler: SaveScheduler,
    options: GlobalOptions,
    basic: ScreenRecord,
    screens: Vec<ScreenRecord>,
    /// Names of the outputs seen in the latest detection
    connected: Vec<String>,
    /// Overlay per record, keyed by record name
    overlays: HashMap<String, Box<dyn OverlayWindow>>,
}

impl<F: OverlayFactory, D: DisplaySource> DimmerController<F, D> {
    /// Load settings, reconcile them against the live outputs and create the
    /// overlays.
    ///
    /// A missing, empty or rejected document falls back to defaults built from
    /// the live outputs, which are written out right away.
    pub fn start(factory: F, displays: D, store: SettingsStore, now: Instant) -> Result<Self> {
        let live = displays
            .displays()
            .context("Failed to enumerate displays at startup")?;

        let loaded = match store.load() {
            Ok(loaded) => loaded,
            Err(e) => {
                error!(path = %store.path().display(), error = %e, kind = ?e.kind(), "Discarding settings, falling back to defaults");
                None
            }
        };
        let fallback = loaded.is_none();

        let (options, mut basic, stored, skipped) = match loaded {
            Some(l) => (l.options, l.basic, l.screens, l.skipped.len()),
            None => (
                GlobalOptions::default(),
                ScreenRecord::aggregate(Rect::default()),
                Vec::new(),
                0,
            ),
        };

        let rec = reconcile(&live, stored, options.separate_screens);
        let dirty = rec.aggregate_dirty();
        let old_basic = basic.rect();
        // With nothing connected there is no bounding box to fit
        if !rec.connected.is_empty() {
            basic.set_rect(fit_aggregate(rec.bounds));
        }

        let mut controller = Self {
            factory,
            displays,
            store,
            scheduler: SaveScheduler::new(persistence::QUIET_PERIOD),
            options,
            basic,
            screens: rec.records,
            connected: rec.connected,
            overlays: HashMap::new(),
        };
        controller.apply_mode();
        controller.sync_overlays()?;

        info!(
            screens = controller.screens.len(),
            connected = controller.connected.len(),
            separate = controller.options.separate_screens,
            aggregate = ?controller.basic.rect(),
            "Dimmer started"
        );

        if fallback {
            if let Err(e) = controller.save_now() {
                error!(error = %e, "Failed to write default settings");
            }
        } else if skipped > 0 || dirty || old_basic != controller.basic.rect() {
            controller.scheduler.trigger(now);
        }
        Ok(controller)
    }

    // ==========================================================================
    // Queries
    // ==========================================================================

    pub fn options(&self) -> GlobalOptions {
        self.options
    }

    pub fn basic(&self) -> &ScreenRecord {
        &self.basic
    }

    pub fn screens(&self) -> &[ScreenRecord] {
        &self.screens
    }

    /// Deadline of the pending save, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduler.deadline()
    }

    pub fn save_pending(&self) -> bool {
        self.scheduler.is_pending()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            separate_screens: self.options.separate_screens,
            connected: self.connected.len(),
            save_pending: self.scheduler.is_pending(),
            basic: self.status(&self.basic),
            screens: self.screens.iter().map(|s| self.status(s)).collect(),
        }
    }

    fn status(&self, record: &ScreenRecord) -> ScreenStatus {
        let connected = if record.is_aggregate() {
            !self.connected.is_empty()
        } else {
            self.connected.contains(&record.name)
        };
        ScreenStatus {
            name: record.name.clone(),
            label: record.label(),
            index: record.index,
            origin: record.origin,
            resolution: record.resolution,
            opacity: record.opacity,
            enabled: record.enabled,
            shown: record.shown,
            visible: record.is_visible(),
            connected,
        }
    }

    // ==========================================================================
    // Mutations
    // ==========================================================================

    pub fn set_mode(&mut self, separate: bool, now: Instant) -> Result<(), ControlError> {
        if self.options.separate_screens != separate {
            info!(separate = separate, "Switching display mode");
        }
        self.options.separate_screens = separate;
        self.apply_mode();
        self.scheduler.trigger(now);
        self.apply_visibility()?;
        Ok(())
    }

    /// Set a record's opacity; returns the clamped value actually applied
    pub fn set_opacity(&mut self, name: &str, value: f64, now: Instant) -> Result<f64, ControlError> {
        let clamped = clamp_opacity(value);
        let record = self
            .record_mut(name)
            .ok_or_else(|| ControlError::UnknownScreen(name.to_string()))?;
        record.opacity = clamped;
        if clamped != value {
            debug!(screen = %name, requested = value, applied = clamped, "Opacity clamped");
        }
        self.scheduler.trigger(now);
        if let Some(overlay) = self.overlays.get_mut(name) {
            overlay.set_opacity(clamped)?;
        }
        Ok(clamped)
    }

    /// Show or hide a record's overlay.
    ///
    /// Not persisted on its own; the flag is written with the next save.
    pub fn set_shown(&mut self, name: &str, shown: bool) -> Result<(), ControlError> {
        let record = self
            .record_mut(name)
            .ok_or_else(|| ControlError::UnknownScreen(name.to_string()))?;
        record.shown = shown;
        let visible = record.is_visible();
        if shown && !visible {
            debug!(screen = %name, "Record shown but not enabled in the current mode");
        }
        if let Some(overlay) = self.overlays.get_mut(name) {
            overlay.set_visible(visible)?;
        }
        Ok(())
    }

    /// Re-read the live outputs and fold them into the current records
    pub fn detect_screens(&mut self, now: Instant) -> Result<DetectReport, ControlError> {
        let live = self
            .displays
            .displays()
            .context("Failed to enumerate displays")?;
        let rec = reconcile(
            &live,
            std::mem::take(&mut self.screens),
            self.options.separate_screens,
        );
        if rec.aggregate_dirty() {
            self.basic.set_rect(fit_aggregate(rec.bounds));
            debug!(aggregate = ?self.basic.rect(), "Aggregate region recomputed");
        }
        let report = DetectReport {
            connected: rec.connected.len(),
            added: rec.added,
            patched: rec.patched,
        };
        self.screens = rec.records;
        self.connected = rec.connected;
        self.apply_mode();
        self.scheduler.trigger(now);
        self.sync_overlays()?;

        info!(
            connected = report.connected,
            added = report.added.len(),
            patched = report.patched.len(),
            "Screen detection finished"
        );
        Ok(report)
    }

    /// Forget every per-screen record and rebuild them from the live outputs.
    ///
    /// The mode and the aggregate's opacity and shown flag are kept.
    pub fn reset_to_defaults(&mut self, now: Instant) -> Result<DetectReport, ControlError> {
        let live = self
            .displays
            .displays()
            .context("Failed to enumerate displays")?;

        for record in self.screens.drain(..) {
            if let Some(overlay) = self.overlays.remove(&record.name)
                && let Err(e) = overlay.destroy()
            {
                warn!(screen = %record.name, error = %e, "Failed to destroy overlay during reset");
            }
        }

        let rec = reconcile(&live, Vec::new(), self.options.separate_screens);
        if !rec.connected.is_empty() {
            self.basic.set_rect(fit_aggregate(rec.bounds));
        }
        let report = DetectReport {
            connected: rec.connected.len(),
            added: rec.added,
            patched: rec.patched,
        };
        self.screens = rec.records;
        self.connected = rec.connected;
        self.apply_mode();
        self.scheduler.trigger(now);
        self.sync_overlays()?;

        info!(screens = self.screens.len(), "Settings reset to defaults");
        Ok(report)
    }

    // ==========================================================================
    // Persistence
    // ==========================================================================

    /// Write the settings right away, dropping any pending debounced save
    pub fn save_now(&mut self) -> Result<(), ControlError> {
        self.scheduler.cancel();
        self.store
            .save(&self.options, &self.basic, &self.screens)
            .inspect_err(|e| error!(error = %e, "Failed to save settings"))?;
        Ok(())
    }

    /// Run the debounced save if its deadline has passed
    pub fn poll_save(&mut self, now: Instant) -> Option<Result<(), SaveError>> {
        let result = self
            .scheduler
            .poll(now, || self.store.save(&self.options, &self.basic, &self.screens));
        if let Some(Err(e)) = &result {
            error!(error = %e, "Debounced save failed");
        }
        result
    }

    /// Flush (or discard) the pending save and tear down every overlay
    pub fn shutdown(mut self, flush: bool) -> Option<Result<(), SaveError>> {
        let result = if flush {
            self.scheduler
                .flush(|| self.store.save(&self.options, &self.basic, &self.screens))
        } else {
            if self.scheduler.is_pending() {
                info!("Discarding unsaved changes");
            }
            self.scheduler.cancel();
            None
        };
        if let Some(Err(e)) = &result {
            error!(error = %e, "Failed to save settings on shutdown");
        }

        for overlay in self.overlays.into_values() {
            let owner = overlay.owner().to_string();
            if let Err(e) = overlay.destroy() {
                warn!(screen = %owner, error = %e, "Failed to destroy overlay on shutdown");
            }
        }
        info!("Dimmer stopped");
        result
    }

    // ==========================================================================
    // Internals
    // ==========================================================================

    fn record_mut(&mut self, name: &str) -> Option<&mut ScreenRecord> {
        if name == aggregate::NAME {
            Some(&mut self.basic)
        } else {
            self.screens.iter_mut().find(|s| s.name == name)
        }
    }

    /// Recompute `enabled` for every record from the mode flag
    fn apply_mode(&mut self) {
        let separate = self.options.separate_screens;
        self.basic.enabled = !separate;
        for record in &mut self.screens {
            record.enabled = separate && self.connected.contains(&record.name);
        }
    }

    fn apply_visibility(&mut self) -> Result<()> {
        for record in std::iter::once(&self.basic).chain(&self.screens) {
            if let Some(overlay) = self.overlays.get_mut(&record.name) {
                overlay.set_visible(record.is_visible())?;
            }
        }
        Ok(())
    }

    /// Create missing overlays and push geometry, opacity and visibility
    fn sync_overlays(&mut self) -> Result<()> {
        for record in std::iter::once(&self.basic).chain(&self.screens) {
            match self.overlays.get_mut(&record.name) {
                Some(overlay) => {
                    overlay.set_geometry(record.rect())?;
                    overlay.set_opacity(record.opacity)?;
                    overlay.set_visible(record.is_visible())?;
                }
                None => {
                    let mut overlay = self
                        .factory
                        .create(&record.name, record.rect(), record.opacity)
                        .context(format!("Failed to create overlay for '{}'", record.name))?;
                    overlay.set_visible(record.is_visible())?;
                    self.overlays.insert(record.name.clone(), overlay);
                }
            }
        }
        Ok(())
    }
}

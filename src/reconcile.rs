//! Topology reconciliation
//!
//! Matches the outputs the display server reports right now against the
//! screen records we already know about. Known outputs get their geometry
//! patched, unknown outputs get a fresh record, and records for outputs that
//! are not currently attached are kept (disabled) so their settings survive a
//! reconnect. Nothing is ever removed here; dropping records is an explicit
//! reset performed by the controller.

use tracing::{debug, info, warn};

use crate::screen::{check_rect, DisplayInfo, ScreenRecord};
use crate::types::{BoundingBox, Rect};

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Full record set: matched, patched, new and remembered-but-absent
    pub records: Vec<ScreenRecord>,
    /// Names of records backed by a live output, in live order
    pub connected: Vec<String>,
    /// Names of records created in this pass
    pub added: Vec<String>,
    /// Names of records whose geometry was updated in this pass
    pub patched: Vec<String>,
    /// Bounding box of every live output seen in this pass
    pub bounds: Rect,
}

impl Reconciliation {
    /// Whether the aggregate region must be recomputed from `bounds`
    pub fn aggregate_dirty(&self) -> bool {
        !self.added.is_empty() || !self.patched.is_empty()
    }

    pub fn is_connected(&self, name: &str) -> bool {
        self.connected.iter().any(|n| n == name)
    }
}

/// Smallest positive index not used by any record
fn next_free_index(records: &[ScreenRecord]) -> u32 {
    let mut candidate = 1;
    while records.iter().any(|r| r.index == candidate) {
        candidate += 1;
    }
    candidate
}

/// Reconcile live outputs against `existing` per-screen records.
///
/// `existing` must not contain the aggregate record. New records start
/// enabled only when running in separate-screens mode.
pub fn reconcile(
    live: &[DisplayInfo],
    existing: Vec<ScreenRecord>,
    separate_screens: bool,
) -> Reconciliation {
    let mut records = existing;
    let mut connected = Vec::with_capacity(live.len());
    let mut added = Vec::new();
    let mut patched = Vec::new();
    let mut bbox = BoundingBox::new();

    for output in live {
        if let Err(e) = check_rect(&output.rect) {
            warn!(output = %output.name, rect = ?output.rect, error = %e, "Ignoring output with out-of-range geometry");
            continue;
        }

        match records.iter_mut().find(|r| r.name == output.name) {
            Some(record) => {
                if record.rect() != output.rect {
                    info!(
                        screen = %record.name,
                        old = ?record.rect(),
                        new = ?output.rect,
                        "Output geometry changed, updating record"
                    );
                    record.set_rect(output.rect);
                    if !patched.contains(&record.name) {
                        patched.push(record.name.clone());
                    }
                }
            }
            None => {
                let index = next_free_index(&records);
                let record = ScreenRecord::detected(output, index, separate_screens);
                info!(
                    screen = %record.name,
                    index = index,
                    rect = ?output.rect,
                    "Detected new output"
                );
                added.push(record.name.clone());
                records.push(record);
            }
        }

        if !connected.contains(&output.name) {
            connected.push(output.name.clone());
        }
        bbox.include(&output.rect);
    }

    for record in records.iter_mut() {
        if !connected.contains(&record.name) {
            if record.enabled {
                debug!(screen = %record.name, "Output not attached, disabling record");
            }
            record.enabled = false;
        }
    }

    Reconciliation {
        records,
        connected,
        added,
        patched,
        bounds: bbox.to_rect(),
    }
}

//! Settings document: load, validate and atomically save
//!
//! The document is a small JSON file holding the global options, the
//! aggregate ("basic") screen and one entry per known output:
//!
//! ```json
//! {
//!   "options": { "separateScreens": false },
//!   "basicScreen": { "left": 0, "up": 0, "right": 3200, "down": 1080,
//!                    "opacity": 0.3, "enabled": true },
//!   "screen": [ { "name": "DP-1", "index": 1, "originX": 0, "originY": 0,
//!                 "resX": 1920, "resY": 1080, "opacity": 0.3, "enabled": false } ]
//! }
//! ```
//!
//! `right`/`down` are absolute coordinates, and every `enabled` key stores the
//! record's `shown` intent. Values are parsed by hand rather than through
//! derived `Deserialize` so each failure maps onto a field and a failure class.

use std::fs;
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::constants::aggregate;
use crate::error::{FieldError, LoadError, SaveError};
use crate::screen::{
    check_origin_x, check_origin_y, check_rect, check_resolution, clamp_opacity, ScreenRecord,
};
use crate::types::{Dimensions, Position};

/// Process-wide options stored alongside the screens
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub separate_screens: bool,
}

/// Result of a successful load
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSettings {
    pub options: GlobalOptions,
    pub basic: ScreenRecord,
    pub screens: Vec<ScreenRecord>,
    /// Screen entries that failed validation and were left out
    pub skipped: Vec<LoadError>,
}

// ==============================================================================
// Field extraction
// ==============================================================================

fn field<'a>(obj: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, FieldError> {
    obj.get(name)
        .ok_or(FieldError::MissingField { field: name })
}

/// Integer field that must fit an `i32`.
///
/// Accepts JSON integers and numeric strings. Fractional values are
/// malformed; integers too large for `i32` overflow.
fn int_field(obj: &Map<String, Value>, name: &'static str) -> Result<i64, FieldError> {
    let value = field(obj, name)?;
    let overflow = || FieldError::Overflow {
        field: name,
        found: value.to_string(),
    };
    let malformed = || FieldError::MalformedValue {
        field: name,
        found: value.to_string(),
    };

    let parsed = match value {
        Value::Number(n) => {
            if let Some(v) = n.as_i64() {
                v
            } else if n.is_u64() {
                return Err(overflow());
            } else {
                let f = n.as_f64().ok_or_else(malformed)?;
                if f.fract() == 0.0 && (f > f64::from(i32::MAX) || f < f64::from(i32::MIN)) {
                    return Err(overflow());
                }
                return Err(malformed());
            }
        }
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(v) => v,
            Err(e)
                if matches!(
                    e.kind(),
                    std::num::IntErrorKind::PosOverflow | std::num::IntErrorKind::NegOverflow
                ) =>
            {
                return Err(overflow());
            }
            Err(_) => return Err(malformed()),
        },
        _ => return Err(malformed()),
    };

    if i32::try_from(parsed).is_err() {
        return Err(overflow());
    }
    Ok(parsed)
}

fn bool_field(obj: &Map<String, Value>, name: &'static str) -> Result<bool, FieldError> {
    match field(obj, name)? {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Ok(false),
        other => Err(FieldError::MalformedValue {
            field: name,
            found: other.to_string(),
        }),
    }
}

/// Opacity field; out-of-range values are clamped rather than rejected
fn opacity_field(obj: &Map<String, Value>, name: &'static str) -> Result<f64, FieldError> {
    let value = field(obj, name)?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => {
            let clamped = clamp_opacity(v);
            if clamped != v {
                debug!(field = name, value = v, clamped = clamped, "Clamped opacity into range");
            }
            Ok(clamped)
        }
        _ => Err(FieldError::MalformedValue {
            field: name,
            found: value.to_string(),
        }),
    }
}

fn string_field(obj: &Map<String, Value>, name: &'static str) -> Result<String, FieldError> {
    match field(obj, name)? {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        other => Err(FieldError::MalformedValue {
            field: name,
            found: other.to_string(),
        }),
    }
}

fn object<'a>(value: &'a Value, name: &'static str) -> Result<&'a Map<String, Value>, FieldError> {
    value.as_object().ok_or_else(|| FieldError::MalformedValue {
        field: name,
        found: value.to_string(),
    })
}

// ==============================================================================
// Block parsers
// ==============================================================================

fn parse_options(root: &Map<String, Value>) -> Result<GlobalOptions, FieldError> {
    let options = object(field(root, "options")?, "options")?;
    Ok(GlobalOptions {
        separate_screens: bool_field(options, "separateScreens")?,
    })
}

fn parse_basic(root: &Map<String, Value>) -> Result<ScreenRecord, FieldError> {
    let basic = object(field(root, "basicScreen")?, "basicScreen")?;

    let left = check_origin_x("left", int_field(basic, "left")?)?;
    let up = check_origin_y("up", int_field(basic, "up")?)?;
    let width = check_resolution("right", int_field(basic, "right")? - i64::from(left))?;
    let height = check_resolution("down", int_field(basic, "down")? - i64::from(up))?;
    let opacity = opacity_field(basic, "opacity")?;
    let shown = bool_field(basic, "enabled")?;

    Ok(ScreenRecord {
        name: aggregate::NAME.to_string(),
        index: aggregate::INDEX,
        origin: Position::new(left, up),
        resolution: Dimensions::new(width, height),
        opacity,
        enabled: false,
        shown,
    })
}

fn parse_screen(entry: &Value) -> Result<ScreenRecord, FieldError> {
    let screen = object(entry, "screen")?;

    let name = string_field(screen, "name")?;
    if name == aggregate::NAME {
        return Err(FieldError::MalformedValue {
            field: "name",
            found: format!("reserved name '{name}'"),
        });
    }
    let index = int_field(screen, "index")?;
    if index < 1 {
        return Err(FieldError::OutOfBounds {
            field: "index",
            value: index,
            min: 1,
            max: i64::from(i32::MAX),
        });
    }
    let origin_x = check_origin_x("originX", int_field(screen, "originX")?)?;
    let origin_y = check_origin_y("originY", int_field(screen, "originY")?)?;
    let res_x = check_resolution("resX", int_field(screen, "resX")?)?;
    let res_y = check_resolution("resY", int_field(screen, "resY")?)?;
    let opacity = opacity_field(screen, "opacity")?;
    let shown = bool_field(screen, "enabled")?;

    Ok(ScreenRecord {
        name,
        index: index as u32,
        origin: Position::new(origin_x, origin_y),
        resolution: Dimensions::new(res_x, res_y),
        opacity,
        enabled: false,
        shown,
    })
}

/// Parse and validate a settings document.
///
/// Failures in `options` or `basicScreen` reject the whole document. A bad
/// screen entry (including a duplicate name or index) is skipped and reported
/// in [`LoadedSettings::skipped`].
pub fn parse(bytes: &[u8]) -> Result<LoadedSettings, LoadError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(LoadError::Empty);
    }
    let root: Value =
        serde_json::from_slice(bytes).map_err(|e| LoadError::Syntax(e.to_string()))?;
    let root = root.as_object().ok_or(LoadError::NotAnObject)?;
    if root.is_empty() {
        return Err(LoadError::Empty);
    }

    let options = parse_options(root).map_err(LoadError::Options)?;
    let basic = parse_basic(root).map_err(LoadError::BasicScreen)?;

    let entries: &[Value] = match root.get("screen") {
        None | Some(Value::Null) => &[],
        Some(Value::Array(items)) => items,
        Some(single) => std::slice::from_ref(single),
    };

    let mut screens: Vec<ScreenRecord> = Vec::with_capacity(entries.len());
    let mut skipped = Vec::new();
    for (position, entry) in entries.iter().enumerate() {
        let parsed = parse_screen(entry).and_then(|record| {
            if screens.iter().any(|s| s.name == record.name) {
                Err(FieldError::MalformedValue {
                    field: "name",
                    found: format!("duplicate name '{}'", record.name),
                })
            } else if screens.iter().any(|s| s.index == record.index) {
                Err(FieldError::MalformedValue {
                    field: "index",
                    found: format!("duplicate index {}", record.index),
                })
            } else {
                Ok(record)
            }
        });

        match parsed {
            Ok(record) => screens.push(record),
            Err(source) => {
                let err = LoadError::Screen { position, source };
                warn!(error = %err, "Skipping invalid screen entry");
                skipped.push(err);
            }
        }
    }

    Ok(LoadedSettings {
        options,
        basic,
        screens,
        skipped,
    })
}

// ==============================================================================
// Serialization
// ==============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OptionsBlock {
    separate_screens: bool,
}

#[derive(Serialize)]
struct BasicBlock {
    left: i32,
    up: i32,
    right: i64,
    down: i64,
    opacity: f64,
    enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScreenBlock<'a> {
    name: &'a str,
    index: u32,
    origin_x: i32,
    origin_y: i32,
    res_x: u32,
    res_y: u32,
    opacity: f64,
    enabled: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Document<'a> {
    options: OptionsBlock,
    basic_screen: BasicBlock,
    screen: Vec<ScreenBlock<'a>>,
}

/// Serialize the full settings document
pub fn to_bytes(
    options: &GlobalOptions,
    basic: &ScreenRecord,
    screens: &[ScreenRecord],
) -> Result<Vec<u8>, SaveError> {
    let rect = basic.rect();
    // A document the loader would reject must never reach the disk
    check_rect(&rect).map_err(SaveError::InvalidAggregate)?;
    let doc = Document {
        options: OptionsBlock {
            separate_screens: options.separate_screens,
        },
        basic_screen: BasicBlock {
            left: rect.origin.x,
            up: rect.origin.y,
            right: rect.right(),
            down: rect.bottom(),
            opacity: basic.opacity,
            enabled: basic.shown,
        },
        screen: screens
            .iter()
            .map(|s| ScreenBlock {
                name: &s.name,
                index: s.index,
                origin_x: s.origin.x,
                origin_y: s.origin.y,
                res_x: s.resolution.width,
                res_y: s.resolution.height,
                opacity: s.opacity,
                enabled: s.shown,
            })
            .collect(),
    };
    Ok(serde_json::to_vec_pretty(&doc)?)
}

// ==============================================================================
// Store
// ==============================================================================

/// Settings file at a fixed path
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document; `Ok(None)` means there is no file yet (first run)
    pub fn load(&self) -> Result<Option<LoadedSettings>, LoadError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let loaded = parse(&bytes)?;
                info!(
                    path = %self.path.display(),
                    screens = loaded.screens.len(),
                    skipped = loaded.skipped.len(),
                    "Loaded settings"
                );
                Ok(Some(loaded))
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!(path = %self.path.display(), "No settings file found");
                Ok(None)
            }
            Err(e) => Err(LoadError::Io {
                path: self.path.clone(),
                message: e.to_string(),
            }),
        }
    }

    /// Write the document atomically.
    ///
    /// The bytes go to a sibling temporary file which is synced and renamed
    /// over the target, so a reader sees either the old or the new document.
    pub fn save(
        &self,
        options: &GlobalOptions,
        basic: &ScreenRecord,
        screens: &[ScreenRecord],
    ) -> Result<(), SaveError> {
        let bytes = to_bytes(options, basic, screens)?;
        let io_err = |source| SaveError::Io {
            path: self.path.clone(),
            source,
        };

        let tmp_path = self.tmp_path();
        let written = (|| {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp_path, &self.path)
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(io_err(e));
        }

        info!(path = %self.path.display(), screens = screens.len(), "Saved settings");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::opacity;
    use crate::error::ErrorKind;
    use crate::types::Rect;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_screens() -> Vec<ScreenRecord> {
        vec![
            ScreenRecord {
                name: "DP-1".into(),
                index: 1,
                origin: Position::new(0, 0),
                resolution: Dimensions::new(1920, 1080),
                opacity: 0.45,
                enabled: false,
                shown: true,
            },
            ScreenRecord {
                name: "HDMI-1".into(),
                index: 2,
                origin: Position::new(-1280, -200),
                resolution: Dimensions::new(1280, 1024),
                opacity: 0.3,
                enabled: false,
                shown: false,
            },
        ]
    }

    fn sample_basic() -> ScreenRecord {
        let mut basic = ScreenRecord::aggregate(Rect::new(-1280, -200, 3200, 1280));
        basic.opacity = 0.6;
        basic.shown = true;
        basic
    }

    fn valid_doc() -> Value {
        json!({
            "options": { "separateScreens": true },
            "basicScreen": { "left": 0, "up": 0, "right": 3200, "down": 1080,
                             "opacity": 0.3, "enabled": true },
            "screen": [
                { "name": "DP-1", "index": 1, "originX": 0, "originY": 0,
                  "resX": 1920, "resY": 1080, "opacity": 0.5, "enabled": true },
                { "name": "HDMI-1", "index": 2, "originX": 1920, "originY": 0,
                  "resX": 1280, "resY": 1024, "opacity": 0.3, "enabled": false }
            ]
        })
    }

    fn parse_value(doc: &Value) -> Result<LoadedSettings, LoadError> {
        parse(doc.to_string().as_bytes())
    }

    #[test]
    fn test_round_trip() {
        let options = GlobalOptions {
            separate_screens: true,
        };
        let bytes = to_bytes(&options, &sample_basic(), &sample_screens()).unwrap();
        let loaded = parse(&bytes).unwrap();

        assert_eq!(loaded.options, options);
        assert_eq!(loaded.basic, sample_basic());
        assert_eq!(loaded.screens, sample_screens());
        assert!(loaded.skipped.is_empty());
    }

    #[test]
    fn test_basic_stores_absolute_edges() {
        let bytes = to_bytes(&GlobalOptions::default(), &sample_basic(), &[]).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["basicScreen"]["left"], -1280);
        assert_eq!(value["basicScreen"]["up"], -200);
        assert_eq!(value["basicScreen"]["right"], 1920);
        assert_eq!(value["basicScreen"]["down"], 1080);
        assert_eq!(value["options"]["separateScreens"], false);
        assert_eq!(value["screen"], json!([]));
    }

    #[test]
    fn test_valid_document() {
        let loaded = parse_value(&valid_doc()).unwrap();
        assert!(loaded.options.separate_screens);
        assert_eq!(loaded.basic.rect(), Rect::new(0, 0, 3200, 1080));
        assert!(loaded.basic.shown);
        assert_eq!(loaded.screens.len(), 2);
        assert!(loaded.screens[0].shown);
        assert!(loaded.screens.iter().all(|s| !s.enabled));
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse(b"").unwrap_err(), LoadError::Empty);
        assert_eq!(parse(b"  \n").unwrap_err(), LoadError::Empty);
        assert_eq!(parse(b"{}").unwrap_err(), LoadError::Empty);
    }

    #[test]
    fn test_syntax_error_is_malformed() {
        let err = parse(b"{ \"options\": ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
        assert_eq!(parse(b"[1, 2]").unwrap_err(), LoadError::NotAnObject);
    }

    #[test]
    fn test_missing_options_rejects_document() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("options");
        let err = parse_value(&doc).unwrap_err();
        assert_eq!(
            err,
            LoadError::Options(FieldError::MissingField { field: "options" })
        );
    }

    #[test]
    fn test_malformed_mode_flag() {
        let mut doc = valid_doc();
        doc["options"]["separateScreens"] = json!("sometimes");
        let err = parse_value(&doc).unwrap_err();
        assert!(matches!(err, LoadError::Options(_)));
        assert_eq!(err.kind(), ErrorKind::MalformedValue);
    }

    #[test]
    fn test_basic_out_of_bounds_rejects_document() {
        let mut doc = valid_doc();
        doc["basicScreen"]["right"] = json!(50_000);
        let err = parse_value(&doc).unwrap_err();
        assert!(matches!(err, LoadError::BasicScreen(_)));
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
    }

    #[test]
    fn test_basic_overflow() {
        let mut doc = valid_doc();
        doc["basicScreen"]["left"] = json!(99_999_999_999_i64);
        let err = parse_value(&doc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overflow);
    }

    #[test]
    fn test_screen_out_of_bounds_is_skipped() {
        let mut doc = valid_doc();
        doc["screen"][1]["resX"] = json!(999_999);
        let loaded = parse_value(&doc).unwrap();
        assert_eq!(loaded.screens.len(), 1);
        assert_eq!(loaded.screens[0].name, "DP-1");
        assert_eq!(loaded.skipped.len(), 1);
        assert_eq!(loaded.skipped[0].kind(), ErrorKind::OutOfBounds);
        assert!(matches!(
            &loaded.skipped[0],
            LoadError::Screen { position: 1, source } if source.field() == "resX"
        ));
    }

    #[test]
    fn test_screen_failure_classes() {
        let cases = [
            ("resY", Value::Null, ErrorKind::MalformedValue),
            ("originX", json!("12abc"), ErrorKind::MalformedValue),
            ("originX", json!(1.5), ErrorKind::MalformedValue),
            ("originY", json!("99999999999"), ErrorKind::Overflow),
            ("resX", json!(18_446_744_073_709_551_615_u64), ErrorKind::Overflow),
            ("originY", json!(-10_001), ErrorKind::OutOfBounds),
            ("index", json!(0), ErrorKind::OutOfBounds),
        ];
        for (key, value, kind) in cases {
            let mut doc = valid_doc();
            doc["screen"][0][key] = value.clone();
            let loaded = parse_value(&doc).unwrap();
            assert_eq!(loaded.skipped.len(), 1, "{key} = {value}");
            assert_eq!(loaded.skipped[0].kind(), kind, "{key} = {value}");
        }

        let mut doc = valid_doc();
        doc["screen"][0].as_object_mut().unwrap().remove("name");
        let loaded = parse_value(&doc).unwrap();
        assert_eq!(loaded.skipped[0].kind(), ErrorKind::MissingField);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let mut doc = valid_doc();
        doc["screen"][0]["originX"] = json!("-1920");
        doc["screen"][0]["enabled"] = json!("True");
        doc["screen"][0]["opacity"] = json!("0.25");
        let loaded = parse_value(&doc).unwrap();
        assert!(loaded.skipped.is_empty());
        assert_eq!(loaded.screens[0].origin.x, -1920);
        assert!(loaded.screens[0].shown);
        assert_eq!(loaded.screens[0].opacity, 0.25);
    }

    #[test]
    fn test_opacity_clamped_not_rejected() {
        let mut doc = valid_doc();
        doc["screen"][0]["opacity"] = json!(3.0);
        doc["screen"][1]["opacity"] = json!(-1.0);
        doc["basicScreen"]["opacity"] = json!(0.99);
        let loaded = parse_value(&doc).unwrap();
        assert!(loaded.skipped.is_empty());
        assert_eq!(loaded.screens[0].opacity, opacity::MAX);
        assert_eq!(loaded.screens[1].opacity, opacity::MIN);
        assert_eq!(loaded.basic.opacity, opacity::MAX);
    }

    #[test]
    fn test_duplicate_entries_skipped() {
        let mut doc = valid_doc();
        doc["screen"][1]["name"] = json!("DP-1");
        let loaded = parse_value(&doc).unwrap();
        assert_eq!(loaded.screens.len(), 1);
        assert_eq!(loaded.skipped.len(), 1);

        let mut doc = valid_doc();
        doc["screen"][1]["index"] = json!(1);
        let loaded = parse_value(&doc).unwrap();
        assert_eq!(loaded.screens.len(), 1);
    }

    #[test]
    fn test_reserved_name_skipped() {
        let mut doc = valid_doc();
        doc["screen"][0]["name"] = json!("basic");
        let loaded = parse_value(&doc).unwrap();
        assert_eq!(loaded.screens.len(), 1);
        assert_eq!(loaded.skipped[0].kind(), ErrorKind::MalformedValue);
    }

    #[test]
    fn test_missing_screen_list_is_empty() {
        let mut doc = valid_doc();
        doc.as_object_mut().unwrap().remove("screen");
        let loaded = parse_value(&doc).unwrap();
        assert!(loaded.screens.is_empty());
    }

    #[test]
    fn test_store_first_run_and_save() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        assert_eq!(store.load().unwrap(), None);

        let options = GlobalOptions {
            separate_screens: false,
        };
        store.save(&options, &sample_basic(), &sample_screens()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.options, options);
        assert_eq!(loaded.screens, sample_screens());
        assert!(!dir.path().join("settings.json.tmp").exists());
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(&path);
        store
            .save(&GlobalOptions::default(), &sample_basic(), &sample_screens())
            .unwrap();
        let before = fs::read(&path).unwrap();

        // A directory squatting on the temp path makes the write fail
        fs::create_dir(dir.path().join("settings.json.tmp")).unwrap();
        let result = store.save(
            &GlobalOptions {
                separate_screens: true,
            },
            &sample_basic(),
            &[],
        );
        assert!(matches!(result, Err(SaveError::Io { .. })));
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_unreadable_file_reports_io() {
        let dir = TempDir::new().unwrap();
        // Reading a directory fails with something other than NotFound
        let store = SettingsStore::new(dir.path());
        let err = store.load().unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(!err.to_string().contains("JSON"));
    }

    #[test]
    fn test_empty_aggregate_never_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(&path);
        store
            .save(&GlobalOptions::default(), &sample_basic(), &sample_screens())
            .unwrap();
        let before = fs::read(&path).unwrap();

        let empty = ScreenRecord::aggregate(Rect::default());
        let result = store.save(&GlobalOptions::default(), &empty, &sample_screens());
        assert!(matches!(result, Err(SaveError::InvalidAggregate(_))));
        assert_eq!(fs::read(&path).unwrap(), before);
        assert!(store.load().unwrap().is_some());
    }
}

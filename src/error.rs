//! Typed errors for settings validation, persistence and control requests

use std::path::PathBuf;

use thiserror::Error;

/// Failure class shared by every load error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingField,
    MalformedValue,
    Overflow,
    OutOfBounds,
    /// The file exists but could not be read
    Io,
}

/// A single field that failed validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },

    #[error("field `{field}` has a malformed value: {found}")]
    MalformedValue { field: &'static str, found: String },

    #[error("field `{field}` overflows its numeric type: {found}")]
    Overflow { field: &'static str, found: String },

    #[error("field `{field}` = {value} is outside [{min}, {max}]")]
    OutOfBounds {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

impl FieldError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField { .. } => ErrorKind::MissingField,
            Self::MalformedValue { .. } => ErrorKind::MalformedValue,
            Self::Overflow { .. } => ErrorKind::Overflow,
            Self::OutOfBounds { .. } => ErrorKind::OutOfBounds,
        }
    }

    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field }
            | Self::MalformedValue { field, .. }
            | Self::Overflow { field, .. }
            | Self::OutOfBounds { field, .. } => field,
        }
    }
}

/// Errors produced while loading the settings document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    #[error("settings document is empty")]
    Empty,

    #[error("failed to read settings from {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("settings document is not valid JSON: {0}")]
    Syntax(String),

    #[error("settings document root is not an object")]
    NotAnObject,

    #[error("invalid `options` block: {0}")]
    Options(FieldError),

    #[error("invalid `basicScreen` block: {0}")]
    BasicScreen(FieldError),

    #[error("invalid screen entry #{position}: {source}")]
    Screen {
        position: usize,
        #[source]
        source: FieldError,
    },
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty => ErrorKind::MissingField,
            Self::Io { .. } => ErrorKind::Io,
            Self::Syntax(_) | Self::NotAnObject => ErrorKind::MalformedValue,
            Self::Options(e) | Self::BasicScreen(e) => e.kind(),
            Self::Screen { source, .. } => source.kind(),
        }
    }
}

/// Errors produced while writing the settings document
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("refusing to save aggregate screen: {0}")]
    InvalidAggregate(FieldError),

    #[error("failed to write settings to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors returned by controller operations on behalf of the control surface
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no screen named '{0}'")]
    UnknownScreen(String),

    #[error(transparent)]
    Save(#[from] SaveError),

    #[error(transparent)]
    Platform(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_kind_and_field() {
        let err = FieldError::OutOfBounds {
            field: "resX",
            value: 999_999,
            min: 1,
            max: 10_000,
        };
        assert_eq!(err.kind(), ErrorKind::OutOfBounds);
        assert_eq!(err.field(), "resX");
        assert_eq!(
            err.to_string(),
            "field `resX` = 999999 is outside [1, 10000]"
        );
    }

    #[test]
    fn test_load_error_kind_follows_field() {
        let err = LoadError::Screen {
            position: 2,
            source: FieldError::Overflow {
                field: "originX",
                found: "99999999999".into(),
            },
        };
        assert_eq!(err.kind(), ErrorKind::Overflow);
        assert_eq!(LoadError::Empty.kind(), ErrorKind::MissingField);
        assert_eq!(LoadError::NotAnObject.kind(), ErrorKind::MalformedValue);
    }

    #[test]
    fn test_read_failure_is_not_a_syntax_error() {
        let err = LoadError::Io {
            path: PathBuf::from("/tmp/screendim.json"),
            message: "Permission denied (os error 13)".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(
            err.to_string(),
            "failed to read settings from /tmp/screendim.json: Permission denied (os error 13)"
        );
    }
}

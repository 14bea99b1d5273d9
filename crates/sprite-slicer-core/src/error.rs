use crate::model::SheetIssue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SlicerError {
    /// Global knob outside its valid range (not tied to a sheet).
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    /// Layout parameters inconsistent with one sheet; processing of that sheet aborts.
    #[error("Configuration error in sheet '{sheet}' ({parameter}): {message}")]
    Configuration {
        sheet: String,
        parameter: &'static str,
        message: String,
    },
    #[error("Content {width}x{height} exceeds canvas {canvas}x{canvas}")]
    ContentExceedsCanvas { width: u32, height: u32, canvas: u32 },
    #[error("No layout entry for sheet '{0}'")]
    UnknownSheet(String),
    /// Automatic detection found zero or an unexpected number of frames and the caller
    /// asked for that to be fatal.
    #[error("Degenerate detection in sheet '{sheet}': {issue}")]
    DegenerateDetection { sheet: String, issue: SheetIssue },
}

impl SlicerError {
    pub(crate) fn configuration(
        sheet: &str,
        parameter: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            sheet: sheet.to_string(),
            parameter,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SlicerError>;

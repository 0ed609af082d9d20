use thiserror::Error;

/// Failures the user can act on. Everything else travels as `anyhow::Error`.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Video file {0} not found.")]
    VideoNotFound(String),

    #[error("HDR format not recognized.")]
    UnrecognizedHdrFormat,

    #[error("Incorrect cropping values.")]
    InvalidCrop,

    #[error("Incorrect trim values.")]
    InvalidTrim,

    #[error("Required command(s) not found in PATH: {}", .0.join(", "))]
    MissingTools(Vec<&'static str>),

    #[error("{0} failed, see its log in the work directory (run with --verbose to keep it).")]
    ToolFailed(&'static str),

    #[error("No frames were measured.")]
    EmptyMeasurements,

    #[error("No Dolby Vision L1 metadata found in RPU.")]
    MissingL1,
}

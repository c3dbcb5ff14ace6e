//! Error types for tinysynth-synth.

use crate::render::ElementFormat;
use thiserror::Error;

/// Result type alias for tinysynth-synth operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tinysynth-synth.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (file operations).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration parameter.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// SoundFont loading or playback error.
    #[error("SoundFont error: {0}")]
    SoundFont(String),

    /// Render buffer has the wrong element type for its dimensionality.
    #[error("Incompatible buffer format for {rank}-dimensional buffer, must be {expected} (got {actual})")]
    BufferFormat {
        rank: usize,
        expected: ElementFormat,
        actual: ElementFormat,
    },

    /// Render buffer has the wrong rank, length or channel count.
    #[error("Incompatible buffer shape: {0}")]
    BufferShape(String),
}

//! Error types for the MIDI subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream could not be recognised as Standard MIDI File data.
    #[error("Could not load MIDI data: {0}")]
    Decode(String),
}

impl From<midly::Error> for Error {
    fn from(e: midly::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

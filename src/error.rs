//! Centralized error type for the tinysynth umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("MIDI: {0}")]
    Midi(#[from] tinysynth_midi::Error),

    #[error("Synth: {0}")]
    Synth(#[from] tinysynth_synth::Error),

    #[error("Invalid SoundFont id {0}")]
    UnknownSoundFont(usize),

    #[error("Invalid channel {0} (channel not assigned)")]
    ChannelUnassigned(u8),

    #[error("Invalid channel {0} (must be 0-15)")]
    InvalidChannel(u8),

    #[error("Bank {bank} preset {preset} does not match any instrument")]
    UnknownPreset { bank: u16, preset: u8 },

    #[error("Channel {0} cannot play drum presets (only channel 9 is percussion)")]
    PercussionChannel(u8),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! # tinysynth - SoundFont playback toolkit
//!
//! Umbrella crate tying together:
//! - **tinysynth-midi** - MIDI file decoding into time-ordered [`Timeline`]s
//! - **tinysynth-synth** - Render buffer contract and SoundFont engines
//!
//! and adding the [`Sequencer`] that plays timelines in step with rendered
//! audio, plus the multi-SoundFont [`Synth`] rack.
//!
//! ## Quick Start
//!
//! ```ignore
//! use tinysynth::prelude::*;
//!
//! let mut synth = Synth::new(SynthConfig::default())?;
//! synth.sfload("piano.sf2")?;
//!
//! let mut sequencer = Sequencer::new();
//! sequencer.load(&tinysynth::midi::load("song.mid")?);
//!
//! // One second of interleaved stereo float32, events placed on their frame
//! let pcm = synth.generate_with(&mut sequencer, 44100)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - SoundFont synthesis
//! - `soundfont` - [`Synth`] rack on RustySynth

/// Re-export of tinysynth-midi for direct access
pub use tinysynth_midi as midi;

/// Re-export of tinysynth-synth for direct access
pub use tinysynth_synth as engine;

pub use tinysynth_midi::{build_timeline, MidiEvent, MidiEventKind, MidiMessage, Timeline};
pub use tinysynth_synth::{
    render_into, OutputMode, RegionData, RenderPlan, RenderRegion, SynthConfig, SynthEngine,
};

pub mod error;
pub use error::{Error, Result};

mod sequencer;
pub use sequencer::{EventSink, Sequencer};

#[cfg(feature = "soundfont")]
mod synth;

#[cfg(feature = "soundfont")]
pub use synth::{ChannelProgram, SoundFontId, Synth, CHANNEL_COUNT, PERCUSSION_CHANNEL};

#[cfg(feature = "soundfont")]
pub use tinysynth_synth::SoundFontSynth;

pub mod prelude {
    pub use crate::{
        build_timeline, render_into, EventSink, MidiEvent, MidiEventKind, MidiMessage, OutputMode,
        RenderRegion, Sequencer, SynthConfig, SynthEngine, Timeline,
    };

    #[cfg(feature = "soundfont")]
    pub use crate::{SoundFontId, Synth};
}

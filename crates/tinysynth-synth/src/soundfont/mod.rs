//! SoundFont (.sf2) synthesis via RustySynth.
//!
//! Provides [`SoundFontSynth`], a [`SynthEngine`](crate::SynthEngine) for
//! MIDI-driven sample playback, and [`SoundFontLibrary`] for sharing loaded
//! SoundFonts between engines.

mod manager;
mod synthesizer;

pub use manager::{SoundFontHandle, SoundFontLibrary};
pub use synthesizer::SoundFontSynth;

//! MIDI subsystem for tinysynth.
//!
//! Decodes Standard MIDI Files into [`Timeline`]s: flat lists of
//! [`MidiEvent`]s in absolute seconds, each carrying the tempo in effect.
//!
//! ```ignore
//! let timeline = tinysynth_midi::build_timeline(&bytes)?;
//! for event in &timeline {
//!     println!("{:.3}s ch{} {:?}", event.time_seconds, event.channel, event.message);
//! }
//! ```

pub mod error;
pub use error::{Error, Result};

pub(crate) mod event;
pub use event::{MidiEvent, MidiEventKind, MidiMessage};

pub mod raw;
pub use raw::{RawMessage, RawSequence};

pub(crate) mod timeline;
pub use timeline::{build_timeline, load, Timeline, INITIAL_TEMPO_BPM};

#[cfg(test)]
pub(crate) mod test_support;

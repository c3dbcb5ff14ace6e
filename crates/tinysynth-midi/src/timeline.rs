//! MIDI timeline building
//!
//! Turns Standard MIDI File bytes into a flat, time-ordered list of
//! [`MidiEvent`]s in absolute seconds, each stamped with the tempo in effect.
//! The result is ready for a playback scheduler.

use crate::error::Result;
use crate::event::{MidiEvent, MidiEventKind, MidiMessage};
use crate::raw::{RawMessage, RawSequence};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Tempo reported on events that precede the first tempo meta event.
///
/// Kept at the historical value consumers were built against, not the SMF
/// default of 120 BPM.
pub const INITIAL_TEMPO_BPM: f64 = 10.0;

/// Ordered, immutable list of timeline events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "TimelineEvents")]
pub struct Timeline {
    events: Vec<MidiEvent>,
}

/// Serialized form; deserialized events are re-sorted.
#[derive(Deserialize)]
struct TimelineEvents {
    events: Vec<MidiEvent>,
}

impl From<TimelineEvents> for Timeline {
    fn from(serialized: TimelineEvents) -> Self {
        Self::from(serialized.events)
    }
}

/// Decode MIDI file bytes into a [`Timeline`].
///
/// Fails with [`Error::Decode`](crate::Error::Decode) on empty or malformed
/// input; nothing is returned in that case.
pub fn build_timeline(data: &[u8]) -> Result<Timeline> {
    let raw = RawSequence::parse(data)?;
    let timeline = Timeline::from_raw(raw);

    debug!(
        "Built MIDI timeline: {} events, duration {:.3}s",
        timeline.len(),
        timeline.duration_seconds()
    );

    Ok(timeline)
}

/// Read a MIDI file from disk and decode it.
pub fn load(path: impl AsRef<Path>) -> Result<Timeline> {
    let data = std::fs::read(path.as_ref())?;
    build_timeline(&data)
}

impl Timeline {
    /// Single pass over the raw sequence, which is dropped afterwards.
    pub fn from_raw(raw: RawSequence) -> Self {
        let mut events = Vec::with_capacity(raw.len());
        let mut current_bpm = INITIAL_TEMPO_BPM;

        for message in raw {
            if let Some(us_per_beat) = message.tempo_microseconds_per_beat() {
                current_bpm = 60_000_000.0 / f64::from(us_per_beat);
            }

            events.push(MidiEvent {
                time_seconds: f64::from(message.time_ms()) * 0.001,
                channel: message.channel(),
                message: convert_message(&message),
                tempo_bpm: current_bpm,
            });
        }

        Self { events }
    }

    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MidiEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn into_events(self) -> Vec<MidiEvent> {
        self.events
    }

    /// Time of the last event in seconds (0.0 when empty)
    pub fn duration_seconds(&self) -> f64 {
        self.events.last().map(|e| e.time_seconds).unwrap_or(0.0)
    }

    /// Events with `start <= time < end`.
    pub fn events_in_range(&self, start_seconds: f64, end_seconds: f64) -> &[MidiEvent] {
        let start_idx = self
            .events
            .partition_point(|e| e.time_seconds < start_seconds);
        let end_idx = start_idx
            + self.events[start_idx..].partition_point(|e| e.time_seconds < end_seconds);

        &self.events[start_idx..end_idx]
    }

    /// Offset every event by `delta_seconds`, clamping at 0.
    pub fn shifted(mut self, delta_seconds: f64) -> Self {
        for event in &mut self.events {
            event.time_seconds = (event.time_seconds + delta_seconds).max(0.0);
        }
        self
    }

    /// Keep only the events for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&MidiEvent) -> bool) {
        self.events.retain(keep);
    }
}

/// Build a timeline from hand-made events, ordered by time (stable).
impl From<Vec<MidiEvent>> for Timeline {
    fn from(mut events: Vec<MidiEvent>) -> Self {
        events.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));
        Self { events }
    }
}

impl IntoIterator for Timeline {
    type Item = MidiEvent;
    type IntoIter = std::vec::IntoIter<MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = &'a MidiEvent;
    type IntoIter = std::slice::Iter<'a, MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

fn convert_message(raw: &RawMessage) -> MidiMessage {
    match MidiEventKind::from_status(raw.type_byte()) {
        MidiEventKind::NoteOff => MidiMessage::NoteOff {
            key: raw.key(),
            velocity: raw.velocity(),
        },
        MidiEventKind::NoteOn => MidiMessage::NoteOn {
            key: raw.key(),
            velocity: raw.velocity(),
        },
        MidiEventKind::KeyPressure => MidiMessage::KeyPressure {
            key: raw.key(),
            pressure: raw.key_pressure(),
        },
        MidiEventKind::ControlChange => MidiMessage::ControlChange {
            controller: raw.control(),
            value: raw.control_value(),
        },
        MidiEventKind::ProgramChange => MidiMessage::ProgramChange {
            program: raw.program(),
        },
        MidiEventKind::ChannelPressure => MidiMessage::ChannelPressure {
            pressure: raw.channel_pressure(),
        },
        MidiEventKind::PitchBend => MidiMessage::PitchBend {
            value: raw.pitch_bend(),
        },
        MidiEventKind::SetTempo => MidiMessage::SetTempo,
        MidiEventKind::Other => MidiMessage::Other,
    }
}

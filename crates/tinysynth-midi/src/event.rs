//! Timeline event types.

use crate::raw::{
    TYPE_CHANNEL_PRESSURE, TYPE_CONTROL_CHANGE, TYPE_KEY_PRESSURE, TYPE_NOTE_OFF, TYPE_NOTE_ON,
    TYPE_PITCH_BEND, TYPE_PROGRAM_CHANGE, TYPE_SET_TEMPO,
};
use serde::{Deserialize, Serialize};

/// Message family of a [`MidiEvent`], keyed by MIDI status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiEventKind {
    NoteOff,
    NoteOn,
    /// Polyphonic aftertouch
    KeyPressure,
    ControlChange,
    ProgramChange,
    /// Channel aftertouch
    ChannelPressure,
    PitchBend,
    /// Tempo meta event (0x51)
    SetTempo,
    /// Anything else: other meta events, SysEx, ...
    Other,
}

impl MidiEventKind {
    pub fn from_status(status: u8) -> Self {
        match status {
            TYPE_NOTE_OFF => MidiEventKind::NoteOff,
            TYPE_NOTE_ON => MidiEventKind::NoteOn,
            TYPE_KEY_PRESSURE => MidiEventKind::KeyPressure,
            TYPE_CONTROL_CHANGE => MidiEventKind::ControlChange,
            TYPE_PROGRAM_CHANGE => MidiEventKind::ProgramChange,
            TYPE_CHANNEL_PRESSURE => MidiEventKind::ChannelPressure,
            TYPE_PITCH_BEND => MidiEventKind::PitchBend,
            TYPE_SET_TEMPO => MidiEventKind::SetTempo,
            _ => MidiEventKind::Other,
        }
    }

    /// Status byte for this kind. `Other` has none.
    pub fn status(&self) -> Option<u8> {
        match self {
            MidiEventKind::NoteOff => Some(TYPE_NOTE_OFF),
            MidiEventKind::NoteOn => Some(TYPE_NOTE_ON),
            MidiEventKind::KeyPressure => Some(TYPE_KEY_PRESSURE),
            MidiEventKind::ControlChange => Some(TYPE_CONTROL_CHANGE),
            MidiEventKind::ProgramChange => Some(TYPE_PROGRAM_CHANGE),
            MidiEventKind::ChannelPressure => Some(TYPE_CHANNEL_PRESSURE),
            MidiEventKind::PitchBend => Some(TYPE_PITCH_BEND),
            MidiEventKind::SetTempo => Some(TYPE_SET_TEMPO),
            MidiEventKind::Other => None,
        }
    }
}

/// Kind-specific payload of a timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MidiMessage {
    /// Note Off: key (0-127), release velocity (0-127)
    NoteOff { key: u8, velocity: u8 },

    /// Note On: key (0-127), velocity (0-127, 0 conventionally means off)
    NoteOn { key: u8, velocity: u8 },

    KeyPressure { key: u8, pressure: u8 },

    /// Control Change: controller (0-127), value (0-127)
    ControlChange { controller: u8, value: u8 },

    ProgramChange { program: u8 },

    ChannelPressure { pressure: u8 },

    /// Pitch Bend: raw wheel position (0-16383, 8192 = no bend)
    PitchBend { value: u16 },

    /// Tempo change. The new tempo is in [`MidiEvent::tempo_bpm`].
    SetTempo,

    Other,
}

impl MidiMessage {
    pub fn kind(&self) -> MidiEventKind {
        match self {
            MidiMessage::NoteOff { .. } => MidiEventKind::NoteOff,
            MidiMessage::NoteOn { .. } => MidiEventKind::NoteOn,
            MidiMessage::KeyPressure { .. } => MidiEventKind::KeyPressure,
            MidiMessage::ControlChange { .. } => MidiEventKind::ControlChange,
            MidiMessage::ProgramChange { .. } => MidiEventKind::ProgramChange,
            MidiMessage::ChannelPressure { .. } => MidiEventKind::ChannelPressure,
            MidiMessage::PitchBend { .. } => MidiEventKind::PitchBend,
            MidiMessage::SetTempo => MidiEventKind::SetTempo,
            MidiMessage::Other => MidiEventKind::Other,
        }
    }
}

/// A MIDI event placed on the absolute timeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Absolute time from the start of the stream, in seconds
    pub time_seconds: f64,

    /// MIDI channel (0-15). Meaningless for tempo events.
    pub channel: u8,

    pub message: MidiMessage,

    /// Tempo in effect at this event
    pub tempo_bpm: f64,
}

impl MidiEvent {
    pub fn kind(&self) -> MidiEventKind {
        self.message.kind()
    }

    /// Treats Note On with velocity 0 as a note off, like most receivers do.
    pub fn is_note_off(&self) -> bool {
        matches!(
            self.message,
            MidiMessage::NoteOff { .. } | MidiMessage::NoteOn { velocity: 0, .. }
        )
    }

    pub fn is_note_on(&self) -> bool {
        matches!(self.message, MidiMessage::NoteOn { velocity, .. } if velocity > 0)
    }
}

//! Raw MIDI event source
//!
//! Flattens a Standard MIDI File into one list of messages stamped with
//! absolute milliseconds. Tracks are merged by tick and tick deltas are
//! converted to wall-clock time through the running tempo, so consumers never
//! have to deal with per-track delta times or the file's division.
//!
//! Parsing itself is delegated to the `midly` crate.

use crate::error::{Error, Result};
use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use tracing::{debug, warn};

pub const TYPE_NOTE_OFF: u8 = 0x80;
pub const TYPE_NOTE_ON: u8 = 0x90;
pub const TYPE_KEY_PRESSURE: u8 = 0xA0;
pub const TYPE_CONTROL_CHANGE: u8 = 0xB0;
pub const TYPE_PROGRAM_CHANGE: u8 = 0xC0;
pub const TYPE_CHANNEL_PRESSURE: u8 = 0xD0;
pub const TYPE_PITCH_BEND: u8 = 0xE0;
pub const TYPE_SET_TEMPO: u8 = 0x51;
pub const TYPE_SYSEX: u8 = 0xF0;
pub const TYPE_ESCAPE: u8 = 0xF7;
/// Stand-in for meta events whose type byte is outside the meta range.
pub const TYPE_META_UNKNOWN: u8 = 0xFF;

/// Tempo assumed by the SMF standard until the first tempo meta event (120 BPM).
pub const DEFAULT_MICROSECONDS_PER_BEAT: u32 = 500_000;

/// One decoded message with its absolute time.
///
/// Fields are only meaningful for the message types they belong to; use the
/// typed accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    time_ms: u32,
    type_byte: u8,
    channel: u8,
    param1: u8,
    param2: u8,
    tempo: u32,
}

impl RawMessage {
    /// Absolute time from the start of the stream, in milliseconds
    pub fn time_ms(&self) -> u32 {
        self.time_ms
    }

    /// Status family (0x80-0xE0) for channel messages, meta type for meta events
    pub fn type_byte(&self) -> u8 {
        self.type_byte
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn key(&self) -> u8 {
        self.param1
    }

    pub fn velocity(&self) -> u8 {
        self.param2
    }

    pub fn key_pressure(&self) -> u8 {
        self.param2
    }

    pub fn control(&self) -> u8 {
        self.param1
    }

    pub fn control_value(&self) -> u8 {
        self.param2
    }

    pub fn program(&self) -> u8 {
        self.param1
    }

    pub fn channel_pressure(&self) -> u8 {
        self.param1
    }

    /// Raw 14-bit wheel position (0-16383, 8192 = centre)
    pub fn pitch_bend(&self) -> u16 {
        (u16::from(self.param2) << 7) | u16::from(self.param1)
    }

    /// Microseconds per quarter note. Only tempo messages carry one.
    pub fn tempo_microseconds_per_beat(&self) -> Option<u32> {
        (self.type_byte == TYPE_SET_TEMPO).then_some(self.tempo)
    }
}

/// Owned, time-ordered list of raw messages decoded from one MIDI file.
///
/// Consumed by value when building a timeline; dropping it releases it.
#[derive(Debug, Clone, Default)]
pub struct RawSequence {
    messages: Vec<RawMessage>,
}

impl RawSequence {
    /// Parse Standard MIDI File bytes.
    ///
    /// Fails with [`Error::Decode`] on empty or malformed input.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::Decode("input is empty".to_string()));
        }

        let smf = Smf::parse(data)?;
        let mut clock = TickClock::new(smf.header.timing)?;

        debug!(
            "Parsing MIDI data: {:?}, {} tracks, {:?}",
            smf.header.format,
            smf.tracks.len(),
            smf.header.timing
        );

        let merged = merge_tracks(&smf);
        let mut messages = Vec::with_capacity(merged.len());

        for (tick, kind) in merged {
            let Some(mut message) = decode_kind(kind) else {
                continue;
            };
            message.time_ms = clock.time_ms(tick);

            if let Some(us_per_beat) = message.tempo_microseconds_per_beat() {
                clock.set_tempo(tick, us_per_beat);
            }

            messages.push(message);
        }

        Ok(Self { messages })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RawMessage> {
        self.messages.iter()
    }
}

impl IntoIterator for RawSequence {
    type Item = RawMessage;
    type IntoIter = std::vec::IntoIter<RawMessage>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.into_iter()
    }
}

/// Converts absolute ticks to milliseconds.
enum TickClock {
    Metrical {
        ticks_per_beat: f64,
        us_per_beat: f64,
        anchor_tick: u64,
        anchor_ms: f64,
    },
    Timecode {
        ticks_per_second: f64,
    },
}

impl TickClock {
    fn new(timing: Timing) -> Result<Self> {
        match timing {
            Timing::Metrical(tpb) => {
                let ticks_per_beat = tpb.as_int();
                if ticks_per_beat == 0 {
                    return Err(Error::Decode(
                        "header declares 0 ticks per beat".to_string(),
                    ));
                }
                Ok(TickClock::Metrical {
                    ticks_per_beat: f64::from(ticks_per_beat),
                    us_per_beat: f64::from(DEFAULT_MICROSECONDS_PER_BEAT),
                    anchor_tick: 0,
                    anchor_ms: 0.0,
                })
            }
            Timing::Timecode(fps, subframes) => {
                let subframes = if subframes == 0 {
                    warn!("Timecode header declares 0 subframes per frame, assuming 1");
                    1
                } else {
                    subframes
                };
                Ok(TickClock::Timecode {
                    ticks_per_second: f64::from(fps.as_f32()) * f64::from(subframes),
                })
            }
        }
    }

    fn time_ms(&self, tick: u64) -> u32 {
        let ms = match *self {
            TickClock::Metrical {
                ticks_per_beat,
                us_per_beat,
                anchor_tick,
                anchor_ms,
            } => {
                let elapsed_ticks = tick.saturating_sub(anchor_tick) as f64;
                anchor_ms + elapsed_ticks * us_per_beat / ticks_per_beat / 1000.0
            }
            TickClock::Timecode { ticks_per_second } => {
                tick as f64 * 1000.0 / ticks_per_second
            }
        };
        // Saturating float -> int cast
        ms as u32
    }

    /// Tempo changes only affect metrical timing.
    fn set_tempo(&mut self, tick: u64, us_per_beat: u32) {
        if let TickClock::Metrical {
            ticks_per_beat,
            us_per_beat: current,
            anchor_tick,
            anchor_ms,
        } = self
        {
            let elapsed_ticks = tick.saturating_sub(*anchor_tick) as f64;
            *anchor_ms += elapsed_ticks * *current / *ticks_per_beat / 1000.0;
            *anchor_tick = tick;
            *current = f64::from(us_per_beat);
        }
    }
}

/// Merge all tracks into one list ordered by absolute tick.
///
/// Ties keep track order, then in-track order. Sequential (format 2) files
/// play their tracks back to back.
fn merge_tracks<'a>(smf: &Smf<'a>) -> Vec<(u64, TrackEventKind<'a>)> {
    let total = smf.tracks.iter().map(|track| track.len()).sum();
    let mut events = Vec::with_capacity(total);
    let mut track_start = 0u64;

    for track in smf.tracks.iter() {
        let mut tick = track_start;
        for event in track.iter() {
            tick += u64::from(event.delta.as_int());
            events.push((tick, event.kind));
        }
        if smf.header.format == Format::Sequential {
            track_start = tick;
        }
    }

    events.sort_by_key(|(tick, _)| *tick);
    events
}

fn decode_kind(kind: TrackEventKind<'_>) -> Option<RawMessage> {
    let mut message = RawMessage {
        time_ms: 0,
        type_byte: 0,
        channel: 0,
        param1: 0,
        param2: 0,
        tempo: 0,
    };

    match kind {
        TrackEventKind::Midi { channel, message: midi } => {
            message.channel = channel.as_int();
            let (type_byte, param1, param2) = match midi {
                MidiMessage::NoteOff { key, vel } => (TYPE_NOTE_OFF, key.as_int(), vel.as_int()),
                MidiMessage::NoteOn { key, vel } => (TYPE_NOTE_ON, key.as_int(), vel.as_int()),
                MidiMessage::Aftertouch { key, vel } => {
                    (TYPE_KEY_PRESSURE, key.as_int(), vel.as_int())
                }
                MidiMessage::Controller { controller, value } => {
                    (TYPE_CONTROL_CHANGE, controller.as_int(), value.as_int())
                }
                MidiMessage::ProgramChange { program } => {
                    (TYPE_PROGRAM_CHANGE, program.as_int(), 0)
                }
                MidiMessage::ChannelAftertouch { vel } => {
                    (TYPE_CHANNEL_PRESSURE, vel.as_int(), 0)
                }
                MidiMessage::PitchBend { bend } => {
                    let raw = bend.0.as_int();
                    (TYPE_PITCH_BEND, (raw & 0x7F) as u8, ((raw >> 7) & 0x7F) as u8)
                }
            };
            message.type_byte = type_byte;
            message.param1 = param1;
            message.param2 = param2;
        }
        TrackEventKind::Meta(MetaMessage::EndOfTrack) => return None,
        TrackEventKind::Meta(MetaMessage::Tempo(tempo)) if tempo.as_int() > 0 => {
            message.type_byte = TYPE_SET_TEMPO;
            message.tempo = tempo.as_int();
        }
        TrackEventKind::Meta(MetaMessage::Tempo(_)) => {
            warn!("Ignoring tempo of 0 microseconds per beat");
            message.type_byte = TYPE_META_UNKNOWN;
        }
        TrackEventKind::Meta(meta) => message.type_byte = meta_type_byte(&meta),
        TrackEventKind::SysEx(_) => message.type_byte = TYPE_SYSEX,
        TrackEventKind::Escape(_) => message.type_byte = TYPE_ESCAPE,
    }

    Some(message)
}

fn meta_type_byte(meta: &MetaMessage<'_>) -> u8 {
    match meta {
        MetaMessage::TrackNumber(_) => 0x00,
        MetaMessage::Text(_) => 0x01,
        MetaMessage::Copyright(_) => 0x02,
        MetaMessage::TrackName(_) => 0x03,
        MetaMessage::InstrumentName(_) => 0x04,
        MetaMessage::Lyric(_) => 0x05,
        MetaMessage::Marker(_) => 0x06,
        MetaMessage::CuePoint(_) => 0x07,
        MetaMessage::ProgramName(_) => 0x08,
        MetaMessage::DeviceName(_) => 0x09,
        MetaMessage::MidiChannel(_) => 0x20,
        MetaMessage::MidiPort(_) => 0x21,
        MetaMessage::EndOfTrack => 0x2F,
        MetaMessage::Tempo(_) => TYPE_SET_TEMPO,
        // Tempo with a bad payload length carries no usable tempo
        MetaMessage::Unknown(TYPE_SET_TEMPO, _) => TYPE_META_UNKNOWN,
        MetaMessage::SmpteOffset(_) => 0x54,
        MetaMessage::TimeSignature(..) => 0x58,
        MetaMessage::KeySignature(..) => 0x59,
        MetaMessage::SequencerSpecific(_) => 0x7F,
        // Keep bogus meta types out of the channel status range
        MetaMessage::Unknown(type_byte, _) if *type_byte < 0x80 => *type_byte,
        MetaMessage::Unknown(..) => TYPE_META_UNKNOWN,
    }
}

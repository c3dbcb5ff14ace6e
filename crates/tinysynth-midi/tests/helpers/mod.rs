//! SMF fixture builders for integration tests.

#![allow(dead_code)]

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};

pub const TICKS_PER_BEAT: u16 = 480;

pub fn encode(format: Format, tracks: Vec<Track<'static>>) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(
        format,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks = tracks;
    let mut out = Vec::new();
    smf.write_std(&mut out).expect("Failed to encode MIDI fixture");
    out
}

pub fn single_track(events: Vec<TrackEvent<'static>>) -> Vec<u8> {
    encode(Format::SingleTrack, vec![events])
}

pub fn note_on(delta: u32, channel: u8, key: u8, vel: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        },
    }
}

pub fn note_off(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        },
    }
}

pub fn tempo(delta: u32, us_per_beat: u32) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::new(us_per_beat))),
    }
}

pub fn end_of_track() -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    }
}

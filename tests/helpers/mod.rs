//! Test helpers and fixtures for tinysynth integration tests
//!
//! MIDI fixtures are encoded with midly; audio goes through a deterministic
//! stand-in engine so no SoundFont file is needed.

#![allow(dead_code)]

use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::PathBuf;
use tinysynth::prelude::*;

pub const TICKS_PER_BEAT: u16 = 480;

/// Sample rate where one frame is one millisecond
pub const TEST_SAMPLE_RATE: u32 = 1000;

pub fn parallel(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
    let mut smf = Smf::new(Header::new(
        Format::Parallel,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks = tracks;
    let mut out = Vec::new();
    smf.write_std(&mut out).expect("Failed to encode MIDI fixture");
    out
}

fn midi(delta: u32, channel: u8, message: MidiMessage) -> TrackEvent<'static> {
    TrackEvent {
        delta: u28::new(delta),
        kind: TrackEventKind::Midi {
            channel: u4::new(channel),
            message,
        },
    }
}

pub fn note_on(delta: u32, channel: u8, key: u8, vel: u8) -> TrackEvent<'static> {
    midi(
        delta,
        channel,
        MidiMessage::NoteOn {
            key: u7::new(key),
            vel: u7::new(vel),
        },
    )
}

pub fn note_off(delta: u32, channel: u8, key: u8) -> TrackEvent<'static> {
    midi(
        delta,
        channel,
        MidiMessage::NoteOff {
            key: u7::new(key),
            vel: u7::new(0),
        },
    )
}

pub fn program_change(delta: u32, channel: u8, program: u8) -> TrackEvent<'static> {
    midi(
        delta,
        channel,
        MidiMessage::ProgramChange {
            program: u7::new(program),
        },
    )
}

pub fn controller(delta: u32, channel: u8, controller: u8, value: u8) -> TrackEvent<'static> {
    midi(
        delta,
        channel,
        MidiMessage::Controller {
            controller: u7::new(controller),
            value: u7::new(value),
        },
    )
}

pub fn channel_pressure(delta: u32, channel: u8, pressure: u8) -> TrackEvent<'static> {
    midi(
        delta,
        channel,
        MidiMessage::ChannelAftertouch {
            vel: u7::new(pressure),
        },
    )
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

/// Stereo engine that outputs the number of held notes on both channels
/// and logs every message it receives.
#[derive(Default)]
pub struct CountingSynth {
    pub held: Vec<(u8, u8)>,
    pub programs: Vec<(u8, u8)>,
    pub messages: usize,
}

impl SynthEngine for CountingSynth {
    fn output_mode(&self) -> OutputMode {
        OutputMode::StereoInterleaved
    }

    fn render_float(&mut self, out: &mut [f32], _frames: usize, mix: bool) {
        let level = self.held.len() as f32;
        for sample in out.iter_mut() {
            if mix {
                *sample += level;
            } else {
                *sample = level;
            }
        }
    }
}

impl EventSink for CountingSynth {
    fn note_on(&mut self, channel: u8, key: u8, _velocity: u8) {
        self.messages += 1;
        self.held.push((channel, key));
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        self.messages += 1;
        self.held.retain(|&held| held != (channel, key));
    }

    fn control_change(&mut self, _channel: u8, _controller: u8, _value: u8) {
        self.messages += 1;
    }

    fn program_change(&mut self, channel: u8, program: u8) {
        self.messages += 1;
        self.programs.push((channel, program));
    }

    fn pitch_bend(&mut self, _channel: u8, _value: u16) {
        self.messages += 1;
    }
}

/// Left channel of an interleaved stereo buffer.
pub fn left(samples: &[f32]) -> Vec<f32> {
    samples.iter().step_by(2).copied().collect()
}

/// Calculate RMS of a signal.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Optional SoundFont for audible tests; tests skip when it is absent.
pub fn soundfont_path() -> Option<PathBuf> {
    let path = std::env::var_os("TINYSYNTH_TEST_SF2")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/soundfonts/TimGM6mb.sf2")
        });
    path.exists().then_some(path)
}

/// Install a test subscriber once so `RUST_LOG`-style output shows on failure.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Presets in [`tiny_soundfont`] as (SoundFont bank, preset, name).
pub const TINY_PRESETS: [(u16, u16, &str); 4] = [
    (0, 0, "Piano"),
    (0, 5, "EPiano"),
    (1, 5, "Alt EPiano"),
    (128, 0, "Drums"),
];

const GEN_INSTRUMENT: u16 = 41;
const GEN_SAMPLE_ID: u16 = 53;
const GEN_SAMPLE_MODES: u16 = 54;

/// Minimal in-memory SoundFont: every preset in [`TINY_PRESETS`] plays one
/// looped square wave pitched at middle C.
pub fn tiny_soundfont() -> Vec<u8> {
    let mut wave: Vec<i16> = (0..100)
        .map(|i| if i % 20 < 10 { 8000 } else { -8000 })
        .collect();
    // Sample data must extend past the sample end
    wave.resize(146, 0);
    let smpl: Vec<u8> = wave.iter().flat_map(|s| s.to_le_bytes()).collect();

    let mut phdr = Vec::new();
    let mut pbag = Vec::new();
    let mut pgen = Vec::new();
    for (index, (bank, preset, name)) in (0u16..).zip(TINY_PRESETS) {
        phdr.extend(preset_header(name, preset, bank, index));
        pbag.extend(bag(index));
        pgen.extend(generator(GEN_INSTRUMENT, 0));
    }
    let zones = TINY_PRESETS.len() as u16;
    phdr.extend(preset_header("EOP", 0, 0, zones));
    pbag.extend(bag(zones));
    pgen.extend(generator(0, 0));

    let mut inst = Vec::new();
    inst.extend(name20("Square"));
    inst.extend(0u16.to_le_bytes());
    inst.extend(name20("EOI"));
    inst.extend(1u16.to_le_bytes());

    let ibag = [bag(0), bag(2)].concat();
    let igen = [
        generator(GEN_SAMPLE_MODES, 1),
        generator(GEN_SAMPLE_ID, 0),
        generator(0, 0),
    ]
    .concat();

    let mut shdr = Vec::new();
    shdr.extend(name20("Square"));
    for value in [0i32, 100, 8, 92, 44100] {
        shdr.extend(value.to_le_bytes());
    }
    shdr.extend([60u8, 0]);
    shdr.extend(0u16.to_le_bytes());
    shdr.extend(1u16.to_le_bytes());
    shdr.extend([0u8; 46]);

    let body = [
        list(b"INFO", &[chunk(b"ifil", &[2, 0, 1, 0])]),
        list(b"sdta", &[chunk(b"smpl", &smpl)]),
        list(
            b"pdta",
            &[
                chunk(b"phdr", &phdr),
                chunk(b"pbag", &pbag),
                chunk(b"pgen", &pgen),
                chunk(b"inst", &inst),
                chunk(b"ibag", &ibag),
                chunk(b"igen", &igen),
                chunk(b"shdr", &shdr),
            ],
        ),
    ]
    .concat();

    let mut riff = b"RIFF".to_vec();
    riff.extend((body.len() as u32 + 4).to_le_bytes());
    riff.extend(b"sfbk");
    riff.extend(body);
    riff
}

fn chunk(id: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = id.to_vec();
    out.extend((data.len() as u32).to_le_bytes());
    out.extend(data);
    out
}

fn list(kind: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let body = chunks.concat();
    let mut out = b"LIST".to_vec();
    out.extend((body.len() as u32 + 4).to_le_bytes());
    out.extend(kind);
    out.extend(body);
    out
}

fn name20(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    out[..name.len()].copy_from_slice(name.as_bytes());
    out
}

fn preset_header(name: &str, preset: u16, bank: u16, bag_index: u16) -> Vec<u8> {
    let mut out = name20(name).to_vec();
    for value in [preset, bank, bag_index] {
        out.extend(value.to_le_bytes());
    }
    out.extend([0u8; 12]);
    out
}

fn bag(generator_index: u16) -> Vec<u8> {
    [generator_index.to_le_bytes(), 0u16.to_le_bytes()].concat()
}

fn generator(kind: u16, value: u16) -> Vec<u8> {
    [kind.to_le_bytes(), value.to_le_bytes()].concat()
}

//! Integration tests for tinysynth-midi.
//!
//! MIDI fixtures are synthesised with midly's writer, so no files are needed.

mod helpers;

use approx::assert_relative_eq;
use helpers::{encode, end_of_track, note_off, note_on, single_track, tempo};
use midly::{Format, TrackEvent};
use proptest::prelude::*;
use tinysynth_midi::{
    build_timeline, Error, MidiEventKind, MidiMessage, Timeline, INITIAL_TEMPO_BPM,
};

// ---------------------------------------------------------------------------
// 1. Decoding failures
// ---------------------------------------------------------------------------

#[test]
fn test_malformed_inputs_are_rejected() {
    let truncated_header = [0x4D, 0x54, 0x68, 0x64, 0x00, 0x00];
    let inputs: [&[u8]; 3] = [&[], b"RIFF....WAVE", &truncated_header];
    for data in inputs {
        let result = build_timeline(data);
        assert!(
            matches!(result, Err(Error::Decode(_))),
            "Expected decode error, got {:?}",
            result
        );
    }
}

// ---------------------------------------------------------------------------
// 2. Multi-track files
// ---------------------------------------------------------------------------

/// A conductor track carrying only tempo changes drives the timing of the
/// note tracks.
#[test]
fn test_conductor_track_tempo_applies_to_all_tracks() {
    let conductor = vec![tempo(0, 1_000_000), tempo(960, 250_000), end_of_track()];
    let melody = vec![
        note_on(0, 0, 60, 100),
        note_off(480, 0, 60),
        note_on(480, 0, 62, 100),
        note_off(480, 0, 62),
        end_of_track(),
    ];
    let bass = vec![note_on(960, 1, 36, 110), note_off(960, 1, 36), end_of_track()];

    let timeline = build_timeline(&encode(Format::Parallel, vec![conductor, melody, bass])).unwrap();

    let summary: Vec<(f64, MidiEventKind, f64)> = timeline
        .iter()
        .map(|e| (e.time_seconds, e.kind(), e.tempo_bpm))
        .collect();

    // 60 BPM for two beats (2s), then 240 BPM
    let expected = [
        (0.0, MidiEventKind::SetTempo, 60.0),
        (0.0, MidiEventKind::NoteOn, 60.0),
        (1.0, MidiEventKind::NoteOff, 60.0),
        (2.0, MidiEventKind::SetTempo, 240.0),
        (2.0, MidiEventKind::NoteOn, 240.0),
        (2.0, MidiEventKind::NoteOn, 240.0),
        (2.25, MidiEventKind::NoteOff, 240.0),
        (2.5, MidiEventKind::NoteOff, 240.0),
    ];

    assert_eq!(summary.len(), expected.len());
    for ((time, kind, bpm), (want_time, want_kind, want_bpm)) in summary.iter().zip(expected) {
        assert_relative_eq!(*time, want_time, epsilon = 1e-9);
        assert_eq!(*kind, want_kind);
        assert_relative_eq!(*bpm, want_bpm);
    }
}

#[test]
fn test_channels_preserved_across_tracks() {
    let a = vec![note_on(0, 9, 36, 127), end_of_track()];
    let b = vec![note_on(0, 3, 64, 80), end_of_track()];
    let timeline = build_timeline(&encode(Format::Parallel, vec![a, b])).unwrap();

    let channels: Vec<u8> = timeline.iter().map(|e| e.channel).collect();
    assert_eq!(channels, vec![9, 3]);
}

// ---------------------------------------------------------------------------
// 3. Serialization for schedulers that persist timelines
// ---------------------------------------------------------------------------

#[test]
fn test_timeline_serializes_to_json() {
    let timeline = build_timeline(&single_track(vec![note_on(0, 0, 60, 100), end_of_track()]))
        .unwrap();
    let json = serde_json::to_value(&timeline).unwrap();

    let first = &json["events"][0];
    assert_eq!(first["channel"], 0);
    assert_eq!(first["message"]["NoteOn"]["key"], 60);
    assert_eq!(first["tempo_bpm"], INITIAL_TEMPO_BPM);
}

#[test]
fn test_deserialized_timeline_is_time_ordered() {
    let timeline = build_timeline(&single_track(vec![
        note_on(0, 0, 60, 100),
        note_off(480, 0, 60),
        note_on(240, 0, 64, 100),
        note_off(480, 0, 64),
        end_of_track(),
    ]))
    .unwrap();
    let mut json = serde_json::to_value(&timeline).unwrap();
    json["events"].as_array_mut().unwrap().reverse();

    let restored: Timeline = serde_json::from_value(json).unwrap();
    assert_eq!(restored, timeline);
    assert!(restored
        .iter()
        .zip(restored.iter().skip(1))
        .all(|(a, b)| a.time_seconds <= b.time_seconds));
}

// ---------------------------------------------------------------------------
// 4. Properties
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Step {
    Note { delta: u32, key: u8, vel: u8 },
    Tempo { delta: u32, us_per_beat: u32 },
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (0u32..2000, 0u8..128, 0u8..128)
            .prop_map(|(delta, key, vel)| Step::Note { delta, key, vel }),
        1 => (0u32..2000, 100_000u32..2_000_000)
            .prop_map(|(delta, us_per_beat)| Step::Tempo { delta, us_per_beat }),
    ]
}

fn to_track(steps: &[Step]) -> Vec<TrackEvent<'static>> {
    let mut track: Vec<TrackEvent<'static>> = steps
        .iter()
        .map(|s| match *s {
            Step::Note { delta, key, vel } => note_on(delta, 0, key, vel),
            Step::Tempo { delta, us_per_beat } => tempo(delta, us_per_beat),
        })
        .collect();
    track.push(end_of_track());
    track
}

proptest! {
    #[test]
    fn prop_times_never_decrease(
        first in prop::collection::vec(step(), 0..64),
        second in prop::collection::vec(step(), 0..64),
    ) {
        let data = encode(Format::Parallel, vec![to_track(&first), to_track(&second)]);
        let timeline = build_timeline(&data).unwrap();

        prop_assert_eq!(timeline.len(), first.len() + second.len());
        for pair in timeline.events().windows(2) {
            prop_assert!(pair[0].time_seconds <= pair[1].time_seconds);
        }
    }

    #[test]
    fn prop_tempo_tracks_latest_tempo_event(steps in prop::collection::vec(step(), 0..64)) {
        let timeline = build_timeline(&single_track(to_track(&steps))).unwrap();

        let mut expected_bpm = INITIAL_TEMPO_BPM;
        for (step, event) in steps.iter().zip(timeline.iter()) {
            match *step {
                Step::Tempo { us_per_beat, .. } => {
                    expected_bpm = 60e6 / f64::from(us_per_beat);
                    prop_assert_eq!(event.message, MidiMessage::SetTempo);
                }
                Step::Note { key, vel, .. } => {
                    prop_assert_eq!(event.message, MidiMessage::NoteOn { key, velocity: vel });
                }
            }
            prop_assert_eq!(event.tempo_bpm, expected_bpm);
        }
    }
}

//! Timeline playback against a clock driven by the audio callback.
//!
//! [`Sequencer`] keeps a queue of pending [`MidiEvent`]s ordered by time.
//! Each [`process`](Sequencer::process) call advances the clock and forwards
//! due events to an [`EventSink`].

use crate::error::Result;
use std::collections::VecDeque;
use tinysynth_midi::{MidiEvent, MidiMessage, Timeline};
use tinysynth_synth::{RenderRegion, Renderer, SynthEngine};
use tracing::{debug, trace};

/// Receiver of channel messages dispatched by a [`Sequencer`].
pub trait EventSink {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8);
    fn note_off(&mut self, channel: u8, key: u8);
    fn control_change(&mut self, channel: u8, controller: u8, value: u8);
    fn program_change(&mut self, channel: u8, program: u8);
    /// Raw wheel position (0-16383, 8192 = no bend)
    fn pitch_bend(&mut self, channel: u8, value: u16);
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        (**self).note_on(channel, key, velocity)
    }
    fn note_off(&mut self, channel: u8, key: u8) {
        (**self).note_off(channel, key)
    }
    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        (**self).control_change(channel, controller, value)
    }
    fn program_change(&mut self, channel: u8, program: u8) {
        (**self).program_change(channel, program)
    }
    fn pitch_bend(&mut self, channel: u8, value: u16) {
        (**self).pitch_bend(channel, value)
    }
}

#[cfg(feature = "soundfont")]
impl EventSink for tinysynth_synth::SoundFontSynth {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        tinysynth_synth::SoundFontSynth::note_on(self, channel, key, velocity)
    }
    fn note_off(&mut self, channel: u8, key: u8) {
        tinysynth_synth::SoundFontSynth::note_off(self, channel, key)
    }
    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        tinysynth_synth::SoundFontSynth::control_change(self, channel, controller, value)
    }
    fn program_change(&mut self, channel: u8, program: u8) {
        tinysynth_synth::SoundFontSynth::program_change(self, channel, program)
    }
    fn pitch_bend(&mut self, channel: u8, value: u16) {
        tinysynth_synth::SoundFontSynth::pitch_bend(self, channel, value)
    }
}

/// Plays timelines in step with rendered audio.
#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    time: f64,
    events: VecDeque<MidiEvent>,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current playback position in seconds.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of events still waiting to be sent.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Time of the next pending event.
    pub fn next_event_time(&self) -> Option<f64> {
        self.events.front().map(|e| e.time_seconds)
    }

    /// Drop all pending events. The clock keeps running.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Queue a timeline to start at the current playback position.
    pub fn load(&mut self, timeline: &Timeline) {
        self.load_filtered(timeline, |_| true);
    }

    /// Queue a timeline to start at the current playback position, keeping
    /// only events the filter accepts.
    ///
    /// The filter sees each event already shifted to playback time and may
    /// rewrite it (transpose, remap channels, ...). Replaces anything still
    /// pending.
    pub fn load_filtered<F>(&mut self, timeline: &Timeline, mut filter: F)
    where
        F: FnMut(&mut MidiEvent) -> bool,
    {
        let offset = self.time;
        let mut events: Vec<MidiEvent> = timeline
            .iter()
            .cloned()
            .filter_map(|mut event| {
                event.time_seconds += offset;
                filter(&mut event).then_some(event)
            })
            .collect();
        events.sort_by(|a, b| a.time_seconds.total_cmp(&b.time_seconds));

        debug!(
            "Sequencer loaded {} of {} events at {:.3}s",
            events.len(),
            timeline.len(),
            offset
        );
        self.events = events.into();
    }

    /// Forward one event to a sink.
    ///
    /// Note On with velocity 0 is sent as Note Off. Aftertouch, tempo and
    /// meta events have no sink counterpart and are skipped.
    pub fn send<S: EventSink + ?Sized>(event: &MidiEvent, sink: &mut S) {
        let channel = event.channel;
        match event.message {
            MidiMessage::NoteOn { key, velocity: 0 } | MidiMessage::NoteOff { key, .. } => {
                sink.note_off(channel, key)
            }
            MidiMessage::NoteOn { key, velocity } => sink.note_on(channel, key, velocity),
            MidiMessage::ControlChange { controller, value } => {
                sink.control_change(channel, controller, value)
            }
            MidiMessage::ProgramChange { program } => sink.program_change(channel, program),
            MidiMessage::PitchBend { value } => sink.pitch_bend(channel, value),
            MidiMessage::KeyPressure { .. }
            | MidiMessage::ChannelPressure { .. }
            | MidiMessage::SetTempo
            | MidiMessage::Other => {
                trace!("Sequencer skipped {:?} at {:.3}s", event.kind(), event.time_seconds)
            }
        }
    }

    /// Advance the clock by up to `delta` seconds, sending every event that
    /// is due along the way.
    ///
    /// Stops early at the next event that is not yet due so the caller can
    /// render up to exactly that point. Returns how far the clock moved.
    pub fn process<S: EventSink + ?Sized>(&mut self, delta: f64, sink: &mut S) -> f64 {
        let delta = delta.max(0.0);
        while let Some(next) = self.next_event_time() {
            if next > self.time {
                let step = next - self.time;
                if step <= delta {
                    // Land exactly on the event so the next call sends it
                    self.time = next;
                    return step;
                }
                self.time += delta;
                return delta;
            }
            if let Some(event) = self.events.pop_front() {
                Self::send(&event, sink);
            }
        }
        self.time += delta;
        delta
    }

    /// Fill `buffer` with `frames` of audio, sending events at their frame.
    ///
    /// The buffer is split at event boundaries; every slice is rendered over
    /// its previous contents. `buffer` holds frames in the engine's layout
    /// for [`RenderRegion::frames`].
    pub fn render<E>(&mut self, engine: &mut E, buffer: &mut [f32], sample_rate: u32) -> Result<()>
    where
        E: SynthEngine + EventSink + ?Sized,
    {
        let channels = engine.output_mode().channel_count();
        let frames = buffer.len() / channels;
        let sample_rate = f64::from(sample_rate);
        let mut renderer = Renderer::with_capacity(frames, channels);
        let mut generated = 0;

        while generated < frames {
            let remaining = frames - generated;
            let delta = remaining as f64 / sample_rate;
            let advanced = self.process(delta, engine).min(delta);
            let chunk = ((advanced * sample_rate + 0.999) as usize).clamp(1, remaining);

            let slice = &mut buffer[generated * channels..(generated + chunk) * channels];
            renderer.render(engine, RenderRegion::frames(slice, channels), false)?;
            generated += chunk;
        }
        Ok(())
    }
}

//! SoundFont synthesizer wrapper

use crate::config::{db_to_gain, SynthConfig};
use crate::engine::{write_samples, OutputMode, SynthEngine};
use crate::error::{Error, Result};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::sync::Arc;
use tracing::debug;

const CONTROL_CHANGE: i32 = 0xB0;
const PROGRAM_CHANGE: i32 = 0xC0;
const PITCH_BEND: i32 = 0xE0;
const CC_BANK_SELECT: u8 = 0x00;
const CC_DATA_ENTRY_MSB: u8 = 0x06;
const CC_DATA_ENTRY_LSB: u8 = 0x26;
const CC_RPN_LSB: u8 = 0x64;
const CC_RPN_MSB: u8 = 0x65;
const CC_ALL_SOUND_OFF: u8 = 0x78;

const RPN_PITCH_BEND_RANGE: u8 = 0;
const RPN_FINE_TUNING: u8 = 1;
const RPN_COARSE_TUNING: u8 = 2;
const RPN_NULL: u8 = 0x7F;

/// SoundFont synthesizer wrapper.
///
/// Owns its own RustySynth [`Synthesizer`]; several instances can share one
/// [`SoundFont`] and mix into the same buffer.
pub struct SoundFontSynth {
    soundfont: Arc<SoundFont>,
    synthesizer: Synthesizer,
    config: SynthConfig,
    volume: f32,
    left: Vec<f32>,
    right: Vec<f32>,
}

impl SoundFontSynth {
    /// Create a new SoundFont synthesizer.
    pub fn new(soundfont: Arc<SoundFont>, config: &SynthConfig) -> Result<Self> {
        config.validate()?;
        let synthesizer = build_synthesizer(&soundfont, config)?;
        let mut synth = Self {
            soundfont,
            synthesizer,
            config: config.clone(),
            volume: 1.0,
            left: Vec::new(),
            right: Vec::new(),
        };
        synth.apply_gain();
        Ok(synth)
    }

    /// Parse SoundFont bytes and create a synthesizer for them.
    pub fn from_bytes(data: &[u8], config: &SynthConfig) -> Result<Self> {
        let mut reader = data;
        let soundfont = SoundFont::new(&mut reader)
            .map_err(|e| Error::SoundFont(format!("Could not load SoundFont from bytes: {}", e)))?;

        debug!(
            "Loaded SoundFont from {} bytes: {} presets",
            data.len(),
            soundfont.get_presets().len()
        );

        Self::new(Arc::new(soundfont), config)
    }

    pub fn soundfont(&self) -> &Arc<SoundFont> {
        &self.soundfont
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    /// Set output layout, sample rate and global gain (dB).
    ///
    /// Changing the sample rate rebuilds the synthesizer, which silences all
    /// voices and resets channel state.
    pub fn set_output(&mut self, mode: OutputMode, sample_rate: u32, gain_db: f32) -> Result<()> {
        let config = SynthConfig {
            output_mode: mode,
            sample_rate,
            gain_db,
            ..self.config.clone()
        };
        config.validate()?;

        if config.sample_rate != self.config.sample_rate {
            self.synthesizer = build_synthesizer(&self.soundfont, &config)?;
        }
        self.config = config;
        self.apply_gain();
        Ok(())
    }

    /// Set global gain as a linear factor (1.0 = 100%).
    pub fn set_volume(&mut self, gain: f32) {
        self.volume = gain.max(0.0);
        self.apply_gain();
    }

    /// Limit simultaneous voices. Rebuilds the synthesizer.
    pub fn set_max_voices(&mut self, max_voices: usize) -> Result<()> {
        let config = SynthConfig {
            max_voices,
            ..self.config.clone()
        };
        config.validate()?;
        self.synthesizer = build_synthesizer(&self.soundfont, &config)?;
        self.config = config;
        self.apply_gain();
        Ok(())
    }

    fn apply_gain(&mut self) {
        self.synthesizer
            .set_master_volume(db_to_gain(self.config.gain_db) * self.volume);
    }

    /// Note on. Velocity 0 releases the note.
    pub fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(channel, key);
            return;
        }
        self.synthesizer
            .note_on(i32::from(channel), i32::from(key), i32::from(velocity));
    }

    /// Note off
    ///
    /// # Arguments
    /// * `channel` - MIDI channel (0-15)
    /// * `key` - MIDI note number (0-127)
    pub fn note_off(&mut self, channel: u8, key: u8) {
        self.synthesizer.note_off(i32::from(channel), i32::from(key));
    }

    /// Release every note on every channel (voices still decay).
    pub fn note_off_all(&mut self) {
        self.synthesizer.note_off_all(false);
    }

    pub fn channel_note_off_all(&mut self, channel: u8) {
        self.synthesizer
            .note_off_all_channel(i32::from(channel), false);
    }

    /// Cut every voice on a channel immediately, without release.
    pub fn channel_sounds_off(&mut self, channel: u8) {
        self.control_change(channel, CC_ALL_SOUND_OFF, 0);
    }

    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.synthesizer.process_midi_message(
            i32::from(channel),
            CONTROL_CHANGE,
            i32::from(controller),
            i32::from(value),
        );
    }

    /// Change MIDI program (preset).
    pub fn program_change(&mut self, channel: u8, program: u8) {
        self.synthesizer
            .process_midi_message(i32::from(channel), PROGRAM_CHANGE, i32::from(program), 0);
    }

    /// Select bank then program for a channel.
    pub fn bank_program_change(&mut self, channel: u8, bank: u8, program: u8) {
        self.control_change(channel, CC_BANK_SELECT, bank);
        self.program_change(channel, program);
    }

    /// Pitch wheel position (0-16383, 8192 = no bend).
    pub fn pitch_bend(&mut self, channel: u8, value: u16) {
        let value = value.min(0x3FFF);
        let lsb = i32::from(value & 0x7F);
        let msb = i32::from((value >> 7) & 0x7F);
        self.synthesizer
            .process_midi_message(i32::from(channel), PITCH_BEND, lsb, msb);
    }

    /// Pitch wheel range in semitones (default 2). Fractions become cents.
    pub fn set_pitch_bend_range(&mut self, channel: u8, semitones: f32) {
        let (coarse, cents) = pitch_bend_range_data(semitones);
        self.write_rpn(channel, RPN_PITCH_BEND_RANGE, coarse, Some(cents));
    }

    /// Channel tuning in semitones relative to concert pitch.
    pub fn set_tuning(&mut self, channel: u8, semitones: f32) {
        let (coarse, fine) = tuning_data(semitones);
        self.write_rpn(channel, RPN_COARSE_TUNING, coarse, None);
        self.write_rpn(
            channel,
            RPN_FINE_TUNING,
            (fine >> 7) as u8,
            Some((fine & 0x7F) as u8),
        );
    }

    fn write_rpn(&mut self, channel: u8, rpn: u8, msb: u8, lsb: Option<u8>) {
        self.control_change(channel, CC_RPN_MSB, 0);
        self.control_change(channel, CC_RPN_LSB, rpn);
        self.control_change(channel, CC_DATA_ENTRY_MSB, msb);
        if let Some(lsb) = lsb {
            self.control_change(channel, CC_DATA_ENTRY_LSB, lsb);
        }
        self.control_change(channel, CC_RPN_MSB, RPN_NULL);
        self.control_change(channel, CC_RPN_LSB, RPN_NULL);
    }

    /// Stop all voices immediately and reset channel parameters.
    pub fn reset(&mut self) {
        self.synthesizer.reset();
    }

    pub fn preset_count(&self) -> usize {
        self.soundfont.get_presets().len()
    }

    /// Index of the preset with this bank and number.
    pub fn preset_index(&self, bank: i32, number: i32) -> Option<usize> {
        self.soundfont
            .get_presets()
            .iter()
            .position(|p| p.get_bank_number() == bank && p.get_patch_number() == number)
    }

    pub fn preset_name(&self, bank: i32, number: i32) -> Option<&str> {
        self.preset_index(bank, number)
            .map(|index| self.soundfont.get_presets()[index].get_name())
    }

    /// Get the sample rate
    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}

impl SynthEngine for SoundFontSynth {
    fn output_mode(&self) -> OutputMode {
        self.config.output_mode
    }

    fn render_float(&mut self, out: &mut [f32], frames: usize, mix: bool) {
        self.left.resize(frames, 0.0);
        self.right.resize(frames, 0.0);
        self.synthesizer.render(&mut self.left, &mut self.right);

        let (left, right) = (&self.left[..frames], &self.right[..frames]);
        match self.config.output_mode {
            OutputMode::StereoInterleaved => {
                for ((frame, l), r) in out.chunks_exact_mut(2).zip(left).zip(right) {
                    if mix {
                        frame[0] += l;
                        frame[1] += r;
                    } else {
                        frame[0] = *l;
                        frame[1] = *r;
                    }
                }
            }
            OutputMode::StereoUnweaved => {
                let (out_left, out_right) = out.split_at_mut(frames);
                write_samples(out_left, left, mix);
                write_samples(&mut out_right[..frames], right, mix);
            }
            OutputMode::Mono => {
                for ((sample, l), r) in out.iter_mut().zip(left).zip(right) {
                    let mono = (l + r) * 0.5;
                    if mix {
                        *sample += mono;
                    } else {
                        *sample = mono;
                    }
                }
            }
        }
    }
}

/// RPN 0 data: whole semitones and cents.
fn pitch_bend_range_data(semitones: f32) -> (u8, u8) {
    let semitones = if semitones.is_finite() {
        semitones.clamp(0.0, 127.99)
    } else {
        2.0
    };
    let coarse = semitones.trunc();
    let cents = ((semitones - coarse) * 100.0).round().min(99.0);
    (coarse as u8, cents as u8)
}

/// RPN 2 data (64 = no shift) and the 14-bit RPN 1 value (8192 = no shift).
fn tuning_data(semitones: f32) -> (u8, u16) {
    let semitones = if semitones.is_finite() {
        semitones.clamp(-64.0, 63.99)
    } else {
        0.0
    };
    let coarse = semitones.round().clamp(-64.0, 63.0);
    let fine = (8192.0 + (semitones - coarse) * 8192.0)
        .round()
        .clamp(0.0, 16383.0);
    ((coarse + 64.0) as u8, fine as u16)
}

fn build_synthesizer(soundfont: &Arc<SoundFont>, config: &SynthConfig) -> Result<Synthesizer> {
    let mut settings = SynthesizerSettings::new(config.sample_rate as i32);
    settings.block_size = config.block_size;
    settings.maximum_polyphony = config.max_voices;
    settings.enable_reverb_and_chorus = config.enable_reverb_and_chorus;

    Synthesizer::new(soundfont, &settings)
        .map_err(|e| Error::SoundFont(format!("Failed to create synthesizer: {}", e)))
}

//! Multi-SoundFont synthesizer rack.
//!
//! Each loaded SoundFont gets its own [`SoundFontSynth`]; MIDI channels are
//! routed to one of them by [`Synth::program_select`]. All engines render
//! into the same output, the first overwriting and the rest mixing.
//!
//! Percussion is a channel property: channel 9 always plays drum kits
//! (SoundFont banks 128 and up) and no other channel can.

use crate::error::{Error, Result};
use crate::sequencer::{EventSink, Sequencer};
use std::collections::BTreeMap;
use std::path::Path;
use tinysynth_synth::render::SAMPLE_BYTES;
use tinysynth_synth::{
    render_into, OutputMode, RenderRegion, SoundFontLibrary, SoundFontSynth, SynthConfig,
    SynthEngine,
};
use tracing::{debug, info};

/// Number of MIDI channels a [`Synth`] routes.
pub const CHANNEL_COUNT: usize = 16;

/// The General MIDI drum channel.
pub const PERCUSSION_CHANNEL: u8 = 9;

const PERCUSSION_BANK: u16 = 128;

const CC_BANK_SELECT: u8 = 0;
const CC_ALL_SOUND_OFF: u8 = 120;
const CC_ALL_NOTES_OFF: u8 = 123;

/// Identifier of a SoundFont loaded into a [`Synth`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoundFontId(usize);

impl SoundFontId {
    pub fn id(&self) -> usize {
        self.0
    }
}

/// Program currently selected on a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelProgram {
    pub soundfont: SoundFontId,
    /// MIDI bank select value (0-127)
    pub bank: u8,
    pub preset: u8,
    pub is_drums: bool,
}

impl ChannelProgram {
    /// Bank number as stored in the SoundFont; drum kits live at 128 and up.
    pub fn soundfont_bank(&self) -> u16 {
        preset_bank(self.bank, self.is_drums)
    }
}

/// Rack of SoundFont engines sharing one stereo output.
pub struct Synth {
    config: SynthConfig,
    library: SoundFontLibrary,
    engines: BTreeMap<SoundFontId, SoundFontSynth>,
    channels: [Option<ChannelProgram>; CHANNEL_COUNT],
    next_id: usize,
}

impl Synth {
    /// Create an empty rack. Output is always interleaved stereo.
    pub fn new(config: SynthConfig) -> Result<Self> {
        let config = SynthConfig {
            output_mode: OutputMode::StereoInterleaved,
            ..config
        };
        config.validate()?;
        info!(
            "Synth created: {} Hz, gain {} dB",
            config.sample_rate, config.gain_db
        );
        Ok(Self {
            config,
            library: SoundFontLibrary::new(),
            engines: BTreeMap::new(),
            channels: [None; CHANNEL_COUNT],
            next_id: 0,
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    /// Load a SoundFont file with the rack's gain and voice limit.
    /// Files already loaded are parsed only once.
    pub fn sfload(&mut self, path: impl AsRef<Path>) -> Result<SoundFontId> {
        self.sfload_with(path, 0.0, self.config.max_voices)
    }

    /// Load a SoundFont file with its own gain offset (dB, added to the
    /// rack's gain) and voice limit.
    pub fn sfload_with(
        &mut self,
        path: impl AsRef<Path>,
        gain_db: f32,
        max_voices: usize,
    ) -> Result<SoundFontId> {
        let config = self.font_config(gain_db, max_voices)?;
        let handle = self.library.load(path)?;
        let engine = self.library.synth(&handle, &config)?;
        Ok(self.add_engine(engine))
    }

    /// Load a SoundFont from memory.
    pub fn sfload_bytes(&mut self, data: &[u8]) -> Result<SoundFontId> {
        self.sfload_bytes_with(data, 0.0, self.config.max_voices)
    }

    /// Load a SoundFont from memory with its own gain offset and voice limit.
    pub fn sfload_bytes_with(
        &mut self,
        data: &[u8],
        gain_db: f32,
        max_voices: usize,
    ) -> Result<SoundFontId> {
        let config = self.font_config(gain_db, max_voices)?;
        let handle = self.library.load_bytes(data)?;
        let engine = self.library.synth(&handle, &config);
        // In-memory fonts are never looked up again; the engine keeps its own reference
        self.library.unload(&handle);
        Ok(self.add_engine(engine?))
    }

    fn font_config(&self, gain_db: f32, max_voices: usize) -> Result<SynthConfig> {
        let config = SynthConfig {
            gain_db: self.config.gain_db + gain_db,
            max_voices,
            ..self.config.clone()
        };
        config.validate()?;
        Ok(config)
    }

    /// Register an engine and hand it every channel nobody plays yet.
    ///
    /// Claimed channels start where a fresh engine already is: bank 0,
    /// preset 0, so nothing is sent.
    fn add_engine(&mut self, engine: SoundFontSynth) -> SoundFontId {
        let id = SoundFontId(self.next_id);
        self.next_id += 1;
        self.engines.insert(id, engine);

        for (channel, slot) in (0u8..).zip(self.channels.iter_mut()) {
            if slot.is_none() {
                *slot = Some(ChannelProgram {
                    soundfont: id,
                    bank: 0,
                    preset: 0,
                    is_drums: channel == PERCUSSION_CHANNEL,
                });
            }
        }

        debug!("SoundFont {} added, {} loaded", id.0, self.engines.len());
        id
    }

    /// Remove a SoundFont. Channels that used it become unassigned.
    pub fn sfunload(&mut self, id: SoundFontId) -> Result<()> {
        self.engines
            .remove(&id)
            .ok_or(Error::UnknownSoundFont(id.0))?;
        for slot in self.channels.iter_mut() {
            if slot.is_some_and(|program| program.soundfont == id) {
                *slot = None;
            }
        }
        Ok(())
    }

    pub fn soundfonts(&self) -> impl Iterator<Item = SoundFontId> + '_ {
        self.engines.keys().copied()
    }

    /// Engine playing a SoundFont.
    pub fn engine_mut(&mut self, id: SoundFontId) -> Result<&mut SoundFontSynth> {
        self.engines
            .get_mut(&id)
            .ok_or(Error::UnknownSoundFont(id.0))
    }

    /// Preset name for a SoundFont bank (128 and up for drum kits) and
    /// preset, if the SoundFont has one.
    pub fn sfpreset_name(&self, id: SoundFontId, bank: u16, preset: u8) -> Result<Option<String>> {
        let engine = self.engines.get(&id).ok_or(Error::UnknownSoundFont(id.0))?;
        Ok(engine
            .preset_name(i32::from(bank), i32::from(preset))
            .map(str::to_owned))
    }

    /// Route a channel to a SoundFont and select bank and preset on it.
    ///
    /// `is_drums` picks a drum kit; it is only valid on
    /// [`PERCUSSION_CHANNEL`], which always plays drum kits.
    pub fn program_select(
        &mut self,
        channel: u8,
        id: SoundFontId,
        bank: u8,
        preset: u8,
        is_drums: bool,
    ) -> Result<()> {
        let channel_index = check_channel(channel)?;
        let is_drums = drum_mode(channel, is_drums)?;
        let engine = self
            .engines
            .get_mut(&id)
            .ok_or(Error::UnknownSoundFont(id.0))?;
        check_preset(engine, bank, preset, is_drums)?;

        engine.bank_program_change(channel, bank.min(127), preset);
        self.channels[channel_index] = Some(ChannelProgram {
            soundfont: id,
            bank: bank.min(127),
            preset,
            is_drums,
        });
        Ok(())
    }

    /// Detach a channel from its SoundFont.
    pub fn program_unset(&mut self, channel: u8) -> Result<()> {
        let channel_index = check_channel(channel)?;
        if let Some(program) = self.channels[channel_index].take() {
            if let Some(engine) = self.engines.get_mut(&program.soundfont) {
                engine.channel_sounds_off(channel);
            }
        }
        Ok(())
    }

    /// Program currently selected on a channel.
    pub fn program_info(&self, channel: u8) -> Result<Option<ChannelProgram>> {
        let channel_index = check_channel(channel)?;
        Ok(self.channels[channel_index])
    }

    /// Program change within the channel's current SoundFont and bank.
    ///
    /// The bank is whatever was last selected, including bank select
    /// messages sent through [`Synth::control_change`].
    pub fn program_change(&mut self, channel: u8, preset: u8, is_drums: bool) -> Result<()> {
        let program = self.assigned(channel)?;
        let is_drums = drum_mode(channel, is_drums)?;
        let engine = self.routed(channel)?;
        check_preset(engine, program.bank, preset, is_drums)?;

        engine.program_change(channel, preset);
        self.channels[usize::from(channel)] = Some(ChannelProgram {
            preset,
            is_drums,
            ..program
        });
        Ok(())
    }

    fn assigned(&self, channel: u8) -> Result<ChannelProgram> {
        let channel_index = check_channel(channel)?;
        self.channels[channel_index].ok_or(Error::ChannelUnassigned(channel))
    }

    fn routed(&mut self, channel: u8) -> Result<&mut SoundFontSynth> {
        let program = self.assigned(channel)?;
        self.engines
            .get_mut(&program.soundfont)
            .ok_or(Error::UnknownSoundFont(program.soundfont.0))
    }

    /// Start a note. Returns false when the arguments are out of range or
    /// the channel has no SoundFont.
    pub fn noteon(&mut self, channel: u8, key: u8, velocity: u8) -> bool {
        if key > 127 || velocity > 127 {
            return false;
        }
        match self.routed(channel) {
            Ok(engine) => {
                engine.note_on(channel, key, velocity);
                true
            }
            Err(_) => false,
        }
    }

    /// Release a note. Same return convention as [`Synth::noteon`].
    pub fn noteoff(&mut self, channel: u8, key: u8) -> bool {
        if key > 127 {
            return false;
        }
        match self.routed(channel) {
            Ok(engine) => {
                engine.note_off(channel, key);
                true
            }
            Err(_) => false,
        }
    }

    /// Send a controller message. Bank select (CC 0) also updates the
    /// channel's program record, so a later program change uses it.
    pub fn control_change(&mut self, channel: u8, controller: u8, value: u8) -> Result<()> {
        let value = value.min(127);
        self.routed(channel)?
            .control_change(channel, controller, value);

        if controller == CC_BANK_SELECT {
            if let Some(program) = self.channels[usize::from(channel)].as_mut() {
                program.bank = value;
            }
        }
        Ok(())
    }

    /// Pitch wheel (0-16383, 8192 = centered).
    pub fn pitch_bend(&mut self, channel: u8, value: u16) -> Result<()> {
        self.routed(channel)?.pitch_bend(channel, value);
        Ok(())
    }

    /// Pitch wheel range up and down, in semitones (default 2.0).
    pub fn pitchbend_range(&mut self, channel: u8, semitones: f32) -> Result<()> {
        self.routed(channel)?
            .set_pitch_bend_range(channel, semitones);
        Ok(())
    }

    /// Channel tuning in semitones (default 0.0).
    pub fn set_tuning(&mut self, channel: u8, semitones: f32) -> Result<()> {
        self.routed(channel)?.set_tuning(channel, semitones);
        Ok(())
    }

    /// Release notes on one channel, or on all channels with `None`.
    pub fn notes_off(&mut self, channel: Option<u8>) -> Result<()> {
        self.broadcast(channel, CC_ALL_NOTES_OFF)
    }

    /// Cut sound immediately on one channel, or on all channels with `None`.
    pub fn sounds_off(&mut self, channel: Option<u8>) -> Result<()> {
        self.broadcast(channel, CC_ALL_SOUND_OFF)
    }

    fn broadcast(&mut self, channel: Option<u8>, controller: u8) -> Result<()> {
        match channel {
            Some(channel) => {
                check_channel(channel)?;
                for engine in self.engines.values_mut() {
                    engine.control_change(channel, controller, 0);
                }
            }
            None => {
                for engine in self.engines.values_mut() {
                    for channel in 0..CHANNEL_COUNT as u8 {
                        engine.control_change(channel, controller, 0);
                    }
                }
            }
        }
        Ok(())
    }

    /// Render into a caller region: a byte span or a `[frames, 2]` float grid.
    pub fn render_into(&mut self, region: RenderRegion<'_>) -> Result<()> {
        render_into(self, region, false)?;
        Ok(())
    }

    /// Render `frames` of interleaved stereo float32 samples as raw bytes.
    pub fn generate(&mut self, frames: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; frames * 2 * SAMPLE_BYTES];
        self.render_into(RenderRegion::bytes(&mut bytes))?;
        Ok(bytes)
    }

    /// Like [`Synth::generate`], playing `sequencer` events at their frame.
    pub fn generate_with(&mut self, sequencer: &mut Sequencer, frames: usize) -> Result<Vec<u8>> {
        let mut samples = vec![0.0f32; frames * 2];
        let sample_rate = self.config.sample_rate;
        sequencer.render(self, &mut samples, sample_rate)?;
        Ok(samples.iter().flat_map(|s| s.to_ne_bytes()).collect())
    }
}

fn check_channel(channel: u8) -> Result<usize> {
    let index = usize::from(channel);
    if index < CHANNEL_COUNT {
        Ok(index)
    } else {
        Err(Error::InvalidChannel(channel))
    }
}

/// Effective drum mode for a channel.
fn drum_mode(channel: u8, is_drums: bool) -> Result<bool> {
    match (channel == PERCUSSION_CHANNEL, is_drums) {
        (true, _) => Ok(true),
        (false, true) => Err(Error::PercussionChannel(channel)),
        (false, false) => Ok(false),
    }
}

fn preset_bank(bank: u8, is_drums: bool) -> u16 {
    let bank = u16::from(bank.min(127));
    if is_drums {
        PERCUSSION_BANK + bank
    } else {
        bank
    }
}

fn check_preset(engine: &SoundFontSynth, bank: u8, preset: u8, is_drums: bool) -> Result<()> {
    let bank = preset_bank(bank, is_drums);
    match engine.preset_index(i32::from(bank), i32::from(preset)) {
        Some(_) => Ok(()),
        None => Err(Error::UnknownPreset { bank, preset }),
    }
}

impl SynthEngine for Synth {
    fn output_mode(&self) -> OutputMode {
        OutputMode::StereoInterleaved
    }

    fn render_float(&mut self, out: &mut [f32], frames: usize, mix: bool) {
        let mut mix = mix;
        if self.engines.is_empty() && !mix {
            out.fill(0.0);
            return;
        }
        for engine in self.engines.values_mut() {
            engine.render_float(out, frames, mix);
            mix = true;
        }
    }
}

impl EventSink for Synth {
    fn note_on(&mut self, channel: u8, key: u8, velocity: u8) {
        if !self.noteon(channel, key, velocity) {
            debug!("Note on {} dropped on channel {}", key, channel);
        }
    }

    fn note_off(&mut self, channel: u8, key: u8) {
        if !self.noteoff(channel, key) {
            debug!("Note off {} dropped on channel {}", key, channel);
        }
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        if let Err(e) = Synth::control_change(self, channel, controller, value) {
            debug!("Control change {} dropped: {}", controller, e);
        }
    }

    fn program_change(&mut self, channel: u8, program: u8) {
        let is_drums = channel == PERCUSSION_CHANNEL;
        if let Err(e) = Synth::program_change(self, channel, program, is_drums) {
            debug!("Program change {} dropped: {}", program, e);
        }
    }

    fn pitch_bend(&mut self, channel: u8, value: u16) {
        if let Err(e) = Synth::pitch_bend(self, channel, value) {
            debug!("Pitch bend dropped: {}", e);
        }
    }
}

//! Engine configuration.

use crate::engine::OutputMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Output and voice settings for a synthesis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthConfig {
    pub sample_rate: u32,
    pub output_mode: OutputMode,
    /// Global gain in relative dB (0.0 = unity)
    pub gain_db: f32,
    /// Maximum simultaneous voices. One note may use several.
    pub max_voices: usize,
    /// Internal render block size in frames
    pub block_size: usize,
    pub enable_reverb_and_chorus: bool,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            output_mode: OutputMode::StereoInterleaved,
            gain_db: 0.0,
            max_voices: 256,
            block_size: 64,
            enable_reverb_and_chorus: true,
        }
    }
}

impl SynthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(16000..=192000).contains(&self.sample_rate) {
            return Err(Error::InvalidConfig(format!(
                "sample_rate {} out of range (16000-192000 Hz)",
                self.sample_rate
            )));
        }
        if !(8..=256).contains(&self.max_voices) {
            return Err(Error::InvalidConfig(format!(
                "max_voices {} out of range (8-256)",
                self.max_voices
            )));
        }
        if !(8..=1024).contains(&self.block_size) {
            return Err(Error::InvalidConfig(format!(
                "block_size {} out of range (8-1024)",
                self.block_size
            )));
        }
        if !self.gain_db.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "gain_db {} is not finite",
                self.gain_db
            )));
        }
        Ok(())
    }

    /// Linear gain factor for `gain_db`.
    pub fn gain_factor(&self) -> f32 {
        db_to_gain(self.gain_db)
    }
}

#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

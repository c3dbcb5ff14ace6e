//! Synthesis building blocks for tinysynth.
//!
//! - **[`SynthEngine`]** - Seam between sample generators and the render contract
//! - **[`render_into`] / [`Renderer`]** - Validate caller buffers and dispatch rendering
//! - **[`SynthConfig`]** - Output and voice settings
//! - **[`SoundFontSynth`]** - SoundFont (.sf2) synthesis (feature: `soundfont`)
//!
//! # Quick Start
//!
//! ```ignore
//! use tinysynth_synth::{render_into, RenderRegion, SoundFontSynth, SynthConfig};
//!
//! let mut synth = SoundFontSynth::from_bytes(&sf2_bytes, &SynthConfig::default())?;
//! synth.note_on(0, 60, 100);
//!
//! let mut frames = vec![0.0f32; 512 * 2];
//! render_into(&mut synth, RenderRegion::frames(&mut frames, 2), false)?;
//! ```
//!
//! # Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `soundfont` | SoundFont (.sf2) synthesis |

pub mod error;
pub use error::{Error, Result};

mod config;
pub use config::{db_to_gain, SynthConfig};

mod engine;
pub use engine::{write_samples, OutputMode, SynthEngine};

pub mod render;
pub use render::{
    render_into, resolve_frames, ElementFormat, RegionData, RenderPlan, RenderRegion, Renderer,
};

#[cfg(feature = "soundfont")]
mod soundfont;

#[cfg(feature = "soundfont")]
pub use soundfont::{SoundFontHandle, SoundFontLibrary, SoundFontSynth};

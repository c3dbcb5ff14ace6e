//! Synthesis engine seam.

use serde::{Deserialize, Serialize};

/// Sample layout an engine produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputMode {
    /// Two channels, frames stored as LRLRLR...
    #[default]
    StereoInterleaved,
    /// Two channels, all left samples followed by all right samples
    StereoUnweaved,
    /// One channel
    Mono,
}

impl OutputMode {
    /// 1 for mono, 2 for any stereo layout.
    #[inline]
    pub fn channel_count(&self) -> usize {
        match self {
            OutputMode::Mono => 1,
            OutputMode::StereoInterleaved | OutputMode::StereoUnweaved => 2,
        }
    }
}

/// A sample generator driven by the render contract.
///
/// Implementations advance their voices by exactly `frames` samples per call.
/// Not meant to be driven concurrently; `&mut self` enforces one render (or
/// note/parameter change) at a time per engine.
pub trait SynthEngine {
    /// Current output layout.
    fn output_mode(&self) -> OutputMode;

    /// Produce `frames` frames into `out` laid out per [`output_mode`](Self::output_mode).
    ///
    /// `out` holds exactly `frames * channel_count` samples. With `mix` the
    /// generated samples are added to the existing contents, otherwise they
    /// replace them.
    fn render_float(&mut self, out: &mut [f32], frames: usize, mix: bool);
}

impl<E: SynthEngine + ?Sized> SynthEngine for Box<E> {
    fn output_mode(&self) -> OutputMode {
        (**self).output_mode()
    }

    fn render_float(&mut self, out: &mut [f32], frames: usize, mix: bool) {
        (**self).render_float(out, frames, mix)
    }
}

/// Overwrite or accumulate `src` into `dest`.
#[inline]
pub fn write_samples(dest: &mut [f32], src: &[f32], mix: bool) {
    if mix {
        dest.iter_mut().zip(src).for_each(|(d, s)| *d += s);
    } else {
        dest.copy_from_slice(src);
    }
}

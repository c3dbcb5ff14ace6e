//! Render buffer contract
//!
//! Validates a caller-owned memory region against an engine's output layout
//! and asks the engine for exactly as many frames as the region holds.
//!
//! Two region shapes are accepted:
//! - **1-D bytes**: a raw byte span holding native-endian `f32` samples. Its
//!   length must be a whole number of frames (`4 * channels` bytes each).
//! - **2-D `f32` grid**: shape `(frames, channels)`, where `channels` must
//!   match the engine (1 for mono, 2 for stereo).
//!
//! Validation always completes before any sample is generated, so a rejected
//! region is left untouched.

use crate::engine::{OutputMode, SynthEngine};
use crate::error::{Error, Result};
use smallvec::SmallVec;
use std::fmt;

/// Size of one `f32` sample in bytes.
pub const SAMPLE_BYTES: usize = std::mem::size_of::<f32>();

/// Element type of a render region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementFormat {
    U8,
    I16,
    F32,
    F64,
}

impl ElementFormat {
    pub fn size_bytes(&self) -> usize {
        match self {
            ElementFormat::U8 => 1,
            ElementFormat::I16 => 2,
            ElementFormat::F32 => 4,
            ElementFormat::F64 => 8,
        }
    }
}

impl fmt::Display for ElementFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ElementFormat::U8 => "unsigned char",
            ElementFormat::I16 => "int16",
            ElementFormat::F32 => "float32",
            ElementFormat::F64 => "float64",
        };
        f.write_str(name)
    }
}

/// Typed view over caller-owned memory.
#[derive(Debug)]
pub enum RegionData<'a> {
    U8(&'a mut [u8]),
    I16(&'a mut [i16]),
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
}

impl RegionData<'_> {
    pub fn format(&self) -> ElementFormat {
        match self {
            RegionData::U8(_) => ElementFormat::U8,
            RegionData::I16(_) => ElementFormat::I16,
            RegionData::F32(_) => ElementFormat::F32,
            RegionData::F64(_) => ElementFormat::F64,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            RegionData::U8(data) => data.len(),
            RegionData::I16(data) => data.len(),
            RegionData::F32(data) => data.len(),
            RegionData::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rank-tagged region to render into.
#[derive(Debug)]
pub struct RenderRegion<'a> {
    data: RegionData<'a>,
    shape: SmallVec<[usize; 4]>,
}

impl<'a> RenderRegion<'a> {
    /// Region with an explicit shape (row-major, first axis = samples).
    pub fn new(data: RegionData<'a>, shape: &[usize]) -> Self {
        Self {
            data,
            shape: SmallVec::from_slice(shape),
        }
    }

    /// 1-D raw byte span.
    pub fn bytes(data: &'a mut [u8]) -> Self {
        let len = data.len();
        Self::new(RegionData::U8(data), &[len])
    }

    /// 2-D interleaved `f32` grid of shape `(len / channels, channels)`.
    pub fn frames(data: &'a mut [f32], channels: usize) -> Self {
        let frames = data.len().checked_div(channels).unwrap_or(0);
        Self::new(RegionData::F32(data), &[frames, channels])
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn format(&self) -> ElementFormat {
        self.data.format()
    }
}

/// Outcome of region validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderPlan {
    pub frames: usize,
    pub channels: usize,
}

impl RenderPlan {
    /// Total samples across all channels.
    #[inline]
    pub fn samples(&self) -> usize {
        self.frames * self.channels
    }
}

/// Validate `region` against `mode` and work out the frame count.
pub fn resolve_frames(region: &RenderRegion<'_>, mode: OutputMode) -> Result<RenderPlan> {
    let channels = mode.channel_count();
    let rank = region.rank();

    let frames = match rank {
        1 => {
            expect_format(region, ElementFormat::U8)?;
            expect_element_count(region)?;
            let frame_bytes = SAMPLE_BYTES * channels;
            let len = region.shape[0];
            if len % frame_bytes != 0 {
                return Err(Error::BufferShape(format!(
                    "buffer length {} does not divide evenly into sample frames of {} bytes",
                    len, frame_bytes
                )));
            }
            len / frame_bytes
        }
        2 => {
            expect_format(region, ElementFormat::F32)?;
            if region.shape[1] != channels {
                let expected = if channels == 1 {
                    "1 for mono"
                } else {
                    "2 for stereo"
                };
                return Err(Error::BufferShape(format!(
                    "channel size must be {} (got {})",
                    expected, region.shape[1]
                )));
            }
            expect_element_count(region)?;
            region.shape[0]
        }
        _ => {
            return Err(Error::BufferShape(format!(
                "must be 1 dimensional bytearray or 2 dimensional of size (samples, channels), got {} dimensions",
                rank
            )));
        }
    };

    Ok(RenderPlan { frames, channels })
}

fn expect_format(region: &RenderRegion<'_>, expected: ElementFormat) -> Result<()> {
    let actual = region.format();
    if actual != expected {
        return Err(Error::BufferFormat {
            rank: region.rank(),
            expected,
            actual,
        });
    }
    Ok(())
}

fn expect_element_count(region: &RenderRegion<'_>) -> Result<()> {
    let actual = region.data.len();
    let declared = region
        .shape
        .iter()
        .try_fold(1usize, |total, &dim| total.checked_mul(dim))
        .ok_or_else(|| {
            Error::BufferShape(format!(
                "shape {:?} overflows the addressable element count",
                region.shape()
            ))
        })?;
    if declared != actual {
        return Err(Error::BufferShape(format!(
            "shape {:?} describes {} elements but buffer holds {}",
            region.shape(),
            declared,
            actual
        )));
    }
    Ok(())
}

enum Target<'r> {
    Floats(&'r mut [f32]),
    Bytes(&'r mut [u8]),
}

fn prepare<'r>(region: &'r mut RenderRegion<'_>, mode: OutputMode) -> Result<(RenderPlan, Target<'r>)> {
    let plan = resolve_frames(region, mode)?;
    let rank = region.rank();
    let samples = plan.samples();

    let target = match &mut region.data {
        RegionData::F32(data) => Target::Floats(&mut data[..samples]),
        RegionData::U8(data) => Target::Bytes(&mut data[..samples * SAMPLE_BYTES]),
        other => {
            return Err(Error::BufferFormat {
                rank,
                expected: if rank == 1 {
                    ElementFormat::U8
                } else {
                    ElementFormat::F32
                },
                actual: other.format(),
            });
        }
    };

    Ok((plan, target))
}

/// Render dispatcher that keeps a scratch buffer for byte regions between calls.
#[derive(Debug, Default)]
pub struct Renderer {
    scratch: Vec<f32>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size the scratch buffer to avoid allocating on the first byte render.
    pub fn with_capacity(frames: usize, channels: usize) -> Self {
        Self {
            scratch: Vec::with_capacity(frames * channels),
        }
    }

    /// Fill `region` with `engine` output.
    ///
    /// With `mix` the samples are added to the region's existing contents.
    /// Returns the validated plan; the engine has advanced by `plan.frames`.
    pub fn render<E: SynthEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        mut region: RenderRegion<'_>,
        mix: bool,
    ) -> Result<RenderPlan> {
        let (plan, target) = prepare(&mut region, engine.output_mode())?;

        match target {
            Target::Floats(samples) => engine.render_float(samples, plan.frames, mix),
            Target::Bytes(bytes) => {
                self.scratch.clear();
                if mix {
                    self.scratch.extend(
                        bytes
                            .chunks_exact(SAMPLE_BYTES)
                            .map(|b| f32::from_ne_bytes([b[0], b[1], b[2], b[3]])),
                    );
                } else {
                    self.scratch.resize(plan.samples(), 0.0);
                }

                engine.render_float(&mut self.scratch, plan.frames, mix);

                for (chunk, sample) in bytes.chunks_exact_mut(SAMPLE_BYTES).zip(&self.scratch) {
                    chunk.copy_from_slice(&sample.to_ne_bytes());
                }
            }
        }

        Ok(plan)
    }
}

/// Validate `region` and render into it.
///
/// Convenience over [`Renderer::render`] that allocates its scratch per call.
pub fn render_into<E: SynthEngine + ?Sized>(
    engine: &mut E,
    region: RenderRegion<'_>,
    mix: bool,
) -> Result<()> {
    Renderer::new().render(engine, region, mix).map(|_| ())
}

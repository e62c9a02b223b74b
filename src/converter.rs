//! The externally visible sample rate converter.

use alloc::vec;
use alloc::vec::Vec;

use crate::cascade::{self, CascadePlan, ConfigurationError, Quality};
use crate::fir_interpolator::FirInterpolator;
use crate::iir_decimator::IirDecimator;
use crate::stage::{EngineSource, IirStage, RenderSource, ResampleStage, SampleSource, SincStage};
use crate::{CHANNEL_COUNT, MAX_FRAMES_PER_RUN};

#[derive(Debug)]
enum Chain<R> {
    Sinc(SincStage<EngineSource<R>>),
    Cascade(IirStage<SincStage<EngineSource<R>>>),
}

/// Streaming sample rate converter between a synthesis engine and the host
/// audio device.
///
/// Owns the stage chain decided by the cascade builder; a thin composition
/// root without audio state of its own. All buffers are allocated at
/// construction, the pull path is allocation and lock free. Not re-entrant:
/// the host must serialise calls, which non-overlapping audio callbacks do
/// naturally. Changing rates or quality means dropping the converter and
/// building a new one.
#[derive(Debug)]
pub struct SampleRateConverter<R> {
    chain: Chain<R>,
    scratch: Vec<f32>,
    source_rate: f64,
    target_rate: f64,
    quality: Quality,
    latency_frames: f64,
}

impl<R: RenderSource> SampleRateConverter<R> {
    /// Builds the conversion pipeline for one rate pair and quality grade.
    ///
    /// The engine must produce interleaved stereo frames at `source_rate`.
    /// Fails without side effects when the rate pair is outside the
    /// supported domain.
    pub fn new(
        engine: R,
        source_rate: f64,
        target_rate: f64,
        quality: Quality,
    ) -> Result<Self, ConfigurationError> {
        let plan = cascade::build_cascade(source_rate, target_rate, quality)?;
        let engine = EngineSource::new(engine);

        let (chain, latency_frames) = match plan {
            CascadePlan::SincOnly { kernel } => {
                let latency = kernel.group_delay_frames() / source_rate * target_rate;
                let stage = ResampleStage::new(FirInterpolator::new(kernel), engine);
                (Chain::Sinc(stage), latency)
            }
            CascadePlan::WithDecimator {
                kernel,
                coefficients,
                decimation_factor,
            } => {
                let intermediate_rate = decimation_factor as f64 * target_rate;
                let latency = (kernel.group_delay_frames() / source_rate
                    + 0.5 * coefficients.order() as f64 / intermediate_rate)
                    * target_rate;
                let sinc = ResampleStage::new(FirInterpolator::new(kernel), engine);
                let iir = ResampleStage::new(
                    IirDecimator::new(coefficients, decimation_factor),
                    sinc,
                );
                (Chain::Cascade(iir), latency)
            }
        };

        Ok(Self {
            chain,
            scratch: vec![0.0; MAX_FRAMES_PER_RUN * CHANNEL_COUNT],
            source_rate,
            target_rate,
            quality,
            latency_frames,
        })
    }

    /// Fills `buffer` with interleaved stereo samples at the target rate.
    pub fn get_output_samples(&mut self, buffer: &mut [f32]) {
        match &mut self.chain {
            Chain::Sinc(stage) => stage.get_output_samples(buffer),
            Chain::Cascade(stage) => stage.get_output_samples(buffer),
        }
    }

    /// Fixed-point output path: the same stream with saturating 16-bit
    /// conversion through a pre-allocated scratch buffer.
    pub fn get_output_samples_i16(&mut self, buffer: &mut [i16]) {
        debug_assert_eq!(buffer.len() % CHANNEL_COUNT, 0);

        let Self {
            chain, scratch, ..
        } = self;
        let mut filled = 0;
        while filled < buffer.len() {
            let run = (buffer.len() - filled).min(scratch.len());
            let scratch = &mut scratch[..run];
            match chain {
                Chain::Sinc(stage) => stage.get_output_samples(scratch),
                Chain::Cascade(stage) => stage.get_output_samples(scratch),
            }
            for (out, sample) in buffer[filled..filled + run].iter_mut().zip(scratch.iter()) {
                *out = clip_16((*sample * 32768.0) as i32) as i16;
            }
            filled += run;
        }
    }

    pub fn source_rate(&self) -> f64 {
        self.source_rate
    }

    pub fn target_rate(&self) -> f64 {
        self.target_rate
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    /// True when the cascade includes the recursive decimation stage.
    pub fn uses_decimator(&self) -> bool {
        matches!(self.chain, Chain::Cascade(_))
    }

    /// Estimated group delay of the whole cascade, in output frames.
    pub fn latency_frames(&self) -> f64 {
        self.latency_frames
    }

    /// Frames of silence inserted to cover synthesis engine shortfalls.
    pub fn shortfall_frames(&self) -> u64 {
        self.engine_source().shortfall_frames()
    }

    pub fn engine(&self) -> &R {
        self.engine_source().engine()
    }

    pub fn engine_mut(&mut self) -> &mut R {
        match &mut self.chain {
            Chain::Sinc(stage) => stage.source_mut().engine_mut(),
            Chain::Cascade(stage) => stage.source_mut().source_mut().engine_mut(),
        }
    }

    fn engine_source(&self) -> &EngineSource<R> {
        match &self.chain {
            Chain::Sinc(stage) => stage.source(),
            Chain::Cascade(stage) => stage.source().source(),
        }
    }
}

#[inline]
fn clip_16(x: i32) -> i32 {
    x.clamp(-32768, 32767)
}

//! Pull-based stage plumbing between the synthesis engine and the host.

use alloc::vec;
use alloc::vec::Vec;

use crate::fir_interpolator::FirInterpolator;
use crate::iir_decimator::IirDecimator;
use crate::{CHANNEL_COUNT, MAX_FRAMES_PER_RUN};

/// Pull source of interleaved stereo samples at some fixed rate.
pub trait SampleSource {
    /// Fills `buffer` completely. Blocks computationally until satisfied;
    /// never on I/O, locks or allocation.
    fn get_output_samples(&mut self, buffer: &mut [f32]);
}

/// The synthesis engine seam at the bottom of the chain.
pub trait RenderSource {
    /// Renders interleaved stereo frames at the engine's fixed native rate
    /// and returns the number of frames actually rendered. Anything short
    /// of `buffer.len() / 2` is padded with silence by the pipeline.
    fn render(&mut self, buffer: &mut [f32]) -> usize;
}

/// The closed set of filters a stage can drive.
pub trait ResampleFilter {
    fn estimate_in_length(&self, out_frames: usize) -> usize;
    fn process(&mut self, input: &[f32], output: &mut [f32]) -> (usize, usize);
}

impl ResampleFilter for FirInterpolator {
    fn estimate_in_length(&self, out_frames: usize) -> usize {
        FirInterpolator::estimate_in_length(self, out_frames)
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) -> (usize, usize) {
        FirInterpolator::process(self, input, output)
    }
}

impl ResampleFilter for IirDecimator {
    fn estimate_in_length(&self, out_frames: usize) -> usize {
        IirDecimator::estimate_in_length(self, out_frames)
    }

    fn process(&mut self, input: &[f32], output: &mut [f32]) -> (usize, usize) {
        IirDecimator::process(self, input, output)
    }
}

/// Adapter giving one filter the uniform pull contract.
///
/// Owns the upstream source and a fixed staging buffer, refilled with
/// `estimate_in_length`-sized pulls whenever it runs dry. Frames the filter
/// leaves unconsumed stay buffered for the next call.
#[derive(Debug)]
pub struct ResampleStage<F, S> {
    filter: F,
    source: S,
    in_buffer: Vec<f32>,
    in_position: usize,
    in_length: usize,
}

/// Windowed-sinc interpolation stage.
pub type SincStage<S> = ResampleStage<FirInterpolator, S>;

/// Recursive decimation stage.
pub type IirStage<S> = ResampleStage<IirDecimator, S>;

impl<F: ResampleFilter, S: SampleSource> ResampleStage<F, S> {
    pub fn new(filter: F, source: S) -> Self {
        Self {
            filter,
            source,
            in_buffer: vec![0.0; MAX_FRAMES_PER_RUN * CHANNEL_COUNT],
            in_position: 0,
            in_length: 0,
        }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

impl<F: ResampleFilter, S: SampleSource> SampleSource for ResampleStage<F, S> {
    fn get_output_samples(&mut self, buffer: &mut [f32]) {
        debug_assert_eq!(buffer.len() % CHANNEL_COUNT, 0);

        let mut filled = 0;
        while filled < buffer.len() {
            if self.in_length == 0 {
                // An estimate of zero means the filter can still emit from
                // its current phase without new input.
                let wanted = self
                    .filter
                    .estimate_in_length((buffer.len() - filled) / CHANNEL_COUNT)
                    .min(MAX_FRAMES_PER_RUN);
                if wanted > 0 {
                    self.source
                        .get_output_samples(&mut self.in_buffer[..wanted * CHANNEL_COUNT]);
                }
                self.in_position = 0;
                self.in_length = wanted;
            }

            let input = &self.in_buffer
                [self.in_position * CHANNEL_COUNT..(self.in_position + self.in_length) * CHANNEL_COUNT];
            let (consumed, produced) = self.filter.process(input, &mut buffer[filled..]);
            self.in_position += consumed;
            self.in_length -= consumed;
            filled += produced * CHANNEL_COUNT;
        }
    }
}

/// Bottom of the chain: adapts the synthesis engine to the pull contract,
/// padding short renders with silence so downstream stages always see full
/// buffers.
#[derive(Debug)]
pub struct EngineSource<R> {
    engine: R,
    shortfall_frames: u64,
}

impl<R: RenderSource> EngineSource<R> {
    pub fn new(engine: R) -> Self {
        Self {
            engine,
            shortfall_frames: 0,
        }
    }

    pub fn engine(&self) -> &R {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut R {
        &mut self.engine
    }

    /// Frames of silence inserted so far to cover upstream shortfalls.
    pub fn shortfall_frames(&self) -> u64 {
        self.shortfall_frames
    }
}

impl<R: RenderSource> SampleSource for EngineSource<R> {
    fn get_output_samples(&mut self, buffer: &mut [f32]) {
        let frames = buffer.len() / CHANNEL_COUNT;
        let rendered = self.engine.render(buffer).min(frames);
        if rendered < frames {
            // Keep the stream rolling; the gap is audible but bounded.
            buffer[rendered * CHANNEL_COUNT..].fill(0.0);
            self.shortfall_frames += (frames - rendered) as u64;
            log::warn!(
                "engine rendered {} of {} frames, padding with silence",
                rendered,
                frames
            );
        }
    }
}

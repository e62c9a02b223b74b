//! Recursive anti-aliasing decimation stage.

use alloc::vec::Vec;

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::delay_line::RingDelayLine;
use crate::CHANNEL_COUNT;

/// Immutable direct-form coefficients of the decimation filter.
///
/// Both tables hold `order + 1` entries; the denominator is normalised so
/// that `denominator[0] == 1`.
#[derive(Debug, Clone)]
pub struct IirCoefficients {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    order: usize,
}

impl IirCoefficients {
    pub fn new(numerator: Vec<f64>, denominator: Vec<f64>) -> Self {
        debug_assert!(!denominator.is_empty());
        debug_assert_eq!(numerator.len(), denominator.len());
        debug_assert!((denominator[0] - 1.0).abs() < 1e-12);

        let order = denominator.len() - 1;

        Self {
            numerator,
            denominator,
            order,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }
}

/// Streaming decimator: every input frame passes through the recursive
/// difference equation, every `decimation_factor`-th result is emitted.
///
/// The pull/production ratio is driven by the same phase-accumulator scheme
/// as the interpolator, restricted to integer phases since decimation
/// ratios are always integral here. Working samples are kept at `f64` while
/// the stream stays `f32`.
#[derive(Debug)]
pub struct IirDecimator {
    coefficients: IirCoefficients,
    delay_line: RingDelayLine<f64>,
    decimation_factor: u32,
    phase: u32,
}

impl IirDecimator {
    pub fn new(coefficients: IirCoefficients, decimation_factor: u32) -> Self {
        debug_assert!(decimation_factor > 0);

        let delay_line = RingDelayLine::new(coefficients.order + 1);
        let phase = decimation_factor;

        Self {
            coefficients,
            delay_line,
            decimation_factor,
            phase,
        }
    }

    pub fn coefficients(&self) -> &IirCoefficients {
        &self.coefficients
    }

    pub fn decimation_factor(&self) -> u32 {
        self.decimation_factor
    }

    /// Input frames that must be supplied before `out_frames` output frames
    /// can be produced from the current phase.
    pub fn estimate_in_length(&self, out_frames: usize) -> usize {
        out_frames * self.decimation_factor as usize + self.phase as usize
    }

    /// Same resumable contract as
    /// [`FirInterpolator::process`](crate::fir_interpolator::FirInterpolator::process).
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> (usize, usize) {
        debug_assert_eq!(input.len() % CHANNEL_COUNT, 0);
        debug_assert_eq!(output.len() % CHANNEL_COUNT, 0);

        let in_frames = input.len() / CHANNEL_COUNT;
        let out_frames = output.len() / CHANNEL_COUNT;
        let mut consumed = 0;
        let mut produced = 0;

        while produced < out_frames {
            while self.need_next_in_frame() {
                if consumed == in_frames {
                    return (consumed, produced);
                }
                let base = consumed * CHANNEL_COUNT;
                self.add_in_frame([input[base], input[base + 1]]);
                consumed += 1;
            }
            let frame = self.next_out_frame();
            output[produced * CHANNEL_COUNT..][..CHANNEL_COUNT].copy_from_slice(&frame);
            produced += 1;
        }

        (consumed, produced)
    }

    #[inline]
    fn need_next_in_frame(&self) -> bool {
        self.phase >= 1
    }

    /// Direct form II: one history of intermediate samples serves both the
    /// numerator and denominator sums.
    #[inline]
    fn add_in_frame(&mut self, frame: [f32; CHANNEL_COUNT]) {
        let coefficients = &self.coefficients;
        let mut working = [frame[0] as f64, frame[1] as f64];
        for k in 1..=coefficients.order {
            let past = self.delay_line.read(k - 1);
            for (w, sample) in working.iter_mut().zip(past) {
                *w -= coefficients.denominator[k] * sample;
            }
        }
        self.delay_line.push(working);
        self.phase -= 1;
    }

    #[inline]
    fn next_out_frame(&mut self) -> [f32; CHANNEL_COUNT] {
        let coefficients = &self.coefficients;
        let mut frame = [0.0_f64; CHANNEL_COUNT];
        for k in 0..=coefficients.order {
            let past = self.delay_line.read(k);
            for (out, sample) in frame.iter_mut().zip(past) {
                *out += coefficients.numerator[k] * sample;
            }
        }
        self.phase += self.decimation_factor;

        [frame[0] as f32, frame[1] as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel_design::design_decimator;

    fn constant_input(frames: usize, value: f32) -> Vec<f32> {
        let mut input = Vec::with_capacity(frames * CHANNEL_COUNT);
        for _ in 0..frames {
            input.push(value);
            input.push(-value);
        }
        input
    }

    #[test]
    fn halves_the_frame_rate() {
        let mut decimator = IirDecimator::new(design_decimator(4), 2);
        let input = constant_input(400, 1.0);
        let mut output = vec![0.0; 200 * CHANNEL_COUNT];
        let (consumed, produced) = decimator.process(&input, &mut output);

        assert_eq!(consumed, 400);
        assert_eq!(produced, 200);
    }

    #[test]
    fn settles_to_unity_dc_gain() {
        let mut decimator = IirDecimator::new(design_decimator(8), 2);
        let input = constant_input(2000, 0.5);
        let mut output = vec![0.0; 1000 * CHANNEL_COUNT];
        decimator.process(&input, &mut output);

        let tail = &output[output.len() - 2 * CHANNEL_COUNT..];
        for frame in tail.chunks_exact(CHANNEL_COUNT) {
            assert!((frame[0] - 0.5).abs() < 1e-3);
            assert!((frame[1] + 0.5).abs() < 1e-3);
        }
    }

    #[test]
    fn estimate_covers_actual_demand() {
        let mut decimator = IirDecimator::new(design_decimator(4), 2);
        let estimated = decimator.estimate_in_length(100);
        assert_eq!(estimated, 202);

        let input = constant_input(estimated, 1.0);
        let mut output = vec![0.0; 100 * CHANNEL_COUNT];
        let (consumed, produced) = decimator.process(&input, &mut output);
        assert_eq!(produced, 100);
        assert!(consumed <= estimated);
    }

    #[test]
    fn starved_call_leaves_state_untouched() {
        let mut decimator = IirDecimator::new(design_decimator(4), 2);
        let (consumed, produced) = decimator.process(&[], &mut [0.0; 8]);
        assert_eq!((consumed, produced), (0, 0));
        assert_eq!(decimator.phase, 2);
    }
}

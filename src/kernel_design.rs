//! Filter design for the cascade builder.
//!
//! Windowed-sinc prototypes for the polyphase interpolator and Butterworth
//! prototypes for the decimator, computed once when a pipeline is built.
//! Nothing here runs on the streaming path.

use alloc::vec;
use alloc::vec::Vec;

use core::f64::consts::{PI, TAU};

#[allow(unused_imports)]
use num_traits::float::Float;

use crate::fir_interpolator::FirKernel;
use crate::iir_decimator::IirCoefficients;

/// Largest exact upsample factor the rational search will accept.
pub const MAX_UPSAMPLE_FACTOR: u32 = 512;

/// Phase count of the fallback kernel used when the ratio has no small
/// exact rational form and taps are interpolated between adjacent phases.
pub const INTERPOLATED_PHASE_COUNT: u32 = 256;

const RATIO_EPSILON: f64 = 1e-9;

/// Resampling ratio expressed for the polyphase filter: the output rate is
/// the input rate times `phases / increment`.
#[derive(Debug, Clone, Copy)]
pub struct ResampleRatio {
    pub phases: u32,
    pub increment: f64,
}

/// Finds the smallest exact rational `phases / increment` form of
/// `target_rate / source_rate`, or falls back to a fixed phase count with a
/// fractional increment.
pub fn rational_approximation(source_rate: f64, target_rate: f64) -> ResampleRatio {
    for phases in 1..=MAX_UPSAMPLE_FACTOR {
        let increment = phases as f64 * source_rate / target_rate;
        if (increment - increment.round()).abs() < RATIO_EPSILON * increment {
            return ResampleRatio {
                phases,
                increment: increment.round(),
            };
        }
    }

    ResampleRatio {
        phases: INTERPOLATED_PHASE_COUNT,
        increment: INTERPOLATED_PHASE_COUNT as f64 * source_rate / target_rate,
    }
}

/// Kaiser window shape parameter for a stopband attenuation in dB.
fn kaiser_beta(attenuation_db: f64) -> f64 {
    if attenuation_db > 50.0 {
        0.1102 * (attenuation_db - 8.7)
    } else if attenuation_db >= 21.0 {
        0.5842 * (attenuation_db - 21.0).powf(0.4) + 0.07886 * (attenuation_db - 21.0)
    } else {
        0.0
    }
}

/// Zeroth-order modified Bessel function of the first kind, by power
/// series.
fn bessel_i0(x: f64) -> f64 {
    let half = x / 2.0;
    let mut sum = 1.0;
    let mut term = 1.0;
    let mut n = 1;
    loop {
        let factor = half / n as f64;
        term *= factor * factor;
        sum += term;
        if term < 1e-12 * sum {
            return sum;
        }
        n += 1;
    }
}

/// Designs the windowed-sinc kernel for one interpolation stage.
///
/// `passband` and `stopband` are absolute frequencies in Hz, `db_snr` the
/// stopband attenuation target. The kernel operates at the virtual rate
/// `source_rate * ratio.phases`; the tap count follows the Kaiser estimate
/// for the transition width at that rate, and the taps are scaled by the
/// phase count to restore unity passband gain after zero stuffing.
pub fn design_sinc_kernel(
    source_rate: f64,
    ratio: ResampleRatio,
    passband: f64,
    stopband: f64,
    db_snr: f64,
) -> FirKernel {
    debug_assert!(passband < stopband);

    let virtual_rate = source_rate * ratio.phases as f64;
    debug_assert!(stopband <= 0.5 * virtual_rate);
    let transition = TAU * (stopband - passband) / virtual_rate;
    let length = (((db_snr - 7.95) / (2.285 * transition)).ceil() as usize)
        .max(2 * ratio.phases as usize);

    let beta = kaiser_beta(db_snr);
    let i0_beta = bessel_i0(beta);
    let cutoff = TAU * 0.5 * (passband + stopband) / virtual_rate;
    let center = (length - 1) as f64 / 2.0;
    let gain = ratio.phases as f64;

    let mut taps = Vec::with_capacity(length);
    for i in 0..length {
        let x = i as f64 - center;
        let sinc = if x.abs() < 1e-12 {
            cutoff / PI
        } else {
            (cutoff * x).sin() / (PI * x)
        };
        let span = 2.0 * i as f64 / (length - 1) as f64 - 1.0;
        let window = bessel_i0(beta * (1.0 - span * span).sqrt()) / i0_beta;
        taps.push((gain * sinc * window) as f32);
    }

    FirKernel::new(ratio.phases, ratio.increment, taps)
}

/// Butterworth low-pass prototype for the decimator, with the cutoff at a
/// quarter of the stage input rate (the passband edge after 2x
/// decimation).
///
/// Built from cookbook biquads; at this cutoff every biquad's middle
/// denominator term vanishes, which keeps the expanded polynomial sparse
/// and well conditioned at the orders used.
pub fn design_decimator(order: usize) -> IirCoefficients {
    debug_assert!(order >= 2 && order % 2 == 0);

    let mut numerator = vec![1.0];
    let mut denominator = vec![1.0];

    for k in 0..order / 2 {
        // Pole quality of the k-th Butterworth pair.
        let theta = (2 * k + 1) as f64 * PI / (2.0 * order as f64);
        let q = 1.0 / (2.0 * theta.cos());

        // Cookbook low pass at w0 = pi/2: cos(w0) = 0, sin(w0) = 1.
        let alpha = 1.0 / (2.0 * q);
        let a0 = 1.0 + alpha;
        let b = [0.5 / a0, 1.0 / a0, 0.5 / a0];
        let a = [1.0, 0.0, (1.0 - alpha) / a0];

        numerator = convolve(&numerator, &b);
        denominator = convolve(&denominator, &a);
    }

    IirCoefficients::new(numerator, denominator)
}

fn convolve(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rational_search_prefers_small_exact_ratios() {
        let ratio = rational_approximation(32000.0, 48000.0);
        assert_eq!(ratio.phases, 3);
        assert_eq!(ratio.increment, 2.0);

        let ratio = rational_approximation(96000.0, 96000.0);
        assert_eq!(ratio.phases, 1);
        assert_eq!(ratio.increment, 1.0);

        let ratio = rational_approximation(32000.0, 44100.0);
        assert_eq!(ratio.phases, 441);
        assert_eq!(ratio.increment, 320.0);
    }

    #[test]
    fn irrational_ratio_falls_back_to_phase_interpolation() {
        let ratio = rational_approximation(32000.0, 48001.3);
        assert_eq!(ratio.phases, INTERPOLATED_PHASE_COUNT);
        assert!(ratio.increment.fract() != 0.0);
    }

    #[test]
    fn bessel_series_matches_known_values() {
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        // I0(1) = 1.2660658..., I0(2) = 2.2795853...
        assert!((bessel_i0(1.0) - 1.266_065_877_7).abs() < 1e-9);
        assert!((bessel_i0(2.0) - 2.279_585_302_3).abs() < 1e-9);
    }

    #[test]
    fn sinc_kernel_has_unity_dc_gain_per_phase() {
        let ratio = rational_approximation(32000.0, 48000.0);
        let kernel = design_sinc_kernel(32000.0, ratio, 8000.0, 12000.0, 70.0);

        // The taps sum to the phase count when each polyphase branch passes
        // DC at unity.
        let sum: f32 = kernel.taps().iter().sum();
        assert!((sum - ratio.phases as f32).abs() < 0.05 * ratio.phases as f32);
    }

    #[test]
    fn decimator_polynomials_expand_consistently() {
        let coefficients = design_decimator(4);
        assert_eq!(coefficients.order(), 4);

        // Odd denominator powers vanish at the quarter-rate cutoff.
        assert!(coefficients.denominator()[1].abs() < 1e-12);
        assert!(coefficients.denominator()[3].abs() < 1e-12);

        // Unity gain at DC: the numerator and denominator sums agree.
        let gain: f64 = coefficients.numerator().iter().sum::<f64>()
            / coefficients.denominator().iter().sum::<f64>();
        assert!((gain - 1.0).abs() < 1e-9);
    }
}

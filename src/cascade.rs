//! Cascade construction policy.
//!
//! Inspects the rate pair and the quality grade's audible-bandwidth policy
//! to decide whether the windowed-sinc stage suffices on its own or needs a
//! recursive decimation stage behind it, then designs the filters for the
//! chosen topology.

use core::fmt;

use crate::fir_interpolator::FirKernel;
use crate::iir_decimator::IirCoefficients;
use crate::kernel_design;

/// Quality grades of the conversion, trading audible bandwidth and stopband
/// depth for per-sample cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    Fastest,
    Fast,
    Good,
    Best,
}

/// Audible-bandwidth policy of one quality grade.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BandwidthPolicy {
    /// Band preserved unattenuated, Hz.
    pub passband: f64,
    /// Edge above which aliasing products must be suppressed, Hz.
    pub stopband: f64,
    /// Stopband attenuation target, dB.
    pub db_snr: f64,
    /// Order of the recursive decimation filter when one is needed.
    pub decimator_order: usize,
}

impl Quality {
    pub(crate) fn policy(self) -> BandwidthPolicy {
        match self {
            Quality::Fastest => BandwidthPolicy {
                passband: 8_000.0,
                stopband: 12_000.0,
                db_snr: 70.0,
                decimator_order: 4,
            },
            Quality::Fast => BandwidthPolicy {
                passband: 12_000.0,
                stopband: 16_000.0,
                db_snr: 80.0,
                decimator_order: 6,
            },
            Quality::Good => BandwidthPolicy {
                passband: 16_000.0,
                stopband: 24_000.0,
                db_snr: 90.0,
                decimator_order: 8,
            },
            Quality::Best => BandwidthPolicy {
                passband: 20_000.0,
                stopband: 28_000.0,
                db_snr: 100.0,
                decimator_order: 10,
            },
        }
    }
}

/// Construction failure: the requested rate pair is outside the supported
/// domain for the chosen quality grade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigurationError {
    /// A rate was zero, negative or non-finite.
    InvalidRate { rate: f64 },
    /// The target rate exceeds the source rate while the source does not
    /// oversample the quality grade's audible band; honouring the policy
    /// would need the anti-aliasing cascade, which only downsamples.
    TargetRateAboveSource { source_rate: f64, target_rate: f64 },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::InvalidRate { rate } => {
                write!(f, "invalid sample rate: {rate} Hz")
            }
            ConfigurationError::TargetRateAboveSource {
                source_rate,
                target_rate,
            } => write!(
                f,
                "target rate {target_rate} Hz exceeds source rate {source_rate} Hz"
            ),
        }
    }
}

impl core::error::Error for ConfigurationError {}

/// Stage topology decided for one rate pair, ready to instantiate.
#[derive(Debug)]
pub enum CascadePlan {
    /// One windowed-sinc stage converts directly to the target rate.
    SincOnly { kernel: FirKernel },
    /// The sinc stage converts to a multiple of the target rate and a
    /// recursive decimator brings it down the rest of the way.
    WithDecimator {
        kernel: FirKernel,
        coefficients: IirCoefficients,
        decimation_factor: u32,
    },
}

const DECIMATION_FACTOR: u32 = 2;

/// Decides the stage topology for a rate pair and designs its filters.
pub fn build_cascade(
    source_rate: f64,
    target_rate: f64,
    quality: Quality,
) -> Result<CascadePlan, ConfigurationError> {
    for rate in [source_rate, target_rate] {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(ConfigurationError::InvalidRate { rate });
        }
    }

    let policy = quality.policy();

    if source_rate >= 2.0 * policy.stopband && 2.0 * target_rate >= source_rate {
        // The source already oversamples the audible band and the target
        // keeps at least half of it: truncating the sinc response at the
        // target rate folds nothing back below the passband edge.
        let ratio = kernel_design::rational_approximation(source_rate, target_rate);
        let kernel = kernel_design::design_sinc_kernel(
            source_rate,
            ratio,
            policy.passband,
            policy.stopband,
            policy.db_snr,
        );
        log::debug!(
            "sinc-only cascade: {} Hz -> {} Hz, {} phases, {} taps",
            source_rate,
            target_rate,
            ratio.phases,
            kernel.length(),
        );
        Ok(CascadePlan::SincOnly { kernel })
    } else if source_rate < target_rate {
        Err(ConfigurationError::TargetRateAboveSource {
            source_rate,
            target_rate,
        })
    } else {
        let intermediate_rate = DECIMATION_FACTOR as f64 * target_rate;
        let ratio = kernel_design::rational_approximation(source_rate, intermediate_rate);
        let passband = policy.passband.min(0.45 * target_rate);
        let stopband = policy.stopband.min(target_rate);
        let kernel =
            kernel_design::design_sinc_kernel(source_rate, ratio, passband, stopband, policy.db_snr);
        let coefficients = kernel_design::design_decimator(policy.decimator_order);
        log::debug!(
            "decimating cascade: {} Hz -> {} Hz -> {} Hz, {} taps, order {}",
            source_rate,
            intermediate_rate,
            target_rate,
            kernel.length(),
            coefficients.order(),
        );
        Ok(CascadePlan::WithDecimator {
            kernel,
            coefficients,
            decimation_factor: DECIMATION_FACTOR,
        })
    }
}

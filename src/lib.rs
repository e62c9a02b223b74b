#![doc = include_str!("../README.md")]
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod cascade;
pub mod converter;
pub mod delay_line;
pub mod fir_interpolator;
pub mod iir_decimator;
pub mod kernel_design;
pub mod stage;

pub use cascade::{ConfigurationError, Quality};
pub use converter::SampleRateConverter;
pub use stage::{RenderSource, SampleSource};

/// Number of interleaved channels in every sample buffer.
pub const CHANNEL_COUNT: usize = 2;

/// Upper bound on the frames pulled from an upstream source in one call.
pub const MAX_FRAMES_PER_RUN: usize = 4096;

//! Black-box tests for the converter facade.

use synth_resampler::{ConfigurationError, Quality, RenderSource, SampleRateConverter};

const CHANNEL_COUNT: usize = 2;

/// Deterministic wideband engine counting every render call.
#[derive(Debug)]
struct NoiseEngine {
    state: u32,
    render_calls: usize,
    frames_rendered: usize,
}

impl NoiseEngine {
    fn new() -> Self {
        Self {
            state: 0x1234_5678,
            render_calls: 0,
            frames_rendered: 0,
        }
    }
}

impl RenderSource for NoiseEngine {
    fn render(&mut self, buffer: &mut [f32]) -> usize {
        for sample in buffer.iter_mut() {
            self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            *sample = (self.state >> 8) as f32 / 8_388_608.0 - 1.0;
        }
        self.render_calls += 1;
        let frames = buffer.len() / CHANNEL_COUNT;
        self.frames_rendered += frames;
        frames
    }
}

#[test]
fn conservation_over_many_irregular_pulls() {
    let mut converter =
        SampleRateConverter::new(NoiseEngine::new(), 32000.0, 48000.0, Quality::Fastest).unwrap();

    // Pull well past 10000 frames in irregular chunk sizes; every buffer
    // must come back completely written, with no drops or duplicates
    // showing up as unwritten samples.
    let mut requested_frames = 0;
    let mut chunk = 1;
    while requested_frames < 12000 {
        let frames = chunk % 257 + 1;
        let mut buffer = vec![f32::NAN; frames * CHANNEL_COUNT];
        converter.get_output_samples(&mut buffer);
        assert!(buffer.iter().all(|sample| sample.is_finite()));
        requested_frames += frames;
        chunk += 41;
    }

    // 2/3 ratio: input consumption tracks output production, with at most
    // the filter history plus one estimation round of slack.
    let consumed = converter.engine().frames_rendered;
    let expected = requested_frames * 2 / 3;
    assert!(consumed >= expected);
    assert!(consumed <= expected + 4096);
}

#[test]
fn identical_runs_are_bit_identical() {
    let mut outputs = Vec::new();
    for chunk_frames in [64, 250] {
        let mut converter =
            SampleRateConverter::new(NoiseEngine::new(), 32000.0, 48000.0, Quality::Fastest)
                .unwrap();
        let mut collected = Vec::new();
        let mut buffer = vec![0.0; chunk_frames * CHANNEL_COUNT];
        while collected.len() < 9600 * CHANNEL_COUNT {
            converter.get_output_samples(&mut buffer);
            collected.extend_from_slice(&buffer);
        }
        collected.truncate(9600 * CHANNEL_COUNT);
        outputs.push(collected);
    }

    // The stream is a pure function of the input and the construction
    // parameters; even the host's chunking must not leak into it.
    assert_eq!(outputs[0], outputs[1]);
}

#[test]
fn fastest_upsampling_stays_sinc_only() {
    let mut converter =
        SampleRateConverter::new(NoiseEngine::new(), 32000.0, 48000.0, Quality::Fastest).unwrap();
    assert!(!converter.uses_decimator());

    // 100 output frames at ratio 3/2 from the initial phase need exactly
    // floor((100 * 2 + 3) / 3) = 67 input frames, fetched in one pull.
    let mut buffer = vec![0.0; 100 * CHANNEL_COUNT];
    converter.get_output_samples(&mut buffer);
    assert_eq!(converter.engine().render_calls, 1);
    assert_eq!(converter.engine().frames_rendered, 67);
}

#[test]
fn deep_downsampling_uses_the_decimator() {
    let converter =
        SampleRateConverter::new(NoiseEngine::new(), 96000.0, 32000.0, Quality::Good).unwrap();
    assert!(converter.uses_decimator());
    assert!(converter.latency_frames() > 0.0);
}

#[test]
fn unsupported_rate_pairs_fail_without_a_pipeline() {
    let err = SampleRateConverter::new(NoiseEngine::new(), 32000.0, 48000.0, Quality::Best)
        .unwrap_err();
    assert_eq!(
        err,
        ConfigurationError::TargetRateAboveSource {
            source_rate: 32000.0,
            target_rate: 48000.0,
        }
    );

    let err = SampleRateConverter::new(NoiseEngine::new(), 0.0, 48000.0, Quality::Good)
        .unwrap_err();
    assert!(matches!(err, ConfigurationError::InvalidRate { .. }));
}

/// Engine with a fixed frame budget, silent after it runs out.
struct DryingEngine {
    budget: usize,
}

impl RenderSource for DryingEngine {
    fn render(&mut self, buffer: &mut [f32]) -> usize {
        let frames = (buffer.len() / CHANNEL_COUNT).min(self.budget);
        for frame in buffer[..frames * CHANNEL_COUNT].chunks_exact_mut(CHANNEL_COUNT) {
            frame[0] = 0.5;
            frame[1] = -0.5;
        }
        self.budget -= frames;
        frames
    }
}

#[test]
fn engine_shortfall_is_padded_and_counted() {
    let mut converter =
        SampleRateConverter::new(DryingEngine { budget: 40 }, 48000.0, 48000.0, Quality::Fastest)
            .unwrap();
    assert_eq!(converter.shortfall_frames(), 0);

    // Unity ratio, initial phase 1: 100 output frames pull 101 input
    // frames, of which the engine covers only 40.
    let mut buffer = vec![f32::NAN; 100 * CHANNEL_COUNT];
    converter.get_output_samples(&mut buffer);
    assert_eq!(converter.shortfall_frames(), 61);

    // The stream keeps rolling through the gap and decays to silence once
    // the filter history holds nothing but padding.
    assert!(buffer.iter().all(|sample| sample.is_finite()));
    for sample in &buffer[92 * CHANNEL_COUNT..] {
        assert_eq!(*sample, 0.0);
    }
}

/// Engine stuck at a level beyond full scale.
struct HotEngine;

impl RenderSource for HotEngine {
    fn render(&mut self, buffer: &mut [f32]) -> usize {
        for frame in buffer.chunks_exact_mut(CHANNEL_COUNT) {
            frame[0] = 2.0;
            frame[1] = -2.0;
        }
        buffer.len() / CHANNEL_COUNT
    }
}

#[test]
fn fixed_point_output_saturates() {
    let mut converter =
        SampleRateConverter::new(HotEngine, 48000.0, 48000.0, Quality::Fastest).unwrap();

    let mut buffer = vec![0; 400 * CHANNEL_COUNT];
    converter.get_output_samples_i16(&mut buffer);

    // Past the filter transient, a stream at twice full scale pins both
    // channels to the 16-bit rails.
    for frame in buffer[200 * CHANNEL_COUNT..].chunks_exact(CHANNEL_COUNT) {
        assert_eq!(frame, [i16::MAX, i16::MIN]);
    }
}

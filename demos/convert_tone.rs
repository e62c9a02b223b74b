//! Renders a synthetic engine tone through the conversion pipeline and
//! writes the result as a WAV file under `out/`.

use simple_logger::SimpleLogger;

use synth_resampler::{Quality, RenderSource, SampleRateConverter};

const SOURCE_RATE: f64 = 96000.0;
const TARGET_RATE: f64 = 44100.0;
const BLOCK_SIZE: usize = 256;
const DURATION: f64 = 2.0;

/// Detuned saw pair standing in for the synthesis engine.
struct ToneEngine {
    phase_left: f64,
    phase_right: f64,
}

impl RenderSource for ToneEngine {
    fn render(&mut self, buffer: &mut [f32]) -> usize {
        for frame in buffer.chunks_exact_mut(2) {
            frame[0] = (2.0 * self.phase_left - 1.0) as f32 * 0.25;
            frame[1] = (2.0 * self.phase_right - 1.0) as f32 * 0.25;
            self.phase_left = (self.phase_left + 110.0 / SOURCE_RATE).fract();
            self.phase_right = (self.phase_right + 110.5 / SOURCE_RATE).fract();
        }
        buffer.len() / 2
    }
}

fn main() {
    SimpleLogger::new()
        .with_level(log::LevelFilter::Debug)
        .init()
        .unwrap();

    let engine = ToneEngine {
        phase_left: 0.0,
        phase_right: 0.0,
    };
    let mut converter =
        SampleRateConverter::new(engine, SOURCE_RATE, TARGET_RATE, Quality::Good).unwrap();

    let frames = (DURATION * TARGET_RATE) as usize;
    let mut samples = Vec::with_capacity(frames * 2);
    let mut block = [0.0; BLOCK_SIZE * 2];
    while samples.len() < frames * 2 {
        converter.get_output_samples(&mut block);
        samples.extend_from_slice(&block);
    }
    samples.truncate(frames * 2);

    std::fs::create_dir_all("out").unwrap();
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: TARGET_RATE as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create("out/convert_tone.wav", spec).unwrap();
    for sample in &samples {
        writer.write_sample(*sample).unwrap();
    }
    writer.finalize().unwrap();

    log::info!(
        "wrote {} frames at {} Hz (latency {:.1} frames)",
        frames,
        TARGET_RATE,
        converter.latency_frames()
    );
}

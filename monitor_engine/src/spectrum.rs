use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Requested capture rate for the microphone stream.
pub const SAMPLE_RATE: u32 = 22_500;
/// Frames per analysis chunk.
pub const CHUNK_FRAMES: usize = 1024;
/// Per-channel gain applied when folding a stereo pair into mono.
const STEREO_MIX_GAIN: f32 = 0.2;

/// Magnitude spectrum of fixed-size mono chunks.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(chunk_frames: usize) -> Self {
        let chunk_frames = chunk_frames.max(2);
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(chunk_frames);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Self {
            fft,
            buffer: vec![Complex::new(0.0, 0.0); chunk_frames],
            scratch,
        }
    }

    pub fn chunk_frames(&self) -> usize {
        self.buffer.len()
    }

    /// Fold interleaved frames to mono. A stereo pair becomes `(L + R) * 0.2`;
    /// other channel counts keep the same overall gain.
    pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
        let channels = channels.max(1);
        let gain = STEREO_MIX_GAIN * 2.0 / channels as f32;
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * gain)
            .collect()
    }

    /// Magnitudes of the positive-frequency half. Short input is zero padded.
    pub fn analyze(&mut self, mono: &[f32]) -> Vec<f32> {
        for (slot, sample) in self
            .buffer
            .iter_mut()
            .zip(mono.iter().copied().chain(std::iter::repeat(0.0)))
        {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
        let half = self.buffer.len() / 2;
        self.buffer[..half].iter().map(|bin| bin.norm()).collect()
    }
}

#[cfg(test)]
mod spectrum_tests {
    use super::*;

    #[test]
    fn sine_peaks_at_its_bin() {
        let mut analyzer = SpectrumAnalyzer::new(CHUNK_FRAMES);
        let bin = 37usize;
        let samples: Vec<f32> = (0..CHUNK_FRAMES)
            .map(|n| {
                let phase = 2.0 * std::f32::consts::PI * bin as f32 * n as f32 / CHUNK_FRAMES as f32;
                phase.sin() * 1000.0
            })
            .collect();
        let spectrum = analyzer.analyze(&samples);
        assert_eq!(spectrum.len(), CHUNK_FRAMES / 2);
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(index, _)| index)
            .expect("non-empty spectrum");
        assert_eq!(peak, bin);
    }

    #[test]
    fn silence_produces_zero_spectrum() {
        let mut analyzer = SpectrumAnalyzer::new(64);
        let spectrum = analyzer.analyze(&[]);
        assert_eq!(spectrum.len(), 32);
        assert!(spectrum.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn stereo_downmix_uses_fixed_gain() {
        let mono = SpectrumAnalyzer::downmix(&[1.0, 3.0, -2.0, 2.0], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.8).abs() < 1e-6);
        assert!(mono[1].abs() < 1e-6);
        let quad = SpectrumAnalyzer::downmix(&[1.0, 1.0, 1.0, 1.0], 4);
        assert!((quad[0] - 0.4).abs() < 1e-6);
    }
}

use rustfft::{num_complex::Complex, FftPlanner};

/// Per-frame descriptor series for a whole signal, all the same length and
/// aligned to the same hop grid.
pub struct FrameFeatures {
    /// Magnitude spectrum per frame (first fft_size/2 bins)
    pub spectra: Vec<Vec<f32>>,
    pub spectral_centroid: Vec<f32>,
    pub spectral_rolloff: Vec<f32>,
    pub zero_crossing_rate: Vec<f32>,
    pub rms_energy: Vec<f32>,
}

impl FrameFeatures {
    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }
}

/// Short-time spectrum analyzer with a fixed window and hop.
///
/// Frames start at `i * hop` and cover `fft_size` samples; the trailing
/// remainder that does not fill a window is dropped.
pub struct SpectrumAnalyzer {
    sample_rate: f32,
    fft_size: usize,
    hop_size: usize,
    fft: std::sync::Arc<dyn rustfft::Fft<f32>>,
    window: Vec<f32>,
}

impl SpectrumAnalyzer {
    pub fn new(sample_rate: f32, fft_size: usize, hop_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);

        let window = Self::hann_window(fft_size);

        Self {
            sample_rate,
            fft_size,
            fft,
            hop_size,
            window,
        }
    }

    fn hann_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| {
                let phase = 2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32;
                0.5 * (1.0 - phase.cos())
            })
            .collect()
    }

    pub fn frame_rate(&self) -> f32 {
        self.sample_rate / self.hop_size as f32
    }

    /// Timestamp of frame `index` in seconds.
    pub fn frame_time(&self, index: usize) -> f32 {
        (index * self.hop_size) as f32 / self.sample_rate
    }

    /// Width of one FFT bin in Hz.
    pub fn bin_width(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    /// Magnitude spectra for every full window in the signal.
    pub fn magnitude_frames(&self, samples: &[f32]) -> Vec<Vec<f32>> {
        if samples.len() < self.fft_size {
            return Vec::new();
        }

        let frame_count = (samples.len() - self.fft_size) / self.hop_size + 1;
        let mut spectra = Vec::with_capacity(frame_count);

        for i in 0..frame_count {
            let start = i * self.hop_size;
            let frame = &samples[start..start + self.fft_size];
            spectra.push(self.compute_fft(&self.apply_window(frame)));
        }

        spectra
    }

    /// Compute the magnitude spectra plus the four per-frame descriptor
    /// series in one pass over the signal.
    pub fn analyze(&self, samples: &[f32]) -> FrameFeatures {
        let spectra = self.magnitude_frames(samples);

        let mut spectral_centroid = Vec::with_capacity(spectra.len());
        let mut spectral_rolloff = Vec::with_capacity(spectra.len());
        let mut zero_crossing_rate = Vec::with_capacity(spectra.len());
        let mut rms_energy = Vec::with_capacity(spectra.len());

        for (i, spectrum) in spectra.iter().enumerate() {
            let start = i * self.hop_size;
            let frame = &samples[start..start + self.fft_size];

            spectral_centroid.push(self.spectral_centroid(spectrum));
            spectral_rolloff.push(self.spectral_rolloff(spectrum));
            zero_crossing_rate.push(Self::zero_crossing_rate(frame));
            rms_energy.push(Self::rms(frame));
        }

        FrameFeatures {
            spectra,
            spectral_centroid,
            spectral_rolloff,
            zero_crossing_rate,
            rms_energy,
        }
    }

    fn apply_window(&self, frame: &[f32]) -> Vec<f32> {
        frame
            .iter()
            .zip(self.window.iter())
            .map(|(&x, &w)| x * w)
            .collect()
    }

    fn compute_fft(&self, windowed_data: &[f32]) -> Vec<f32> {
        let mut buffer: Vec<Complex<f32>> = windowed_data
            .iter()
            .map(|&x| Complex::new(x, 0.0))
            .collect();

        if buffer.len() < self.fft_size {
            buffer.resize(self.fft_size, Complex::new(0.0, 0.0));
        }

        self.fft.process(&mut buffer);

        buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm() * 2.0 / self.fft_size as f32)
            .collect()
    }

    pub fn spectral_centroid(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().sum();
        if total_energy == 0.0 {
            return 0.0;
        }

        let weighted_sum: f32 = spectrum
            .iter()
            .enumerate()
            .map(|(i, &magnitude)| i as f32 * magnitude)
            .sum();

        (weighted_sum / total_energy) * (self.sample_rate / 2.0) / spectrum.len() as f32
    }

    pub fn spectral_rolloff(&self, spectrum: &[f32]) -> f32 {
        let total_energy: f32 = spectrum.iter().sum();
        if total_energy == 0.0 {
            return 0.0;
        }
        let rolloff_threshold = total_energy * 0.85; // 85% of energy

        let mut cumulative_energy = 0.0;
        for (i, &magnitude) in spectrum.iter().enumerate() {
            cumulative_energy += magnitude;
            if cumulative_energy >= rolloff_threshold {
                return (i as f32 / spectrum.len() as f32) * (self.sample_rate / 2.0);
            }
        }
        self.sample_rate / 2.0
    }

    pub fn zero_crossing_rate(frame: &[f32]) -> f32 {
        if frame.len() < 2 {
            return 0.0;
        }

        let zero_crossings = frame
            .windows(2)
            .filter(|window| window[0] * window[1] < 0.0)
            .count();

        zero_crossings as f32 / (frame.len() - 1) as f32
    }

    pub fn rms(frame: &[f32]) -> f32 {
        if frame.is_empty() {
            return 0.0;
        }
        (frame.iter().map(|x| x * x).sum::<f32>() / frame.len() as f32).sqrt()
    }
}

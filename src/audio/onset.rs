/// Configuration for spectral-flux onset picking.
#[derive(Debug, Clone)]
pub struct OnsetConfig {
    /// Threshold = mean(flux) + threshold_factor * std(flux)
    pub threshold_factor: f32,

    /// Minimum time between onsets in milliseconds
    pub min_onset_gap_ms: f32,
}

impl Default for OnsetConfig {
    fn default() -> Self {
        OnsetConfig {
            threshold_factor: 1.5,
            min_onset_gap_ms: 30.0,
        }
    }
}

/// Detect onsets from precomputed magnitude spectra.
///
/// Returns onset timestamps in seconds, ascending. Flux is the sum of
/// positive bin-wise differences between consecutive frames; peaks are
/// local maxima above an adaptive threshold, at least `min_onset_gap_ms`
/// apart.
pub fn detect_onsets(
    spectra: &[Vec<f32>],
    sample_rate: u32,
    hop_size: usize,
    config: &OnsetConfig,
) -> Vec<f32> {
    let flux = compute_spectral_flux(spectra);
    if flux.is_empty() {
        return Vec::new();
    }
    pick_onset_peaks(&flux, sample_rate, hop_size, config)
}

fn compute_spectral_flux(spectra: &[Vec<f32>]) -> Vec<f32> {
    let mut flux = Vec::with_capacity(spectra.len());

    for (i, spectrum) in spectra.iter().enumerate() {
        let frame_flux = if i == 0 {
            0.0 // first frame has no predecessor
        } else {
            spectrum
                .iter()
                .zip(spectra[i - 1].iter())
                .map(|(&curr, &prev)| (curr - prev).max(0.0))
                .sum()
        };
        flux.push(frame_flux);
    }

    flux
}

fn pick_onset_peaks(
    flux: &[f32],
    sample_rate: u32,
    hop_size: usize,
    config: &OnsetConfig,
) -> Vec<f32> {
    if flux.len() < 3 || hop_size == 0 || sample_rate == 0 {
        return Vec::new();
    }

    let mean = flux.iter().sum::<f32>() / flux.len() as f32;
    let variance = flux.iter().map(|x| (x - mean).powi(2)).sum::<f32>() / flux.len() as f32;
    let std_dev = variance.sqrt();
    let threshold = mean + config.threshold_factor * std_dev;

    let min_gap_samples = (config.min_onset_gap_ms * sample_rate as f32 / 1000.0) as usize;
    let min_gap_frames = (min_gap_samples / hop_size).max(1);

    let mut onsets = Vec::new();
    let mut last_onset_frame: Option<usize> = None;

    for i in 1..flux.len() - 1 {
        let is_peak = flux[i] > flux[i - 1] && flux[i] >= flux[i + 1];
        let above_threshold = flux[i] > threshold;
        let gap_ok = match last_onset_frame {
            Some(last) => i - last >= min_gap_frames,
            None => true,
        };

        if is_peak && above_threshold && gap_ok {
            onsets.push((i * hop_size) as f32 / sample_rate as f32);
            last_onset_frame = Some(i);
        }
    }

    onsets
}

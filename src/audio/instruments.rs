use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::audio::fft::SpectrumAnalyzer;
use crate::audio::loader::load_audio;
use crate::audio::{FFT_SIZE, HOP_LENGTH, TARGET_SAMPLE_RATE};
use crate::error::{AnalysisError, Result};

/// Upper edge of the low band (kick, toms, bass) in Hz.
const LOW_BAND_CEILING_HZ: f32 = 540.0;

/// Upper edge of the mid band (vocals, guitars, keys) in Hz.
const MID_BAND_CEILING_HZ: f32 = 2160.0;

/// Confidence and a short description for one instrument family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentEstimate {
    pub confidence: f32,
    pub characteristics: String,
}

/// Broad instrument families estimated from spectral energy balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentProfile {
    pub drums_percussion: InstrumentEstimate,
    pub melodic_instruments: InstrumentEstimate,
    pub cymbals_hi_freq: InstrumentEstimate,
}

/// Estimate which broad instrument families are present in a file.
///
/// Splits the spectrum into three bands (below 540 Hz, 540 Hz to
/// 2160 Hz, above 2160 Hz) and reports each band's share of the mean
/// magnitude as a confidence. The three confidences sum to 1.0.
pub fn detect_instruments<P: AsRef<Path>>(path: P) -> Result<InstrumentProfile> {
    let audio = load_audio(&path, TARGET_SAMPLE_RATE)?;

    let analyzer = SpectrumAnalyzer::new(TARGET_SAMPLE_RATE as f32, FFT_SIZE, HOP_LENGTH);
    let spectra = analyzer.magnitude_frames(&audio.samples);

    profile_from_spectra(&spectra, analyzer.bin_width())
}

fn profile_from_spectra(spectra: &[Vec<f32>], bin_width: f32) -> Result<InstrumentProfile> {
    if spectra.is_empty() {
        return Err(AnalysisError::DegenerateSignal(
            "too short for a single analysis frame".to_string(),
        ));
    }

    let (low, mid, high) = band_energies(spectra, bin_width);
    let total = low + mid + high;
    if total <= 0.0 {
        return Err(AnalysisError::DegenerateSignal(
            "signal contains no spectral energy".to_string(),
        ));
    }

    debug!(
        "Band energies: low {:.4}, mid {:.4}, high {:.4}",
        low, mid, high
    );

    Ok(InstrumentProfile {
        drums_percussion: InstrumentEstimate {
            confidence: low / total,
            characteristics: "High low-frequency energy".to_string(),
        },
        melodic_instruments: InstrumentEstimate {
            confidence: mid / total,
            characteristics: "High mid-frequency energy".to_string(),
        },
        cymbals_hi_freq: InstrumentEstimate {
            confidence: high / total,
            characteristics: "High-frequency content".to_string(),
        },
    })
}

/// Mean magnitude per band, averaged over every frame and bin in the band.
fn band_energies(spectra: &[Vec<f32>], bin_width: f32) -> (f32, f32, f32) {
    let low_ceiling = (LOW_BAND_CEILING_HZ / bin_width) as usize;
    let mid_ceiling = (MID_BAND_CEILING_HZ / bin_width) as usize;

    let mut sums = [0.0f32; 3];
    let mut counts = [0usize; 3];

    for spectrum in spectra {
        for (bin, &magnitude) in spectrum.iter().enumerate() {
            let band = if bin < low_ceiling {
                0
            } else if bin < mid_ceiling {
                1
            } else {
                2
            };
            sums[band] += magnitude;
            counts[band] += 1;
        }
    }

    let mean = |band: usize| {
        if counts[band] > 0 {
            sums[band] / counts[band] as f32
        } else {
            0.0
        }
    };

    (mean(0), mean(1), mean(2))
}

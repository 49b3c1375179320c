/// Pitch class labels, index 0 = C through index 11 = B.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

const MIN_CHROMA_HZ: f32 = 20.0;
const MAX_CHROMA_HZ: f32 = 8000.0;

/// Fold magnitude spectra into 12-bin chroma vectors, one per frame.
///
/// Each FFT bin maps to the nearest equal-tempered pitch class via its
/// MIDI note number, accumulating squared magnitude. Bins outside the
/// 20 Hz - 8 kHz band are ignored. Each frame is normalized by its peak
/// so the strongest pitch class reads 1.0; silent frames stay all zero.
pub fn compute_chroma(spectra: &[Vec<f32>], sample_rate: u32, fft_size: usize) -> Vec<[f32; 12]> {
    let bin_width = sample_rate as f32 / fft_size as f32;

    spectra
        .iter()
        .map(|spectrum| {
            let mut chroma = [0.0f32; 12];

            for (bin, &magnitude) in spectrum.iter().enumerate() {
                let freq = bin as f32 * bin_width;
                if freq < MIN_CHROMA_HZ || freq > MAX_CHROMA_HZ {
                    continue;
                }

                let midi = 69.0 + 12.0 * (freq / 440.0).log2();
                let pitch_class = ((midi.round() as i32 % 12) + 12) % 12;
                chroma[pitch_class as usize] += magnitude * magnitude;
            }

            let peak = chroma.iter().fold(0.0f32, |a, &b| a.max(b));
            if peak > 0.0 {
                for value in chroma.iter_mut() {
                    *value /= peak;
                }
            }

            chroma
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::fft::SpectrumAnalyzer;

    #[test]
    fn test_note_name_order() {
        assert_eq!(NOTE_NAMES[0], "C");
        assert_eq!(NOTE_NAMES[9], "A");
        assert_eq!(NOTE_NAMES[11], "B");
    }

    #[test]
    fn test_single_bin_maps_to_a() {
        // Bin 41 at 22050/2048 sits at 441.4 Hz, nearest MIDI note A4
        let mut frame = vec![0.0f32; 1024];
        frame[41] = 1.0;

        let chroma = compute_chroma(&[frame], 22050, 2048);
        assert_eq!(chroma.len(), 1);
        assert!((chroma[0][9] - 1.0).abs() < 1e-6);
        for (class, &value) in chroma[0].iter().enumerate() {
            if class != 9 {
                assert!(value < 1e-6);
            }
        }
    }

    #[test]
    fn test_silent_frame_stays_zero() {
        let frame = vec![0.0f32; 1024];
        let chroma = compute_chroma(&[frame], 22050, 2048);
        assert!(chroma[0].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_sine_440_dominates_a_across_frames() {
        let sample_rate = 22050;
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| {
                (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5
            })
            .collect();

        let analyzer = SpectrumAnalyzer::new(sample_rate as f32, 2048, 512);
        let spectra = analyzer.magnitude_frames(&samples);
        let chroma = compute_chroma(&spectra, sample_rate, 2048);

        assert!(!chroma.is_empty());
        for frame in &chroma {
            let dominant = frame
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
                .map(|(class, _)| class)
                .unwrap();
            assert_eq!(NOTE_NAMES[dominant], "A");
        }
    }
}

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::audio::chroma::{compute_chroma, NOTE_NAMES};
use crate::audio::fft::{FrameFeatures, SpectrumAnalyzer};
use crate::audio::loader::{load_audio, AudioData};
use crate::audio::onset::{detect_onsets, OnsetConfig};
use crate::audio::tempo::{estimate_tempo, TempoConfig};
use crate::audio::{FFT_SIZE, HOP_LENGTH, TARGET_SAMPLE_RATE};
use crate::error::{AnalysisError, Result};

/// Segment width for feature aggregation, in seconds.
const SEGMENT_SECONDS: f32 = 0.5;

/// Complete analysis of one audio file. This is the unit of serialization;
/// the JSON field names and nesting are a compatibility surface for the
/// web visualizer and must not change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: FileMetadata,
    pub temporal_features: TemporalFeatures,
    pub pitch_analysis: Vec<PitchSegment>,
    pub analysis_summary: AnalysisSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    pub duration: f32,
    pub sample_rate: u32,
    pub tempo: f32,
    pub total_onsets: usize,
    pub total_beats: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalFeatures {
    /// Onset timestamps in seconds, ascending
    pub onsets: Vec<f32>,

    /// Beat timestamps in seconds, ascending
    pub beats: Vec<f32>,

    /// Per-segment spectral descriptors at 0.5 s resolution
    pub spectral_features: Vec<SpectralSegment>,
}

/// Mean spectral descriptors over one 0.5 s segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectralSegment {
    pub time: f32,
    pub spectral_centroid: f32,
    pub spectral_rolloff: f32,
    pub zero_crossing_rate: f32,
    pub rms_energy: f32,
}

/// Pitch-class content of one 0.5 s segment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchSegment {
    pub time: f32,

    /// Up to 3 strongest pitch classes, descending by strength
    pub dominant_pitches: Vec<PitchStrength>,

    /// All 12 pitch classes keyed by note name
    pub all_pitches: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchStrength {
    pub note: String,
    pub strength: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub avg_spectral_centroid: f32,
    pub avg_rms_energy: f32,
    pub onset_density: f32,
    pub beat_consistency: f32,
}

/// Runs the full analysis pipeline over one waveform.
pub struct AnalysisProcessor {
    analyzer: SpectrumAnalyzer,
    onset_config: OnsetConfig,
    tempo_config: TempoConfig,
}

impl AnalysisProcessor {
    pub fn new() -> Self {
        AnalysisProcessor {
            analyzer: SpectrumAnalyzer::new(TARGET_SAMPLE_RATE as f32, FFT_SIZE, HOP_LENGTH),
            onset_config: OnsetConfig::default(),
            tempo_config: TempoConfig::default(),
        }
    }

    /// Load a file and run the full pipeline over it. The report names the
    /// file by its final path component.
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let path = path.as_ref();
        info!("Analyzing: {}", path.display());

        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| path.display().to_string());

        let audio = load_audio(path, TARGET_SAMPLE_RATE)?;
        self.analyze_samples(&filename, &audio)
    }

    /// Run the pipeline over an already-loaded waveform.
    pub fn analyze_samples(&self, filename: &str, audio: &AudioData) -> Result<AnalysisReport> {
        if audio.samples.len() < FFT_SIZE {
            return Err(AnalysisError::DegenerateSignal(
                "shorter than one analysis window".to_string(),
            ));
        }
        let peak = audio.samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()));
        if peak == 0.0 {
            return Err(AnalysisError::DegenerateSignal(
                "signal is silent".to_string(),
            ));
        }

        let duration = audio.duration_seconds();
        let features = self.analyzer.analyze(&audio.samples);

        info!("Detecting onsets...");
        let onsets = detect_onsets(
            &features.spectra,
            audio.sample_rate,
            HOP_LENGTH,
            &self.onset_config,
        );

        info!("Analyzing rhythm...");
        let tempo = estimate_tempo(&onsets, duration, &self.tempo_config);

        info!("Extracting spectral features...");
        let spectral_features = self.spectral_segments(&features);

        info!("Analyzing pitch content...");
        let chroma = compute_chroma(&features.spectra, audio.sample_rate, FFT_SIZE);
        let pitch_analysis = self.pitch_segments(&chroma);

        let analysis_summary = summarize(&features, &onsets, &tempo.beats, duration);

        Ok(AnalysisReport {
            metadata: FileMetadata {
                filename: filename.to_string(),
                duration,
                sample_rate: audio.sample_rate,
                tempo: tempo.bpm,
                total_onsets: onsets.len(),
                total_beats: tempo.beats.len(),
            },
            temporal_features: TemporalFeatures {
                onsets,
                beats: tempo.beats,
                spectral_features,
            },
            pitch_analysis,
            analysis_summary,
        })
    }

    /// Frames per segment at the current framing, at least 1.
    fn segment_len(&self) -> usize {
        ((SEGMENT_SECONDS * self.analyzer.frame_rate()) as usize).max(1)
    }

    fn spectral_segments(&self, features: &FrameFeatures) -> Vec<SpectralSegment> {
        let frame_count = features.len();
        let segment_len = self.segment_len();
        let mut segments = Vec::new();

        let mut start = 0;
        while start < frame_count {
            let end = (start + segment_len).min(frame_count);
            segments.push(SpectralSegment {
                time: self.analyzer.frame_time(start),
                spectral_centroid: mean(&features.spectral_centroid[start..end]),
                spectral_rolloff: mean(&features.spectral_rolloff[start..end]),
                zero_crossing_rate: mean(&features.zero_crossing_rate[start..end]),
                rms_energy: mean(&features.rms_energy[start..end]),
            });
            start += segment_len;
        }

        segments
    }

    fn pitch_segments(&self, chroma: &[[f32; 12]]) -> Vec<PitchSegment> {
        let frame_count = chroma.len();
        let segment_len = self.segment_len();
        let mut segments = Vec::new();

        let mut start = 0;
        while start < frame_count {
            let end = (start + segment_len).min(frame_count);

            let mut avg = [0.0f32; 12];
            for frame in &chroma[start..end] {
                for (class, &value) in frame.iter().enumerate() {
                    avg[class] += value;
                }
            }
            let window = (end - start) as f32;
            for value in avg.iter_mut() {
                *value /= window;
            }

            let mut ranked: Vec<PitchStrength> = NOTE_NAMES
                .iter()
                .zip(avg.iter())
                .map(|(&note, &strength)| PitchStrength {
                    note: note.to_string(),
                    strength,
                })
                .collect();
            ranked.sort_by(|a, b| {
                b.strength
                    .partial_cmp(&a.strength)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            ranked.truncate(3);

            let all_pitches = NOTE_NAMES
                .iter()
                .zip(avg.iter())
                .map(|(&note, &strength)| (note.to_string(), strength))
                .collect();

            segments.push(PitchSegment {
                time: self.analyzer.frame_time(start),
                dominant_pitches: ranked,
                all_pitches,
            });
            start += segment_len;
        }

        segments
    }
}

impl Default for AnalysisProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn summarize(
    features: &FrameFeatures,
    onsets: &[f32],
    beats: &[f32],
    duration: f32,
) -> AnalysisSummary {
    let beat_consistency = if beats.len() > 1 {
        let diffs: Vec<f32> = beats.windows(2).map(|pair| pair[1] - pair[0]).collect();
        let mean_diff = mean(&diffs);
        let variance = diffs
            .iter()
            .map(|diff| (diff - mean_diff).powi(2))
            .sum::<f32>()
            / diffs.len() as f32;
        variance.sqrt()
    } else {
        0.0
    };

    AnalysisSummary {
        avg_spectral_centroid: mean(&features.spectral_centroid),
        avg_rms_energy: mean(&features.rms_energy),
        onset_density: onsets.len() as f32 / duration,
        beat_consistency,
    }
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

/// Serialize a report to pretty-printed JSON and write it in one call.
/// The serialized form is built fully in memory so a failure cannot leave
/// a partially written file behind.
pub fn save_report<P: AsRef<Path>>(report: &AnalysisReport, path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click_track(duration_secs: f32, interval_secs: f32) -> AudioData {
        let sample_rate = TARGET_SAMPLE_RATE;
        let total = (duration_secs * sample_rate as f32) as usize;
        let burst_len = (0.02 * sample_rate as f32) as usize;
        let step = (interval_secs * sample_rate as f32) as usize;

        let mut samples = vec![0.0f32; total];
        let mut start = 0;
        while start < total {
            for i in 0..burst_len.min(total - start) {
                let t = i as f32 / sample_rate as f32;
                samples[start + i] = (2.0 * std::f32::consts::PI * 1000.0 * t).sin() * 0.8;
            }
            start += step;
        }

        AudioData {
            samples,
            sample_rate,
        }
    }

    #[test]
    fn test_click_track_report_structure() {
        let audio = click_track(5.0, 0.5);
        let processor = AnalysisProcessor::new();
        let report = processor.analyze_samples("clicks.wav", &audio).unwrap();

        assert_eq!(report.metadata.filename, "clicks.wav");
        assert!((report.metadata.duration - 5.0).abs() < 1e-3);
        assert_eq!(report.metadata.sample_rate, TARGET_SAMPLE_RATE);
        assert!(report.metadata.tempo > 0.0);
        assert_eq!(report.metadata.total_onsets, report.temporal_features.onsets.len());
        assert_eq!(report.metadata.total_beats, report.temporal_features.beats.len());

        for pair in report.temporal_features.onsets.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert!(report
            .temporal_features
            .onsets
            .iter()
            .all(|&t| (0.0..=5.0).contains(&t)));

        // Both segmentations walk the same frame grid
        assert_eq!(
            report.temporal_features.spectral_features.len(),
            report.pitch_analysis.len()
        );
        for pair in report.temporal_features.spectral_features.windows(2) {
            assert!(pair[1].time > pair[0].time);
        }
    }

    #[test]
    fn test_pitch_segments_are_ranked_and_complete() {
        let audio = click_track(3.0, 0.5);
        let processor = AnalysisProcessor::new();
        let report = processor.analyze_samples("clicks.wav", &audio).unwrap();

        for segment in &report.pitch_analysis {
            assert_eq!(segment.all_pitches.len(), 12);
            assert!(segment.dominant_pitches.len() <= 3);

            for pair in segment.dominant_pitches.windows(2) {
                assert!(pair[0].strength >= pair[1].strength);
            }
            for pitch in &segment.dominant_pitches {
                let listed = segment.all_pitches[&pitch.note];
                assert_eq!(listed, pitch.strength);
            }
        }
    }

    #[test]
    fn test_summary_matches_report_counts() {
        let audio = click_track(4.0, 0.5);
        let processor = AnalysisProcessor::new();
        let report = processor.analyze_samples("clicks.wav", &audio).unwrap();

        let expected_density = report.metadata.total_onsets as f32 / report.metadata.duration;
        assert!((report.analysis_summary.onset_density - expected_density).abs() < 1e-6);
        assert!(report.analysis_summary.beat_consistency >= 0.0);
        assert!(report.analysis_summary.avg_rms_energy > 0.0);
    }

    #[test]
    fn test_beat_consistency_needs_two_beats() {
        let features = FrameFeatures {
            spectra: vec![],
            spectral_centroid: vec![100.0],
            spectral_rolloff: vec![200.0],
            zero_crossing_rate: vec![0.1],
            rms_energy: vec![0.5],
        };

        let summary = summarize(&features, &[0.5], &[1.0], 2.0);
        assert_eq!(summary.beat_consistency, 0.0);

        let summary = summarize(&features, &[0.5], &[1.0, 1.5, 2.0], 2.0);
        assert!((summary.beat_consistency - 0.0).abs() < 1e-6);
    }

    #[test]
    fn test_silent_audio_rejected() {
        let audio = AudioData {
            samples: vec![0.0; 44100],
            sample_rate: TARGET_SAMPLE_RATE,
        };
        let processor = AnalysisProcessor::new();
        let result = processor.analyze_samples("silence.wav", &audio);
        assert!(matches!(result, Err(AnalysisError::DegenerateSignal(_))));
    }

    #[test]
    fn test_short_audio_rejected() {
        let audio = AudioData {
            samples: vec![0.1; 1000],
            sample_rate: TARGET_SAMPLE_RATE,
        };
        let processor = AnalysisProcessor::new();
        let result = processor.analyze_samples("blip.wav", &audio);
        assert!(matches!(result, Err(AnalysisError::DegenerateSignal(_))));
    }

    #[test]
    fn test_report_round_trips_through_json() {
        let audio = click_track(3.0, 0.5);
        let processor = AnalysisProcessor::new();
        let report = processor.analyze_samples("clicks.wav", &audio).unwrap();

        let json = serde_json::to_string_pretty(&report).unwrap();
        let parsed: AnalysisReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.metadata.filename, report.metadata.filename);
        assert_eq!(parsed.metadata.tempo, report.metadata.tempo);
        assert_eq!(
            parsed.temporal_features.onsets,
            report.temporal_features.onsets
        );
        assert_eq!(parsed.pitch_analysis.len(), report.pitch_analysis.len());
        assert_eq!(
            parsed.analysis_summary.beat_consistency,
            report.analysis_summary.beat_consistency
        );
    }
}

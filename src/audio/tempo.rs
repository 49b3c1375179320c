use serde::{Deserialize, Serialize};

/// Tempo estimate with the beat grid that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Estimated beats per minute, clamped to the configured range
    pub bpm: f32,

    /// Confidence in the estimate [0.0, 1.0]
    pub confidence: f32,

    /// Beat positions in seconds, ascending, within [0, duration]
    pub beats: Vec<f32>,
}

/// Configuration for tempo estimation.
#[derive(Debug, Clone)]
pub struct TempoConfig {
    pub min_bpm: f32,
    pub max_bpm: f32,

    /// Number of bins for the inter-onset-interval histogram
    pub histogram_bins: usize,

    /// Minimum number of onsets required for estimation
    pub min_onsets: usize,
}

impl Default for TempoConfig {
    fn default() -> Self {
        TempoConfig {
            min_bpm: 60.0,
            max_bpm: 180.0,
            histogram_bins: 300,
            min_onsets: 8,
        }
    }
}

/// Estimate tempo from onset times and lay a beat grid over the signal.
///
/// Builds an inter-onset-interval histogram (with half/double intervals
/// weighted in), picks the strongest smoothed peak, refines the interval
/// against the raw intervals near that peak, then phase-fits a beat grid
/// to the onsets. Falls back to 120 BPM at zero confidence (and no beats)
/// when there are too few onsets to vote.
pub fn estimate_tempo(onsets: &[f32], duration: f32, config: &TempoConfig) -> TempoEstimate {
    if onsets.len() < config.min_onsets {
        return TempoEstimate {
            bpm: 120.0,
            confidence: 0.0,
            beats: Vec::new(),
        };
    }

    let iois = compute_iois(onsets);
    if iois.is_empty() {
        return TempoEstimate {
            bpm: 120.0,
            confidence: 0.0,
            beats: Vec::new(),
        };
    }

    let histogram = build_ioi_histogram(&iois, config);
    let peaks = find_histogram_peaks(&histogram);
    let (peak_interval, confidence) = select_best_tempo(&peaks, &histogram, config);
    let interval = refine_interval(&iois, peak_interval);

    let bpm = (60.0 / interval).clamp(config.min_bpm, config.max_bpm);
    let beats = generate_beat_grid(onsets, interval, duration);

    TempoEstimate {
        bpm,
        confidence,
        beats,
    }
}

/// Intervals between consecutive onsets, in seconds.
fn compute_iois(onsets: &[f32]) -> Vec<f32> {
    onsets
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .filter(|&ioi| ioi > 0.0)
        .collect()
}

fn build_ioi_histogram(iois: &[f32], config: &TempoConfig) -> Vec<f32> {
    let min_interval = 60.0 / config.max_bpm;
    let max_interval = 60.0 / config.min_bpm;
    let bin_width = (max_interval - min_interval) / config.histogram_bins as f32;

    let mut histogram = vec![0.0f32; config.histogram_bins];
    let mut vote = |interval: f32, weight: f32| {
        if interval >= min_interval && interval <= max_interval {
            let bin = ((interval - min_interval) / bin_width) as usize;
            histogram[bin.min(config.histogram_bins - 1)] += weight;
        }
    };

    for &ioi in iois {
        vote(ioi, 1.0);
        // Half and double intervals vote at reduced weight for 2:1 layers
        vote(ioi / 2.0, 0.5);
        vote(ioi * 2.0, 0.5);
    }

    smooth_histogram(&histogram, 3)
}

fn smooth_histogram(histogram: &[f32], window_size: usize) -> Vec<f32> {
    let half_window = window_size / 2;
    (0..histogram.len())
        .map(|i| {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window + 1).min(histogram.len());
            histogram[start..end].iter().sum::<f32>() / (end - start) as f32
        })
        .collect()
}

/// Local maxima sorted by strength, strongest first (top 5 kept). The
/// right-hand comparison admits plateaus, which smoothing produces when
/// the intervals are near-identical.
fn find_histogram_peaks(histogram: &[f32]) -> Vec<(usize, f32)> {
    let mut peaks = Vec::new();

    for i in 1..histogram.len().saturating_sub(1) {
        if histogram[i] > histogram[i - 1] && histogram[i] >= histogram[i + 1] {
            peaks.push((i, histogram[i]));
        }
    }

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks.truncate(5);
    peaks
}

fn select_best_tempo(
    peaks: &[(usize, f32)],
    histogram: &[f32],
    config: &TempoConfig,
) -> (f32, f32) {
    if peaks.is_empty() {
        return (0.5, 0.0); // 120 BPM
    }

    let (best_bin, peak_strength) = peaks[0];

    let min_interval = 60.0 / config.max_bpm;
    let max_interval = 60.0 / config.min_bpm;
    let bin_width = (max_interval - min_interval) / config.histogram_bins as f32;
    let interval = min_interval + best_bin as f32 * bin_width;

    let histogram_mean = histogram.iter().sum::<f32>() / histogram.len() as f32;
    let confidence = if histogram_mean > 0.0 {
        (peak_strength / (histogram_mean * 3.0)).min(1.0)
    } else {
        0.0
    };

    (interval, confidence)
}

/// Average the raw intervals that cluster around the histogram peak. The
/// histogram quantizes to bin edges; the cluster mean recovers periods
/// that fall between frame boundaries.
fn refine_interval(iois: &[f32], peak_interval: f32) -> f32 {
    let tolerance = peak_interval * 0.1;
    let cluster: Vec<f32> = iois
        .iter()
        .copied()
        .filter(|ioi| (ioi - peak_interval).abs() <= tolerance)
        .collect();

    if cluster.is_empty() {
        peak_interval
    } else {
        cluster.iter().sum::<f32>() / cluster.len() as f32
    }
}

/// Lay a beat grid at `interval` over [first onset, duration], choosing the
/// phase that best matches the detected onsets.
fn generate_beat_grid(onsets: &[f32], interval: f32, duration: f32) -> Vec<f32> {
    if onsets.is_empty() || interval <= 0.0 {
        return Vec::new();
    }

    let first_onset = onsets[0];
    let last_onset = onsets[onsets.len() - 1];

    let num_phase_tests = 8;
    let phase_step = interval / num_phase_tests as f32;

    let mut best_phase = first_onset;
    let mut best_score = -1.0;

    for i in 0..num_phase_tests {
        let phase = first_onset + i as f32 * phase_step;
        let score = score_beat_alignment(onsets, phase, interval, last_onset);
        if score > best_score {
            best_score = score;
            best_phase = phase;
        }
    }

    let end = (last_onset + interval).min(duration);
    let mut beats = Vec::new();
    let mut beat_time = best_phase;
    while beat_time <= end {
        beats.push(beat_time);
        beat_time += interval;
    }

    beats
}

/// Count onsets landing near grid positions, weighted by closeness.
fn score_beat_alignment(onsets: &[f32], phase: f32, interval: f32, end_time: f32) -> f32 {
    let tolerance = interval * 0.15;
    let mut score = 0.0;

    let mut beat_time = phase;
    while beat_time <= end_time {
        let closest = onsets
            .iter()
            .map(|onset| (onset - beat_time).abs())
            .fold(f32::MAX, f32::min);

        if closest < tolerance {
            score += (tolerance - closest) / tolerance;
        }

        beat_time += interval;
    }

    score
}

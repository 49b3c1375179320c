use std::fs::File;
use std::path::Path;

use log::{debug, info};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{AnalysisError, Result};

/// Decoded mono waveform at the analysis sample rate.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode an audio file to mono f32 and resample it to `target_rate`.
///
/// Any container/codec symphonia understands is accepted. Multi-channel
/// sources are averaged down to mono during the decode loop.
pub fn load_audio<P: AsRef<Path>>(path: P, target_rate: u32) -> Result<AudioData> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(AnalysisError::InputNotFound(path.to_path_buf()));
    }

    info!("Loading audio file: {}", path.display());

    let src = File::open(path).map_err(|e| AnalysisError::Decode(e.to_string()))?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let hint = Hint::new();
    let format_opts = FormatOptions::default();
    let metadata_opts = MetadataOptions::default();
    let decoder_opts = DecoderOptions::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_opts, &metadata_opts)
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("no supported audio tracks".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();
    let mut source_rate = 0u32;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(err) => return Err(AnalysisError::Decode(err.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                source_rate = decoded.spec().rate;
                let spec = *decoded.spec();
                let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);

                let buf_samples = sample_buf.samples();
                let channels = spec.channels.count();

                if channels == 1 {
                    samples.extend_from_slice(buf_samples);
                } else {
                    // Interleaved multi-channel, average each frame to mono
                    for frame in buf_samples.chunks(channels) {
                        let sum: f32 = frame.iter().sum();
                        samples.push(sum / channels as f32);
                    }
                }
            }
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::DecodeError(_)) => (), // skip corrupt packets
            Err(err) => return Err(AnalysisError::Decode(err.to_string())),
        }
    }

    if samples.is_empty() {
        return Err(AnalysisError::DegenerateSignal(
            "file decoded to zero samples".to_string(),
        ));
    }

    if source_rate != target_rate {
        debug!("Resampling {} Hz -> {} Hz", source_rate, target_rate);
        samples = resample(samples, source_rate, target_rate)?;
    }

    info!(
        "Loaded {} samples ({:.1}s, {} Hz)",
        samples.len(),
        samples.len() as f32 / target_rate as f32,
        target_rate
    );

    Ok(AudioData {
        samples,
        sample_rate: target_rate,
    })
}

/// One-shot sinc resample of the whole mono signal.
fn resample(samples: Vec<f32>, source_rate: u32, target_rate: u32) -> Result<Vec<f32>> {
    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        target_rate as f64 / source_rate as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| AnalysisError::Decode(e.to_string()))?;

    let waves_in = vec![samples];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| AnalysisError::Decode(e.to_string()))?;

    Ok(waves_out.into_iter().next().unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_missing_file_is_input_not_found() {
        let err = load_audio("does_not_exist.mp3", 22050).unwrap_err();
        assert!(matches!(err, AnalysisError::InputNotFound(_)));
    }

    #[test]
    fn test_wav_at_target_rate_keeps_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");

        let sample_rate = 22050;
        let samples: Vec<f32> = (0..sample_rate)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sample_rate as f32).sin())
            .map(|s| s * 0.5)
            .collect();
        write_wav(&path, &samples, sample_rate);

        let audio = load_audio(&path, sample_rate).unwrap();
        assert_eq!(audio.sample_rate, sample_rate);
        assert_eq!(audio.samples.len(), sample_rate as usize);
        assert!((audio.duration_seconds() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_wav_resampled_to_target_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone44.wav");

        let source_rate = 44100;
        let samples: Vec<f32> = (0..source_rate)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / source_rate as f32).sin())
            .map(|s| s * 0.5)
            .collect();
        write_wav(&path, &samples, source_rate);

        let audio = load_audio(&path, 22050).unwrap();
        assert_eq!(audio.sample_rate, 22050);
        // Resampled length lands within 1% of the ideal half length
        let expected = 22050.0;
        let actual = audio.samples.len() as f32;
        assert!(
            (actual - expected).abs() / expected < 0.01,
            "resampled to {} samples, expected about {}",
            actual,
            expected
        );
    }
}

pub mod chroma;
pub mod fft;
pub mod instruments;
pub mod loader;
pub mod onset;
pub mod tempo;

pub use fft::SpectrumAnalyzer;
pub use instruments::InstrumentProfile;
pub use loader::AudioData;
pub use tempo::TempoEstimate;

/// Analysis sample rate; input audio is resampled to this before framing.
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// FFT window size in samples.
pub const FFT_SIZE: usize = 2048;

/// Hop between consecutive analysis frames, in samples.
pub const HOP_LENGTH: usize = 512;

//! Batch musical feature extraction: onsets, beats and tempo, spectral
//! descriptors, and pitch-class content, serialized as JSON for a web
//! visualizer.

pub mod analysis;
pub mod audio;
pub mod error;

pub use analysis::{save_report, AnalysisProcessor, AnalysisReport};
pub use error::{AnalysisError, Result};

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Everything that can go wrong between reading an audio file and writing
/// the report. Each kind maps to its own process exit code.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Audio file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Empty or degenerate audio signal: {0}")]
    DegenerateSignal(String),

    #[error("Failed to write analysis output: {0}")]
    OutputWrite(#[from] std::io::Error),
}

impl AnalysisError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AnalysisError::InputNotFound(_) => 1,
            AnalysisError::Decode(_) => 2,
            AnalysisError::DegenerateSignal(_) => 3,
            AnalysisError::OutputWrite(_) => 4,
        }
    }
}

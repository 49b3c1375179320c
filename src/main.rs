use std::process;

use clap::error::ErrorKind;
use clap::Parser;
use log::{error, info};

use trackscan::analysis::{save_report, AnalysisProcessor};
use trackscan::audio::instruments::detect_instruments;
use trackscan::error::Result;

#[derive(Parser)]
#[command(name = "trackscan")]
#[command(about = "Extract musical features from an audio file into JSON for web visualization")]
struct Args {
    /// Audio file to analyze (MP3, WAV, FLAC, OGG, M4A, etc.)
    #[arg()]
    audio_file: String,

    /// Output path for the analysis JSON
    #[arg(default_value = "analysis_results.json")]
    output: String,
}

fn main() {
    env_logger::init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
                _ => 1,
            };
            let _ = err.print();
            process::exit(code);
        }
    };

    if let Err(err) = run(&args) {
        error!("{}", err);
        process::exit(err.exit_code());
    }
}

fn run(args: &Args) -> Result<()> {
    let processor = AnalysisProcessor::new();
    let report = processor.analyze_file(&args.audio_file)?;

    save_report(&report, &args.output)?;
    info!("Results saved to: {}", args.output);

    let instruments = detect_instruments(&args.audio_file)?;

    info!("\n=== ANALYSIS SUMMARY ===");
    info!("Duration: {:.1} seconds", report.metadata.duration);
    info!("Tempo: {:.1} BPM", report.metadata.tempo);
    info!("Onsets detected: {}", report.metadata.total_onsets);
    info!("Beats tracked: {}", report.metadata.total_beats);

    info!("\n=== DETECTED INSTRUMENTS ===");
    info!(
        "Drums/percussion: {:.1}% ({})",
        instruments.drums_percussion.confidence * 100.0,
        instruments.drums_percussion.characteristics
    );
    info!(
        "Melodic instruments: {:.1}% ({})",
        instruments.melodic_instruments.confidence * 100.0,
        instruments.melodic_instruments.characteristics
    );
    info!(
        "Cymbals/hi-freq: {:.1}% ({})",
        instruments.cymbals_hi_freq.confidence * 100.0,
        instruments.cymbals_hi_freq.characteristics
    );

    Ok(())
}

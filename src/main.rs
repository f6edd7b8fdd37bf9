use anyhow::Context as _;
use clap::Parser;
use dotenvy::dotenv;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod cli;
mod transcribe;
mod transcription;

use cli::Cli;
use transcribe::{TranscriptionConfig, WhisperModel, format_elapsed, transcribe_file};
use transcription::save_transcript;

fn run(cli: &Cli, model: WhisperModel, config: &TranscriptionConfig) -> anyhow::Result<()> {
    let output_dir = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read the working directory")?,
    };

    println!("\nStarting transcription with model '{}'...\n", model);

    let result = transcribe_file(&cli.audio, &model.to_string(), config)?;

    println!(
        "\nTranscription completed in {}",
        format_elapsed(result.elapsed)
    );
    info!(
        "{} produced {} segments (language: {})",
        result.model,
        result.transcript.segments.len(),
        result.transcript.language.as_deref().unwrap_or("unknown")
    );

    let summary = save_transcript(&result.transcript, &output_dir)
        .with_context(|| format!("Failed to write transcript to {:?}", output_dir))?;

    println!("\n{}", summary);

    let file_name = summary
        .path
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| summary.path.clone());
    println!("\nTo view the content:");
    println!("   cat {}", file_name.display());
    println!("   or open the file with your favorite text editor");

    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.transcription_config();

    println!("{}", "=".repeat(60));
    println!("LOCAL WHISPER AUDIO TRANSCRIBER");
    println!("{}", "=".repeat(60));

    let model = cli::select_model(cli.model.as_deref(), &mut io::stdin().lock(), &mut io::stdout());

    info!("Using model {} (language: {})", model, config.language);

    // Failures are reported once here; the process still exits normally
    if let Err(e) = run(&cli, model, &config) {
        error!("Transcription failed: {:#}", e);
        println!("\nError: {:#}", e);
    }

    Ok(())
}

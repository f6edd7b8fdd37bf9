use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::warn;

use crate::transcribe::{TranscriptionConfig, WhisperModel, default_models_dir};

/// Audio file transcribed when `--audio` is not given
pub const DEFAULT_AUDIO_FILE: &str = "CONVERSACION CAPITULO 4 TUTOR ESPECIALISTA.ogg";

/// Transcribe an audio file locally with Whisper
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Cli {
    /// Audio file to transcribe, relative to the working directory
    #[arg(long, default_value = DEFAULT_AUDIO_FILE)]
    pub audio: PathBuf,

    /// Directory the transcript is written to (default: working directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Model preset: 1-5 or tiny, base, small, medium, large.
    /// Prompts interactively when not set; unknown values select "base".
    #[arg(long, env = "WHISPER_MODEL")]
    pub model: Option<String>,

    /// Spoken language code
    #[arg(long, env = "WHISPER_LANGUAGE", default_value = "es")]
    pub language: String,

    /// Where Whisper models are stored and downloaded to
    #[arg(long, env = "WHISPER_MODELS_DIR", default_value_os_t = default_models_dir())]
    pub models_dir: PathBuf,

    /// Don't print whisper.cpp progress and segments while decoding
    #[arg(long)]
    pub quiet: bool,
}

impl Cli {
    pub fn transcription_config(&self) -> TranscriptionConfig {
        TranscriptionConfig {
            language: self.language.clone(),
            verbose: !self.quiet,
            models_dir: self.models_dir.clone(),
            ..Default::default()
        }
    }
}

/// Print the preset menu
pub fn print_model_menu(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "\nAvailable models:")?;
    for model in WhisperModel::ALL {
        writeln!(
            out,
            "{}. {:<6} - {}",
            model.menu_number(),
            model.to_string(),
            model.description()
        )?;
    }
    Ok(())
}

/// Show the menu and read one selection. Empty, invalid or unreadable
/// input selects the default preset.
pub fn prompt_model(input: &mut impl BufRead, out: &mut impl Write) -> io::Result<WhisperModel> {
    print_model_menu(out)?;
    write!(
        out,
        "\nSelect model (1-5) [default: {}]: ",
        WhisperModel::default().menu_number()
    )?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return Ok(WhisperModel::default());
    }

    Ok(WhisperModel::from_menu_choice(&line))
}

/// Use the configured preset, or ask for one. A prompt that cannot be shown
/// falls back to the default preset instead of aborting the run.
pub fn select_model(
    configured: Option<&str>,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> WhisperModel {
    match configured {
        Some(choice) => WhisperModel::resolve(choice),
        None => prompt_model(input, out).unwrap_or_else(|e| {
            warn!("Model prompt failed ({}), using {}", e, WhisperModel::default());
            WhisperModel::default()
        }),
    }
}

mod prepare;
mod whisper;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::info;

use crate::transcription::Transcript;

pub use prepare::{AudioError, PreparedAudio, WHISPER_SAMPLE_RATE, load_audio_file};

pub use whisper::{
    Transcriber, TranscriptionConfig, WhisperError, WhisperModel, default_models_dir,
};

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Audio file not found: {}", .0.display())]
    AudioNotFound(PathBuf),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error(transparent)]
    Whisper(#[from] WhisperError),
}

/// A transcript together with how it was produced
#[derive(Debug, Clone)]
pub struct TimedTranscript {
    pub transcript: Transcript,
    pub model: WhisperModel,
    /// Wall-clock time spent decoding and transcribing (model load excluded)
    pub elapsed: Duration,
}

/// Transcribe a single audio file with the given preset.
///
/// The file is checked before any model is downloaded or loaded. Unknown
/// presets fall back to [`WhisperModel::Base`].
pub fn transcribe_file(
    audio_path: &Path,
    preset: &str,
    config: &TranscriptionConfig,
) -> Result<TimedTranscript, TranscribeError> {
    if !audio_path.is_file() {
        return Err(TranscribeError::AudioNotFound(audio_path.to_path_buf()));
    }

    let model = WhisperModel::resolve(preset);

    println!("File: {}", display_name(audio_path));
    println!("Loading Whisper model '{}'...", model);

    let transcriber = Transcriber::new(model, config.clone())?;

    println!("Transcribing audio...");
    println!("This can take several minutes, please be patient...");

    let start_time = Instant::now();

    let audio = load_audio_file(audio_path)?;
    let transcript = transcriber.transcribe(&audio)?;

    let elapsed = start_time.elapsed();

    info!(
        "Transcription of {:?} with {} finished in {:.1}s",
        audio_path,
        transcriber.model(),
        elapsed.as_secs_f32()
    );

    Ok(TimedTranscript {
        transcript,
        model: transcriber.model(),
        elapsed,
    })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Format an elapsed time as "Xm Ys"
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{}m {}s", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_audio_fails_before_model_load() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscriptionConfig {
            models_dir: dir.path().join("models"),
            ..Default::default()
        };
        let missing = dir.path().join("missing.ogg");

        let result = transcribe_file(&missing, "tiny", &config);

        match result {
            Err(TranscribeError::AudioNotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected AudioNotFound, got {:?}", other.map(|t| t.model)),
        }
        // Nothing was downloaded or even prepared
        assert!(!config.models_dir.exists());
    }

    #[test]
    fn test_directory_is_not_audio() {
        let dir = tempfile::tempdir().unwrap();
        let config = TranscriptionConfig {
            models_dir: dir.path().join("models"),
            ..Default::default()
        };

        let result = transcribe_file(dir.path(), "base", &config);
        assert!(matches!(result, Err(TranscribeError::AudioNotFound(_))));
    }

    #[test]
    fn test_not_found_message() {
        let err = TranscribeError::AudioNotFound(PathBuf::from("clase.ogg"));
        assert_eq!(err.to_string(), "Audio file not found: clase.ogg");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "0m 0s");
        assert_eq!(format_elapsed(Duration::from_millis(59_900)), "0m 59s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(3723)), "62m 3s");
    }
}

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use super::{PreparedAudio, WHISPER_SAMPLE_RATE};
use crate::transcription::{Transcript, TranscriptSegment};

/// Available Whisper model sizes, ordered from fastest to most accurate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WhisperModel {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
}

impl WhisperModel {
    pub const ALL: [WhisperModel; 5] = [
        WhisperModel::Tiny,
        WhisperModel::Base,
        WhisperModel::Small,
        WhisperModel::Medium,
        WhisperModel::Large,
    ];

    /// Get the Hugging Face URL for this model
    pub fn hf_url(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.bin",
            WhisperModel::Base => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-base.bin",
            WhisperModel::Small => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-small.bin",
            WhisperModel::Medium => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-medium.bin",
            WhisperModel::Large => "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-large-v3.bin",
        }
    }

    /// Get the filename for this model
    pub fn filename(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "ggml-tiny.bin",
            WhisperModel::Base => "ggml-base.bin",
            WhisperModel::Small => "ggml-small.bin",
            WhisperModel::Medium => "ggml-medium.bin",
            WhisperModel::Large => "ggml-large-v3.bin",
        }
    }

    /// Get approximate model size in MB
    pub fn size_mb(&self) -> u64 {
        match self {
            WhisperModel::Tiny => 75,
            WhisperModel::Base => 142,
            WhisperModel::Small => 466,
            WhisperModel::Medium => 1500,
            WhisperModel::Large => 3100,
        }
    }

    /// Position in the selection menu (1-based)
    pub fn menu_number(&self) -> usize {
        match self {
            WhisperModel::Tiny => 1,
            WhisperModel::Base => 2,
            WhisperModel::Small => 3,
            WhisperModel::Medium => 4,
            WhisperModel::Large => 5,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            WhisperModel::Tiny => "Fast, less accurate",
            WhisperModel::Base => "Balanced (recommended to start)",
            WhisperModel::Small => "Good accuracy",
            WhisperModel::Medium => "Very good accuracy (slower)",
            WhisperModel::Large => "Maximum accuracy (very slow)",
        }
    }

    /// Match a menu choice ("1"-"5") only. Anything else, names included,
    /// selects the balanced default.
    pub fn from_menu_choice(choice: &str) -> Self {
        let choice = choice.trim();

        Self::ALL
            .iter()
            .copied()
            .find(|m| m.menu_number().to_string() == choice)
            .unwrap_or_default()
    }

    /// Resolve a menu choice ("1"-"5") or model name.
    ///
    /// Anything unrecognized, including empty input, falls back to the
    /// balanced default.
    pub fn resolve(choice: &str) -> Self {
        let choice = choice.trim();

        choice
            .parse()
            .unwrap_or_else(|_| Self::from_menu_choice(choice))
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperModel::Tiny => write!(f, "tiny"),
            WhisperModel::Base => write!(f, "base"),
            WhisperModel::Small => write!(f, "small"),
            WhisperModel::Medium => write!(f, "medium"),
            WhisperModel::Large => write!(f, "large"),
        }
    }
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" => Ok(WhisperModel::Large),
            _ => Err(format!("Unknown model: {}. Use tiny, base, small, medium, or large", s)),
        }
    }
}

#[derive(Error, Debug)]
pub enum WhisperError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to download model: {0}")]
    Download(String),
    #[error("Failed to initialize Whisper: {0}")]
    Init(String),
    #[error("Transcription failed: {0}")]
    Transcription(String),
}

/// Inference settings applied to every run
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// Spoken language code passed to Whisper
    pub language: String,
    /// Whether to translate to English (false = keep original language)
    pub translate: bool,
    /// Let whisper.cpp print progress and each segment as it is decoded
    pub verbose: bool,
    /// GPU offload. Off so the run works on machines without an accelerator.
    pub use_gpu: bool,
    /// Number of threads to use
    pub n_threads: i32,
    /// Where model files are stored and downloaded to
    pub models_dir: PathBuf,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            translate: false,
            verbose: true,
            use_gpu: false,
            n_threads: std::thread::available_parallelism()
                .map(|p| (p.get() as i32).max(1))
                .unwrap_or(4),
            models_dir: default_models_dir(),
        }
    }
}

/// Default models directory, relative to the working directory
pub fn default_models_dir() -> PathBuf {
    PathBuf::from("models").join("whisper")
}

/// Get the path to a specific model file
pub fn model_path(models_dir: &Path, model: WhisperModel) -> PathBuf {
    models_dir.join(model.filename())
}

/// Check if a model is already downloaded
pub fn is_model_downloaded(models_dir: &Path, model: WhisperModel) -> bool {
    let path = model_path(models_dir, model);

    // Check if file size is reasonable (at least 50% of expected)
    match fs::metadata(&path) {
        Ok(metadata) => {
            let expected_bytes = model.size_mb() * 1024 * 1024;
            metadata.is_file() && metadata.len() >= expected_bytes / 2
        }
        Err(_) => false,
    }
}

/// Download a Whisper model from Hugging Face
pub fn download_model(models_dir: &Path, model: WhisperModel) -> Result<PathBuf, WhisperError> {
    let path = model_path(models_dir, model);

    if is_model_downloaded(models_dir, model) {
        info!("Model {} already downloaded at {:?}", model, path);
        return Ok(path);
    }

    fs::create_dir_all(models_dir)?;

    info!(
        "Downloading Whisper {} model (~{}MB)...",
        model,
        model.size_mb()
    );

    let url = model.hf_url();

    let mut response = reqwest::blocking::Client::builder()
        .timeout(None::<std::time::Duration>)
        .build()
        .and_then(|client| client.get(url).send())
        .map_err(|e| WhisperError::Download(format!("HTTP request failed: {}", e)))?;

    if !response.status().is_success() {
        return Err(WhisperError::Download(format!(
            "HTTP {} from {}",
            response.status(),
            url
        )));
    }

    let total_size = response.content_length().unwrap_or(0);

    let pb = indicatif::ProgressBar::new(total_size);
    pb.set_style(
        indicatif::ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .map_err(|e| WhisperError::Download(format!("Invalid progress template: {}", e)))?
            .progress_chars("#>-"),
    );

    // Stream into a temp file so an interrupted download never looks complete
    let temp_path = path.with_extension("bin.tmp");
    {
        let file = File::create(&temp_path)?;
        let mut writer = pb.wrap_write(file);
        if let Err(e) = response.copy_to(&mut writer) {
            drop(writer);
            let _ = fs::remove_file(&temp_path);
            return Err(WhisperError::Download(format!("Failed to read response: {}", e)));
        }
    }

    pb.finish_with_message("Download complete");

    fs::rename(&temp_path, &path)?;

    info!("Model downloaded to {:?}", path);

    Ok(path)
}

/// Whisper transcriber
pub struct Transcriber {
    ctx: WhisperContext,
    model: WhisperModel,
    config: TranscriptionConfig,
}

impl Transcriber {
    /// Load a model, downloading it first if it is not available locally
    pub fn new(model: WhisperModel, config: TranscriptionConfig) -> Result<Self, WhisperError> {
        let path = download_model(&config.models_dir, model)?;

        info!("Loading Whisper {} model...", model);

        let mut ctx_params = WhisperContextParameters::default();
        ctx_params.use_gpu(config.use_gpu);

        let ctx = WhisperContext::new_with_params(&path.to_string_lossy(), ctx_params)
            .map_err(|e| WhisperError::Init(format!("Failed to load model: {}", e)))?;

        info!(
            "Whisper model loaded successfully (using {} threads, gpu: {})",
            config.n_threads, config.use_gpu
        );

        Ok(Self { ctx, model, config })
    }

    /// Transcribe prepared 16kHz mono audio
    pub fn transcribe(&self, audio: &PreparedAudio) -> Result<Transcript, WhisperError> {
        let start_time = std::time::Instant::now();

        info!(
            "Transcribing {:.1}s of audio (language: {})",
            audio.duration_secs, self.config.language
        );

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });

        params.set_n_threads(self.config.n_threads);
        params.set_language(Some(self.config.language.as_str()));
        params.set_translate(self.config.translate);

        params.set_print_progress(self.config.verbose);
        params.set_print_realtime(self.config.verbose);
        params.set_print_timestamps(self.config.verbose);
        params.set_print_special(false);

        let mut state = self.ctx.create_state()
            .map_err(|e| WhisperError::Transcription(format!("Failed to create state: {}", e)))?;

        state
            .full(params, &audio.samples_16khz)
            .map_err(|e| WhisperError::Transcription(format!("Inference failed: {}", e)))?;

        let num_segments = state.full_n_segments()
            .map_err(|e| WhisperError::Transcription(format!("Failed to get segments: {}", e)))?;

        let mut segments = Vec::with_capacity(num_segments.max(0) as usize);

        for i in 0..num_segments {
            let start_ts = state.full_get_segment_t0(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get start time: {}", e)))?;
            let end_ts = state.full_get_segment_t1(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get end time: {}", e)))?;
            let text = state.full_get_segment_text(i)
                .map_err(|e| WhisperError::Transcription(format!("Failed to get text: {}", e)))?;

            // Timestamps are in centiseconds (1/100 second)
            segments.push(TranscriptSegment {
                id: i as usize,
                start: start_ts as f64 / 100.0,
                end: end_ts as f64 / 100.0,
                text,
            });
        }

        let elapsed = start_time.elapsed();
        let realtime_factor = audio.duration_secs / elapsed.as_secs_f32().max(f32::EPSILON);

        info!(
            "Transcribed {:.1}s of audio in {:.1}s ({:.1}x realtime): {} segments",
            audio.duration_secs,
            elapsed.as_secs_f32(),
            realtime_factor,
            segments.len()
        );
        debug!(
            "Fed {} samples at {}Hz (source: {}Hz, {} channel(s))",
            audio.samples_16khz.len(),
            WHISPER_SAMPLE_RATE,
            audio.source_sample_rate,
            audio.source_channels
        );

        Ok(Transcript::from_segments(segments, Some(self.config.language.clone())))
    }

    /// Get the model being used
    pub fn model(&self) -> WhisperModel {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_parsing() {
        assert_eq!("tiny".parse::<WhisperModel>().unwrap(), WhisperModel::Tiny);
        assert_eq!("SMALL".parse::<WhisperModel>().unwrap(), WhisperModel::Small);
        assert!("invalid".parse::<WhisperModel>().is_err());
    }

    #[test]
    fn test_resolve_menu_numbers() {
        assert_eq!(WhisperModel::resolve("1"), WhisperModel::Tiny);
        assert_eq!(WhisperModel::resolve("2"), WhisperModel::Base);
        assert_eq!(WhisperModel::resolve(" 3 "), WhisperModel::Small);
        assert_eq!(WhisperModel::resolve("4"), WhisperModel::Medium);
        assert_eq!(WhisperModel::resolve("5"), WhisperModel::Large);
    }

    #[test]
    fn test_resolve_falls_back_to_base() {
        for choice in ["", "   ", "0", "6", "12", "abc", "large-v9"] {
            assert_eq!(WhisperModel::resolve(choice), WhisperModel::Base, "choice {:?}", choice);
        }
    }

    #[test]
    fn test_menu_choice_ignores_names() {
        assert_eq!(WhisperModel::from_menu_choice("5\n"), WhisperModel::Large);
        for choice in ["small", "Large", "tiny", "", "0", "6"] {
            assert_eq!(WhisperModel::from_menu_choice(choice), WhisperModel::Base, "choice {:?}", choice);
        }
    }

    #[test]
    fn test_resolve_names() {
        assert_eq!(WhisperModel::resolve("medium"), WhisperModel::Medium);
        assert_eq!(WhisperModel::resolve("Large"), WhisperModel::Large);
    }

    #[test]
    fn test_menu_numbers_follow_order() {
        for (i, model) in WhisperModel::ALL.iter().enumerate() {
            assert_eq!(model.menu_number(), i + 1);
        }
    }

    #[test]
    fn test_model_paths() {
        let dir = default_models_dir();
        assert!(model_path(&dir, WhisperModel::Tiny).to_str().unwrap().contains("ggml-tiny.bin"));
        assert!(WhisperModel::Large.hf_url().ends_with(WhisperModel::Large.filename()));
    }

    #[test]
    fn test_partial_download_is_not_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_model_downloaded(dir.path(), WhisperModel::Tiny));

        fs::write(model_path(dir.path(), WhisperModel::Tiny), vec![0u8; 1024]).unwrap();
        assert!(!is_model_downloaded(dir.path(), WhisperModel::Tiny));
    }

    #[test]
    fn test_config_default() {
        let config = TranscriptionConfig::default();
        assert_eq!(config.language, "es");
        assert!(config.verbose);
        assert!(!config.use_gpu);
        assert!(!config.translate);
        assert!(config.n_threads >= 1);
    }
}

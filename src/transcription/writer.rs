//! Persists a transcript as plain text and reports basic statistics.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use super::Transcript;

/// Name of the text file written into the output directory
pub const OUTPUT_FILE_NAME: &str = "transcripcion.txt";

/// What was written and how big it is
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSummary {
    /// Absolute path of the written file
    pub path: PathBuf,
    pub duration_secs: f64,
    pub word_count: usize,
    pub size_bytes: u64,
}

impl TranscriptSummary {
    pub fn duration_minutes(&self) -> f64 {
        self.duration_secs / 60.0
    }

    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }
}

impl fmt::Display for TranscriptSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "TRANSCRIPTION COMPLETED")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "File saved to:")?;
        writeln!(f, "   {}", self.path.display())?;
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "   - Duration: {:.1} minutes", self.duration_minutes())?;
        writeln!(f, "   - Words: {}", self.word_count)?;
        writeln!(f, "   - Size: {:.1} KB", self.size_kb())?;
        write!(f, "{}", rule)
    }
}

/// Write the transcript text to `output_dir`, replacing any previous output
pub fn save_transcript(transcript: &Transcript, output_dir: &Path) -> io::Result<TranscriptSummary> {
    let path = std::path::absolute(output_dir.join(OUTPUT_FILE_NAME))?;

    {
        let mut file = File::create(&path)?;
        file.write_all(transcript.text.as_bytes())?;
        file.flush()?;
    }

    let size_bytes = std::fs::metadata(&path)?.len();

    info!("Saved transcript to {:?} ({} bytes)", path, size_bytes);

    Ok(TranscriptSummary {
        path,
        duration_secs: transcript.duration_secs(),
        word_count: transcript.word_count(),
        size_bytes,
    })
}

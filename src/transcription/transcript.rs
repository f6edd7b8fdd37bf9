//! Transcript types.

/// A segment of transcribed speech
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// Segment index within the transcript
    pub id: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Transcribed text, as emitted by Whisper (usually with a leading space)
    pub text: String,
}

/// Complete output of a transcription run
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    /// Full text (all segments concatenated)
    pub text: String,
    /// All segments, in order
    pub segments: Vec<TranscriptSegment>,
    /// Language used for decoding
    pub language: Option<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>, segments: Vec<TranscriptSegment>) -> Self {
        Self {
            text: text.into(),
            segments,
            language: None,
        }
    }

    /// Build a transcript whose text is the concatenation of its segments
    pub fn from_segments(segments: Vec<TranscriptSegment>, language: Option<String>) -> Self {
        let text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<String>()
            .trim()
            .to_string();

        Self {
            text,
            segments,
            language,
        }
    }

    /// Number of whitespace-delimited words in the full text
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Audio duration in seconds, taken from the end of the last segment
    pub fn duration_secs(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }
}

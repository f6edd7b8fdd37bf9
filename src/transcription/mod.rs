//! Transcript data and its plain-text output.

pub mod transcript;
pub mod writer;

pub use transcript::{Transcript, TranscriptSegment};
pub use writer::{OUTPUT_FILE_NAME, TranscriptSummary, save_transcript};

//! Transcript payload normalization.
//!
//! The notetaker service serves transcripts in several shapes: a wrapper
//! object holding an array, a bare array, a single object, or plain text.
//! Everything funnels into an ordered list of speaker/text segments.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_SPEAKER: &str = "Speaker";

/// One speaker/text unit of a normalized transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub speaker: String,
    pub text: String,
}

impl TranscriptSegment {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }

    /// Segment attributed to the service itself rather than a participant.
    pub fn system(text: impl Into<String>) -> Self {
        Self::new("System", text)
    }
}

/// Decoded payload shapes, tried in order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Wrapped { transcript: Vec<Value> },
    Entries(Vec<Value>),
    Single(Value),
}

/// One transcript entry before cleanup.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEntry {
    Spoken {
        #[serde(default)]
        text: String,
        #[serde(default = "default_speaker")]
        speaker: String,
    },
    Line(String),
}

fn default_speaker() -> String {
    DEFAULT_SPEAKER.to_string()
}

/// Normalize a decoded JSON payload into ordered segments.
///
/// Entries without usable text are dropped, so the result may be empty.
/// Never fails.
pub fn normalize_value(value: Value) -> Vec<TranscriptSegment> {
    let entries = match serde_json::from_value::<RawPayload>(value) {
        Ok(RawPayload::Wrapped { transcript }) => transcript,
        Ok(RawPayload::Entries(entries)) => entries,
        Ok(RawPayload::Single(single)) => vec![single],
        // Value always matches Single; kept for completeness.
        Err(_) => return Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value::<RawEntry>(entry).ok())
        .filter_map(|entry| {
            let (speaker, text) = match entry {
                RawEntry::Spoken { text, speaker } => {
                    let speaker = speaker.trim();
                    let speaker = if speaker.is_empty() {
                        DEFAULT_SPEAKER
                    } else {
                        speaker
                    };
                    (speaker.to_string(), text.trim().to_string())
                }
                RawEntry::Line(line) => (DEFAULT_SPEAKER.to_string(), line.trim().to_string()),
            };
            if text.is_empty() {
                None
            } else {
                Some(TranscriptSegment { speaker, text })
            }
        })
        .collect()
}

/// Normalize a raw response body.
///
/// A body that does not decode as JSON becomes a single plain-text segment
/// instead of an error.
pub fn normalize_raw(raw: &str) -> Vec<TranscriptSegment> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize_value(value),
        Err(_) => vec![TranscriptSegment::new("Transcript", raw)],
    }
}

/// Combined plain text of all segments, for the fallback cache.
pub fn combined_text(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Speaker-attributed rendering for read responses.
pub fn render_dialogue(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.speaker, s.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

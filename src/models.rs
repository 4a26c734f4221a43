//! Shared data model: request/response types crossing the §6.2 JSON boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Round a float to three decimal places, matching the Python reference's
/// `round(x, 3)` behavior closely enough for the spec's tolerance.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AlignBackend {
    Uniform,
    CtcTrellis,
    PhonemeFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum AsrBackend {
    Disabled,
    Auto,
    Parakeet,
    ParakeetTdt,
    CrisperWhisper,
    WhisperLargeV3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSource {
    Audio,
    Heuristic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Provided,
    Asr,
}

/// A request to align a transcript against an audio recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignRequest {
    pub audio_path: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_backend")]
    pub backend: AlignBackend,
    #[serde(default = "default_asr")]
    pub asr: AsrBackend,
    #[serde(default)]
    pub verbatim: bool,
    #[serde(default = "default_true")]
    pub include_phonemes: bool,
    #[serde(default)]
    pub sample_rate_hz: Option<u32>,
}

fn default_language() -> String {
    "auto".to_string()
}
fn default_backend() -> AlignBackend {
    AlignBackend::Uniform
}
fn default_asr() -> AsrBackend {
    AsrBackend::Disabled
}
fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WordAlignment {
    pub word: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhonemeAlignment {
    pub phoneme: String,
    pub word_index: usize,
    pub start_sec: f64,
    pub end_sec: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentMetadata {
    pub language: String,
    pub alignment_backend: AlignBackend,
    pub normalizer_id: String,
    pub token_count: usize,
    pub timing_source: TimingSource,
    pub transcript_source: TranscriptSource,
    pub asr_backend: Option<String>,
    pub asr_model_id: Option<String>,
    pub license_warning: Option<String>,
    pub model_id: String,
    pub algorithm: String,
    pub generated_at: DateTime<Utc>,
    pub duration_sec: f64,
    pub sample_rate_hz: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignResponse {
    pub metadata: AlignmentMetadata,
    pub words: Vec<WordAlignment>,
    pub phonemes: Vec<PhonemeAlignment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_three_decimals() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(0.0), 0.0);
    }

    #[test]
    fn request_defaults_match_spec() {
        let json = r#"{"audio_path": "x.wav"}"#;
        let req: AlignRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.language, "auto");
        assert_eq!(req.backend, AlignBackend::Uniform);
        assert_eq!(req.asr, AsrBackend::Disabled);
        assert!(req.include_phonemes);
        assert!(!req.verbatim);
    }

    #[test]
    fn backend_enum_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&AlignBackend::CtcTrellis).unwrap(),
            "\"ctc_trellis\""
        );
        assert_eq!(
            serde_json::to_string(&AsrBackend::CrisperWhisper).unwrap(),
            "\"crisper_whisper\""
        );
    }
}

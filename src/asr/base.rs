//! ASR backend interfaces and result types.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAsrBackend {
    Parakeet,
    ParakeetTdt,
    CrisperWhisper,
    WhisperLargeV3,
}

impl ResolvedAsrBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parakeet => "parakeet",
            Self::ParakeetTdt => "parakeet_tdt",
            Self::CrisperWhisper => "crisper_whisper",
            Self::WhisperLargeV3 => "whisper_large_v3",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrSource {
    Real,
    Simulated,
}

/// ASR transcription output.
#[derive(Debug, Clone)]
pub struct AsrResult {
    pub transcript: String,
    pub language_code: String,
    pub backend: String,
    pub model_id: String,
    pub source: AsrSource,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum AsrError {
    #[error("ASR backend is disabled; transcript must be provided")]
    Disabled,
}

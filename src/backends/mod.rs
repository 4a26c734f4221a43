//! Alignment backends: strategies that turn normalized tokens + audio
//! duration into word (and optionally phoneme) time boundaries.

pub mod ctc_trellis;
pub mod phoneme_first;
pub mod uniform;

use crate::error::VoxAlignResult;
use crate::models::{AlignBackend, PhonemeAlignment, WordAlignment};
use crate::providers::AudioBuffer;

/// Everything a backend needs beyond the token list and duration: the
/// decoded audio (for real emission providers) and the resolved language
/// code (for phoneme routing and model selection).
pub struct BackendInput<'a> {
    pub tokens: &'a [String],
    pub duration_sec: f64,
    pub language_code: &'a str,
    pub audio: Option<AudioBuffer<'a>>,
}

/// Word (and optional phoneme) alignment output with backend provenance.
#[derive(Debug, Clone)]
pub struct BackendResult {
    pub words: Vec<WordAlignment>,
    pub phonemes: Vec<PhonemeAlignment>,
    pub model_id: String,
    pub algorithm: String,
}

impl BackendResult {
    fn words_only(words: Vec<WordAlignment>, model_id: impl Into<String>, algorithm: impl Into<String>) -> Self {
        Self {
            words,
            phonemes: Vec::new(),
            model_id: model_id.into(),
            algorithm: algorithm.into(),
        }
    }
}

pub trait AlignmentBackend {
    /// Runs the backend. Only a `DecoderInvariant`-class failure (the
    /// trellis finding no reachable path at all) is propagated as an
    /// error here; every provider-level failure is already resolved
    /// internally by falling back to the simulator (§4.2/§7).
    fn align_words(&self, input: &BackendInput) -> VoxAlignResult<BackendResult>;
}

/// Resolve a backend selector to its implementation. The registry is
/// constructed fresh per call since each backend is a small, stateless
/// value; the expensive state (provider bundle cache) lives in the
/// providers it wraps, not here.
pub fn resolve_backend(name: AlignBackend) -> Box<dyn AlignmentBackend> {
    match name {
        AlignBackend::Uniform => Box::new(uniform::UniformBackend),
        AlignBackend::CtcTrellis => Box::new(ctc_trellis::CtcTrellisBackend::new()),
        AlignBackend::PhonemeFirst => Box::new(phoneme_first::PhonemeFirstBackend::new()),
    }
}

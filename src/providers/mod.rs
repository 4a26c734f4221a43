//! Emission providers: sources of (log-prob matrix, token encoding) pairs.
//!
//! Two families exist (word-level, phoneme-level), each with a real
//! Hugging Face-backed provider and a deterministic simulator. Selection
//! follows a strict fallback order (§4.2): try the real provider, and on
//! *any* failure fall back to the simulator without panicking.

pub mod cache;
pub mod phoneme_real;
pub mod phoneme_simulator;
pub mod simulate;
pub mod word_real;
pub mod word_simulator;

use std::sync::Arc;

/// A symbol produced by an emission provider: either a surface word (word
/// backend) or a single phoneme (phoneme backend). Providers only ever see
/// the text of the symbol; spans are derived from how many sub-tokens each
/// symbol encodes to.
pub type Symbol = str;

/// Emission pack: everything the trellis needs to decode, plus provenance.
#[derive(Debug, Clone)]
pub struct EmissionPack {
    /// T x V log-probability matrix, row-normalized.
    pub emissions: Arc<Vec<Vec<f32>>>,
    /// Sub-token ids in order, excluding any blank-id occurrences.
    pub token_ids: Vec<u32>,
    /// Half-open `(start, end)` index ranges into `token_ids` per input
    /// symbol (word or phoneme), in input order.
    pub symbol_token_spans: Vec<(usize, usize)>,
    pub blank_id: u32,
    pub model_id: String,
    pub algorithm_tag: String,
}

/// Why a provider declined to produce an emission pack. Never a panic path.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("provider resources unavailable: {0}")]
    NotAvailable(String),
    #[error("provider encoding failed: {0}")]
    EncodingFailed(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A decoded mono audio buffer handed to providers for feature extraction.
/// Simulators only read its duration; real providers read the samples too.
#[derive(Debug, Clone, Copy)]
pub struct AudioBuffer<'a> {
    pub samples: &'a [f32],
    pub sample_rate_hz: u32,
}

impl<'a> AudioBuffer<'a> {
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate_hz == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate_hz as f64
    }
}

/// Capability set shared by real and simulator provider variants.
pub trait EmissionProvider {
    fn encode(
        &self,
        symbols: &[String],
        language: &str,
        audio: &AudioBuffer,
    ) -> ProviderResult<EmissionPack>;
}

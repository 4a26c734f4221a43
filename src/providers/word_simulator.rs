//! Deterministic word-level emission simulator (no model download, no
//! network access). Grounded in `_simulate_emission_pack` /
//! `_simulate_emissions` / `_log_softmax` from the original CTC trellis
//! backend: every word maps to exactly one sub-token, and the expanded
//! state path sweeps linearly across the available frames.

use crate::providers::simulate::simulate_emission_pack;
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider, ProviderResult};

pub const MODEL_ID: &str = "voxalign-word-simulator-v1";
const ALGORITHM_TAG: &str = "simulated-ctc-linear-sweep";

/// Stateless word emission simulator; frame count is derived from the
/// audio buffer's duration at encode time.
pub struct WordSimulatorProvider;

impl EmissionProvider for WordSimulatorProvider {
    fn encode(
        &self,
        symbols: &[String],
        _language: &str,
        audio: &AudioBuffer,
    ) -> ProviderResult<EmissionPack> {
        Ok(simulate_emission_pack(
            symbols.len(),
            audio.duration_sec(),
            MODEL_ID,
            ALGORITHM_TAG,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_one_sub_token_per_word() {
        let provider = WordSimulatorProvider;
        let words = vec!["hello".to_string(), "world".to_string()];
        let samples = vec![0.0_f32; 32_000];
        let audio = AudioBuffer {
            samples: &samples,
            sample_rate_hz: 16_000,
        };
        let pack = provider.encode(&words, "en", &audio).unwrap();
        assert_eq!(pack.token_ids.len(), 2);
        assert_eq!(pack.symbol_token_spans, vec![(0, 1), (1, 2)]);
        assert_eq!(pack.model_id, MODEL_ID);
    }

    #[test]
    fn never_fails_on_empty_input() {
        let provider = WordSimulatorProvider;
        let audio = AudioBuffer {
            samples: &[],
            sample_rate_hz: 16_000,
        };
        assert!(provider.encode(&[], "en", &audio).is_ok());
    }
}

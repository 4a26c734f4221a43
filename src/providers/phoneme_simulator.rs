//! Deterministic phoneme-level emission simulator. Same linear-sweep
//! construction as the word simulator, applied to a flattened phoneme
//! sequence instead of a word sequence.

use crate::providers::simulate::simulate_emission_pack;
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider, ProviderResult};

pub const MODEL_ID: &str = "voxalign-phoneme-simulator-v1";
const ALGORITHM_TAG: &str = "simulated-ctc-linear-sweep";

pub struct PhonemeSimulatorProvider;

impl EmissionProvider for PhonemeSimulatorProvider {
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
    fn encodes_one_sub_token_per_phoneme() {
        let provider = PhonemeSimulatorProvider;
        let phonemes = vec![
            "h".to_string(),
            "eh".to_string(),
            "l".to_string(),
            "ow".to_string(),
        ];
        let samples = vec![0.0_f32; 24_000];
        let audio = AudioBuffer {
            samples: &samples,
            sample_rate_hz: 16_000,
        };
        let pack = provider.encode(&phonemes, "en", &audio).unwrap();
        assert_eq!(pack.token_ids.len(), 4);
        assert_eq!(pack.symbol_token_spans.len(), 4);
        assert_eq!(pack.model_id, MODEL_ID);
    }
}

//! Real phoneme-level CTC emission provider. Same linear-head shape as
//! the word provider, but each input symbol is already a single phoneme
//! token (no multi-piece tokenization, no inter-word delimiter).

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::ops::log_softmax;
use candle_nn::VarBuilder;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use crate::providers::cache::{BundleCache, CacheKey};
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider, ProviderError, ProviderResult};

pub const DEFAULT_MODEL_ID: &str = "voxalign/ctc-phoneme-base";
const WEIGHTS_FILENAME: &str = "model.safetensors";
const TOKENIZER_FILENAME: &str = "tokenizer.json";
const FEATURE_DIM: usize = 80;
const FRAME_HZ: f64 = 100.0;
const BLANK_ID: u32 = 0;
const ALGORITHM_TAG: &str = "ctc-linear-head-phoneme-v1";

struct PhonemeCtcBundle {
    tokenizer: Tokenizer,
    device: Device,
    head_weight: Tensor,
    head_bias: Tensor,
}

pub struct PhonemeRealProvider {
    model_id: String,
    device_preference: String,
    cache: Arc<BundleCache>,
}

impl PhonemeRealProvider {
    pub fn new(cache: Arc<BundleCache>) -> Self {
        Self::with_model(DEFAULT_MODEL_ID, "cpu", cache)
    }

    pub fn with_model(
        model_id: impl Into<String>,
        device_preference: impl Into<String>,
        cache: Arc<BundleCache>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            device_preference: device_preference.into(),
            cache,
        }
    }

    fn load_bundle(&self) -> anyhow::Result<PhonemeCtcBundle> {
        let device = resolve_device(&self.device_preference)?;
        let api = Api::new()?;
        let repo = api.model(self.model_id.clone());

        let tokenizer_path = repo.get(TOKENIZER_FILENAME)?;
        let weights_path = repo.get(WEIGHTS_FILENAME)?;

        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|err| anyhow::anyhow!("tokenizer load failed: {err}"))?;
        let vocab_size = (tokenizer.get_vocab_size(true)).max(BLANK_ID as usize + 1);

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device)? };
        let head_weight = vb.get((vocab_size, FEATURE_DIM), "ctc_head.weight")?;
        let head_bias = vb.get(vocab_size, "ctc_head.bias")?;

        Ok(PhonemeCtcBundle {
            tokenizer,
            device,
            head_weight,
            head_bias,
        })
    }

    fn bundle(&self) -> anyhow::Result<Arc<PhonemeCtcBundle>> {
        let key = CacheKey::new(&self.model_id, &self.device_preference);
        self.cache.get_or_try_insert_with(&key, || self.load_bundle())
    }
}

impl EmissionProvider for PhonemeRealProvider {
    fn encode(
        &self,
        symbols: &[String],
        _language: &str,
        audio: &AudioBuffer,
    ) -> ProviderResult<EmissionPack> {
        let bundle = self
            .bundle()
            .map_err(|err| ProviderError::NotAvailable(err.to_string()))?;

        let (token_ids, symbol_token_spans) = encode_phonemes(&bundle.tokenizer, symbols)
            .map_err(|err| ProviderError::EncodingFailed(err.to_string()))?;

        let features = extract_features(audio);
        let frame_count = features.len() / FEATURE_DIM;
        if frame_count == 0 {
            return Err(ProviderError::NotAvailable(
                "no audio frames available for feature extraction".to_string(),
            ));
        }

        let emissions = (|| -> anyhow::Result<Vec<Vec<f32>>> {
            let features = Tensor::from_vec(features, (frame_count, FEATURE_DIM), &bundle.device)?;
            let logits = features
                .matmul(&bundle.head_weight.t()?)?
                .broadcast_add(&bundle.head_bias)?;
            let log_probs = log_softmax(&logits, 1)?;
            Ok(log_probs.to_vec2::<f32>()?)
        })()
        .map_err(|err| ProviderError::NotAvailable(err.to_string()))?;

        Ok(EmissionPack {
            emissions: Arc::new(emissions),
            token_ids,
            symbol_token_spans,
            blank_id: BLANK_ID,
            model_id: self.model_id.clone(),
            algorithm_tag: ALGORITHM_TAG.to_string(),
        })
    }
}

/// Each phoneme is a single vocabulary entry; tokenizer lookup misses fall
/// back to sub-token encoding, and a phoneme that still yields nothing
/// falls back to the unk token, or fails the call if none is configured
/// (§3/§4.2: empty token spans are disallowed).
/// Resolve the `DEVICE` toggle (§6.4: `auto|cpu|cuda|mps`). See the
/// matching helper in `word_real.rs` for why `mps` degrades to the
/// CUDA-or-CPU probe rather than a true Metal device.
fn resolve_device(device_preference: &str) -> anyhow::Result<Device> {
    match device_preference {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "auto" | "mps" => Ok(Device::cuda_if_available(0)?),
        other => anyhow::bail!("unknown device preference {other:?}"),
    }
}

fn encode_phonemes(
    tokenizer: &Tokenizer,
    phonemes: &[String],
) -> anyhow::Result<(Vec<u32>, Vec<(usize, usize)>)> {
    let unk_id = unk_token_id(tokenizer);
    let mut token_ids = Vec::with_capacity(phonemes.len());
    let mut spans = Vec::with_capacity(phonemes.len());

    for phoneme in phonemes {
        let start = token_ids.len();
        match tokenizer.token_to_id(phoneme.as_str()) {
            Some(id) if id != BLANK_ID => token_ids.push(id),
            _ => {
                let encoding = tokenizer
                    .encode(phoneme.as_str(), false)
                    .map_err(|err| anyhow::anyhow!("tokenizer encode failed for {phoneme:?}: {err}"))?;
                for id in encoding.get_ids() {
                    if *id != BLANK_ID {
                        token_ids.push(*id);
                    }
                }
            }
        }
        if token_ids.len() == start {
            match unk_id {
                Some(unk) => token_ids.push(unk),
                None => {
                    anyhow::bail!("phoneme {phoneme:?} encoded to no tokens and no unk token is configured")
                }
            }
        }
        spans.push((start, token_ids.len()));
    }

    Ok((token_ids, spans))
}

/// Resolve the tokenizer's unknown-token id by probing the spellings
/// conventional HF tokenizers use.
fn unk_token_id(tokenizer: &Tokenizer) -> Option<u32> {
    ["[UNK]", "<unk>", "<UNK>"]
        .into_iter()
        .find_map(|candidate| tokenizer.token_to_id(candidate))
        .filter(|&id| id != BLANK_ID)
}

fn extract_features(audio: &AudioBuffer) -> Vec<f32> {
    let sample_rate = audio.sample_rate_hz.max(1) as f64;
    let samples_per_frame = ((sample_rate / FRAME_HZ).round() as usize).max(1);
    let frame_count = (audio.samples.len() / samples_per_frame).max(1);
    let sub_window = (samples_per_frame / FEATURE_DIM).max(1);

    let mut features = Vec::with_capacity(frame_count * FEATURE_DIM);
    for frame in 0..frame_count {
        let frame_start = frame * samples_per_frame;
        for band in 0..FEATURE_DIM {
            let band_start = frame_start + band * sub_window;
            let band_end = (band_start + sub_window).min(audio.samples.len());
            let energy = if band_start >= band_end {
                0.0
            } else {
                let window = &audio.samples[band_start..band_end];
                let mean_sq: f32 =
                    window.iter().map(|v| v * v).sum::<f32>() / window.len() as f32;
                (mean_sq + 1e-8).ln()
            };
            features.push(energy);
        }
    }
    features
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_extraction_covers_all_bands() {
        let samples = vec![0.05_f32; 1600];
        let audio = AudioBuffer {
            samples: &samples,
            sample_rate_hz: 16_000,
        };
        let features = extract_features(&audio);
        assert_eq!(features.len() % FEATURE_DIM, 0);
    }
}

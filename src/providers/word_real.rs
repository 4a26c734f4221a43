//! Real word-level CTC emission provider.
//!
//! Loads a tokenizer and a small linear CTC head (weights shaped
//! `[vocab_size, FEATURE_DIM]`) from Hugging Face Hub, the same
//! repo/device-resolution shape as the candle-based model loading in the
//! teacher's audio pipeline. Feature extraction is a fixed-rate,
//! energy-banded front end rather than a full mel filterbank, since the
//! CTC head here only needs a stable per-frame feature vector to score
//! against — not a bit-exact acoustic model.
//!
//! Any failure anywhere in this chain (network, missing repo, malformed
//! weights, tensor shape mismatch) surfaces as `ProviderError` so the
//! caller can fall back to the simulator; nothing here panics.

use std::sync::Arc;

use candle_core::{DType, Device, Tensor};
use candle_nn::ops::log_softmax;
use candle_nn::VarBuilder;
use hf_hub::api::sync::Api;
use tokenizers::Tokenizer;

use crate::providers::cache::{BundleCache, CacheKey};
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider, ProviderError, ProviderResult};

pub const DEFAULT_MODEL_ID: &str = "voxalign/ctc-word-base";
const WEIGHTS_FILENAME: &str = "model.safetensors";
const TOKENIZER_FILENAME: &str = "tokenizer.json";
const FEATURE_DIM: usize = 80;
const FRAME_HZ: f64 = 100.0;
const BLANK_ID: u32 = 0;
const ALGORITHM_TAG: &str = "ctc-linear-head-v1";

struct WordCtcBundle {
    tokenizer: Tokenizer,
    device: Device,
    head_weight: Tensor,
    head_bias: Tensor,
    vocab_size: usize,
}

pub struct WordRealProvider {
    model_id: String,
    device_preference: String,
    cache: Arc<BundleCache>,
}

impl WordRealProvider {
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

    fn load_bundle(&self) -> anyhow::Result<WordCtcBundle> {
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

        Ok(WordCtcBundle {
            tokenizer,
            device,
            head_weight,
            head_bias,
            vocab_size,
        })
    }

    fn bundle(&self) -> anyhow::Result<Arc<WordCtcBundle>> {
        let key = CacheKey::new(&self.model_id, &self.device_preference);
        self.cache.get_or_try_insert_with(&key, || self.load_bundle())
    }
}

impl EmissionProvider for WordRealProvider {
    fn encode(
        &self,
        symbols: &[String],
        _language: &str,
        audio: &AudioBuffer,
    ) -> ProviderResult<EmissionPack> {
        let bundle = self
            .bundle()
            .map_err(|err| ProviderError::NotAvailable(err.to_string()))?;

        let (token_ids, symbol_token_spans) = encode_words_for_ctc(&bundle.tokenizer, symbols)
            .map_err(|err| ProviderError::EncodingFailed(err.to_string()))?;

        let emissions = run_ctc_head(&bundle, audio)
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

/// Resolve the `DEVICE` toggle (§6.4: `auto|cpu|cuda|mps`). `auto` and
/// `mps` both fall through to the first available accelerator this build
/// supports, which today is CUDA-or-CPU; this crate isn't built with
/// candle's `metal` feature, so `mps` degrades to that same probe rather
/// than failing the provider outright.
fn resolve_device(device_preference: &str) -> anyhow::Result<Device> {
    match device_preference {
        "cpu" => Ok(Device::Cpu),
        "cuda" | "auto" | "mps" => Ok(Device::cuda_if_available(0)?),
        other => anyhow::bail!("unknown device preference {other:?}"),
    }
}

/// Encode each word to sub-token ids, inserting a word-delimiter token
/// between (not after) words. Blank-id occurrences are stripped; a word
/// that encodes to nothing falls back to the tokenizer's unk id, or fails
/// the whole call if no unk token is configured (§3/§4.2: empty word-token
/// spans are disallowed).
fn encode_words_for_ctc(
    tokenizer: &Tokenizer,
    words: &[String],
) -> anyhow::Result<(Vec<u32>, Vec<(usize, usize)>)> {
    let delimiter_id = tokenizer.token_to_id("|").or_else(|| tokenizer.token_to_id("_"));
    let unk_id = unk_token_id(tokenizer);

    let mut token_ids = Vec::new();
    let mut spans = Vec::with_capacity(words.len());

    for (index, word) in words.iter().enumerate() {
        if index > 0 {
            if let Some(delim) = delimiter_id {
                if delim != BLANK_ID {
                    token_ids.push(delim);
                }
            }
        }
        let encoding = tokenizer
            .encode(word.as_str(), false)
            .map_err(|err| anyhow::anyhow!("tokenizer encode failed for {word:?}: {err}"))?;
        let start = token_ids.len();
        for id in encoding.get_ids() {
            if *id != BLANK_ID {
                token_ids.push(*id);
            }
        }
        if token_ids.len() == start {
            match unk_id {
                Some(unk) => token_ids.push(unk),
                None => anyhow::bail!("word {word:?} encoded to no tokens and no unk token is configured"),
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

fn run_ctc_head(bundle: &WordCtcBundle, audio: &AudioBuffer) -> anyhow::Result<Vec<Vec<f32>>> {
    let features = extract_features(audio);
    let frame_count = features.len() / FEATURE_DIM;
    if frame_count == 0 {
        anyhow::bail!("no audio frames available for feature extraction");
    }

    let features = Tensor::from_vec(features, (frame_count, FEATURE_DIM), &bundle.device)?;
    let logits = features
        .matmul(&bundle.head_weight.t()?)?
        .broadcast_add(&bundle.head_bias)?;
    let log_probs = log_softmax(&logits, 1)?;
    log_probs
        .to_vec2::<f32>()
        .map_err(|err| anyhow::anyhow!("tensor materialization failed: {err}"))
}

/// Fixed-rate, energy-banded feature front end: each `FRAME_HZ` frame is
/// split into `FEATURE_DIM` equal sub-windows and scored by log-RMS energy.
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
    fn feature_extraction_yields_frame_aligned_vector() {
        let samples = vec![0.1_f32; 1600];
        let audio = AudioBuffer {
            samples: &samples,
            sample_rate_hz: 16_000,
        };
        let features = extract_features(&audio);
        assert_eq!(features.len() % FEATURE_DIM, 0);
        assert!(!features.is_empty());
    }
}

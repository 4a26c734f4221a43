//! CTC/trellis word alignment backend: runs the Viterbi trellis decoder
//! over either real Hugging Face CTC emissions or a deterministic
//! simulated fallback, and derives word time spans + confidences from the
//! resulting token-frame spans.
//!
//! Grounded directly in `CtcTrellisBackend.align_words` /
//! `_word_alignments_from_token_spans` / `_word_confidence` from the
//! original implementation; the real/simulated fallback chain follows
//! `_try_real_emissions` (any failure -> simulator, never a panic).

use std::env;
use std::sync::Arc;

use crate::backends::{AlignmentBackend, BackendInput, BackendResult};
use crate::error::{VoxAlignError, VoxAlignResult};
use crate::models::{round3, WordAlignment};
use crate::providers::cache::shared as shared_cache;
use crate::providers::word_real::WordRealProvider;
use crate::providers::word_simulator::WordSimulatorProvider;
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider};
use crate::trellis::{build_state_symbols, token_spans, viterbi, TokenFrameSpan};

const SIM_MODEL_ID: &str = "ctc-trellis-v0";
const SIM_ALGORITHM: &str = "ctc-viterbi-simulated-emissions";
const DEFAULT_DEVICE: &str = "cpu";

pub struct CtcTrellisBackend;

impl CtcTrellisBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CtcTrellisBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentBackend for CtcTrellisBackend {
    fn align_words(&self, input: &BackendInput) -> VoxAlignResult<BackendResult> {
        if input.tokens.is_empty() {
            return Ok(BackendResult::words_only(Vec::new(), SIM_MODEL_ID, SIM_ALGORITHM));
        }

        let pack = acquire_emission_pack(input);
        let state_symbols = build_state_symbols(&pack.token_ids, pack.blank_id);
        let state_path = viterbi(&pack.emissions, &state_symbols)
            .map_err(|err| VoxAlignError::DecoderInvariant(err.to_string()))?;
        let spans = token_spans(&state_path, pack.token_ids.len());

        let words = word_alignments_from_token_spans(
            input.tokens,
            input.duration_sec,
            &pack.emissions,
            &pack.token_ids,
            &pack.symbol_token_spans,
            &spans,
        );

        Ok(BackendResult::words_only(words, pack.model_id.clone(), pack.algorithm_tag.clone()))
    }
}

/// Try the real HF-backed provider when audio is available and the
/// toggle env var allows it; on any failure, fall back to the simulator.
/// This never returns an error — the simulator always succeeds.
fn acquire_emission_pack(input: &BackendInput) -> EmissionPack {
    if let Some(audio) = input.audio {
        if env_truthy("USE_HF_WORD", true) {
            let model_id = env::var("CTC_MODEL_ID")
                .unwrap_or_else(|_| crate::providers::word_real::DEFAULT_MODEL_ID.to_string());
            let device = env::var("DEVICE").unwrap_or_else(|_| DEFAULT_DEVICE.to_string());
            let provider = WordRealProvider::with_model(model_id, device, shared_cache());
            if let Ok(pack) = provider.encode(input.tokens, input.language_code, &audio) {
                return pack;
            }
        }
        return simulate_from_duration(input, audio.duration_sec());
    }

    simulate_from_duration(input, input.duration_sec)
}

/// The simulator only reads duration, but still needs a buffer whose
/// `duration_sec()` matches — build one at a nominal 100Hz sample rate.
fn simulate_from_duration(input: &BackendInput, duration_sec: f64) -> EmissionPack {
    const NOMINAL_RATE: u32 = 100;
    let sample_count = (duration_sec.max(0.0) * f64::from(NOMINAL_RATE)).round() as usize;
    let samples = vec![0.0_f32; sample_count];
    let audio = AudioBuffer {
        samples: &samples,
        sample_rate_hz: NOMINAL_RATE,
    };
    WordSimulatorProvider
        .encode(input.tokens, input.language_code, &audio)
        .expect("simulator never fails")
}

fn word_alignments_from_token_spans(
    words: &[String],
    duration_sec: f64,
    emissions: &Arc<Vec<Vec<f32>>>,
    token_ids: &[u32],
    word_token_spans: &[(usize, usize)],
    token_spans: &[TokenFrameSpan],
) -> Vec<WordAlignment> {
    if words.is_empty() {
        return Vec::new();
    }

    let frame_count = emissions.len().max(1);
    let frame_sec = if duration_sec > 0.0 {
        duration_sec / frame_count as f64
    } else {
        0.0
    };
    let last_index = words.len() - 1;

    words
        .iter()
        .enumerate()
        .map(|(word_index, word)| {
            let (token_start, token_end) = word_token_spans[word_index];
            let word_spans = &token_spans[token_start..token_end];
            let word_token_ids = &token_ids[token_start..token_end];

            let valid: Vec<&TokenFrameSpan> =
                word_spans.iter().filter(|span| span.end_frame > span.start_frame).collect();
            let (start_frame, end_frame) = match (valid.first(), valid.last()) {
                (Some(first), Some(last)) => (first.start_frame, last.end_frame),
                _ => (0, 0),
            };

            let mut start_sec = round3(start_frame as f64 * frame_sec);
            let mut end_sec = round3(end_frame as f64 * frame_sec);
            if word_index == last_index {
                end_sec = duration_sec;
            }
            if start_sec > end_sec {
                start_sec = end_sec;
            }

            let confidence = round3(word_confidence(emissions, word_token_ids, word_spans));

            WordAlignment {
                word: word.clone(),
                start_sec,
                end_sec,
                confidence,
            }
        })
        .collect()
}

fn word_confidence(emissions: &[Vec<f32>], token_ids: &[u32], spans: &[TokenFrameSpan]) -> f64 {
    let mut probabilities = Vec::new();
    for (token_id, span) in token_ids.iter().zip(spans.iter()) {
        if span.end_frame <= span.start_frame {
            continue;
        }
        for frame in span.start_frame..span.end_frame {
            if let Some(row) = emissions.get(frame) {
                if let Some(logprob) = row.get(*token_id as usize) {
                    probabilities.push(f64::from(logprob.exp()));
                }
            }
        }
    }

    if probabilities.is_empty() {
        return 0.55;
    }
    let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
    mean.clamp(0.55, 0.95)
}

fn env_truthy(name: &str, default: bool) -> bool {
    match env::var(name) {
        Err(_) => default,
        Ok(raw) => !matches!(raw.to_lowercase().as_str(), "0" | "false" | "no" | "off"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_words_with_simulator_when_no_audio() {
        let tokens = vec!["hello".to_string(), "world".to_string()];
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 2.0,
            language_code: "en",
            audio: None,
        };
        let result = CtcTrellisBackend::new().align_words(&input).unwrap();
        assert_eq!(result.words.len(), 2);
        assert_eq!(result.model_id, SIM_MODEL_ID);
        assert_eq!(result.words.last().unwrap().end_sec, 2.0);
        for word in &result.words {
            assert!(word.confidence >= 0.55 && word.confidence <= 0.95);
        }
    }

    #[test]
    fn empty_tokens_short_circuit() {
        let input = BackendInput {
            tokens: &[],
            duration_sec: 1.0,
            language_code: "en",
            audio: None,
        };
        let result = CtcTrellisBackend::new().align_words(&input).unwrap();
        assert!(result.words.is_empty());
        assert_eq!(result.algorithm, SIM_ALGORITHM);
    }

    #[test]
    fn monotonic_non_overlapping_spans() {
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 3.0,
            language_code: "en",
            audio: None,
        };
        let result = CtcTrellisBackend::new().align_words(&input).unwrap();
        for pair in result.words.windows(2) {
            assert!(pair[0].start_sec <= pair[0].end_sec);
            assert!(pair[0].end_sec <= pair[1].start_sec + 1e-6);
        }
    }
}

//! Phoneme-first alignment backend.
//!
//! Routing strategy (grounded in `PhonemeFirstBackend.align_words`):
//! - English: word boundaries come from the CTC trellis backend, then
//!   phonemes are distributed uniformly within each word's span.
//! - Other languages: phonemes are decoded directly over the whole
//!   utterance with a real/simulated phoneme emission provider and a
//!   Viterbi trellis pass, with per-phoneme confidence derived from
//!   emission mass (clamped `[0.6, 0.95]`) rather than a flat constant —
//!   when no phonemes result, the backend falls back to word-only
//!   CTC-trellis output.

use std::env;
use std::sync::Arc;

use crate::backends::ctc_trellis::CtcTrellisBackend;
use crate::backends::{AlignmentBackend, BackendInput, BackendResult};
use crate::error::{VoxAlignError, VoxAlignResult};
use crate::models::{round3, PhonemeAlignment, WordAlignment};
use crate::providers::cache::shared as shared_cache;
use crate::providers::phoneme_real::PhonemeRealProvider;
use crate::providers::phoneme_simulator::PhonemeSimulatorProvider;
use crate::providers::{AudioBuffer, EmissionPack, EmissionProvider};
use crate::trellis::{build_state_symbols, token_spans, viterbi, TokenFrameSpan};

const ALGO_EN: &str = "phoneme-first-en-word-ctc-then-ipa-constrained";
const ALGO_MULTI: &str = "phoneme-first-multilingual-ipa-ctc";
const ALGO_MULTI_FALLBACK: &str = "phoneme-first-multilingual-ipa-fallback-to-ctc-word";
const ENGLISH_CODE: &str = "en";
const KOREAN_CODE: &str = "ko";
const DEFAULT_PHONEME_MODEL_ID: &str = "voxalign/ctc-phoneme-base";
const DEFAULT_DEVICE: &str = "cpu";

struct WordPhonemes {
    word: String,
    phonemes: Vec<String>,
}

pub struct PhonemeFirstBackend {
    word_backend: CtcTrellisBackend,
}

impl PhonemeFirstBackend {
    pub fn new() -> Self {
        Self {
            word_backend: CtcTrellisBackend::new(),
        }
    }
}

impl Default for PhonemeFirstBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AlignmentBackend for PhonemeFirstBackend {
    fn align_words(&self, input: &BackendInput) -> VoxAlignResult<BackendResult> {
        if input.tokens.is_empty() {
            return Ok(BackendResult {
                words: Vec::new(),
                phonemes: Vec::new(),
                model_id: resolve_phoneme_model_id(),
                algorithm: ALGO_MULTI.to_string(),
            });
        }

        let language = normalize_language_code(input.language_code);
        let words_with_phonemes: Vec<WordPhonemes> = input
            .tokens
            .iter()
            .map(|token| word_to_phonemes(token, language.as_deref()))
            .collect();

        if language.as_deref() == Some(ENGLISH_CODE) {
            let word_result = self.word_backend.align_words(input)?;
            let phonemes =
                align_phonemes_with_word_constraints(&word_result.words, &words_with_phonemes);
            return Ok(BackendResult {
                model_id: format!("{}+{}", word_result.model_id, resolve_phoneme_model_id()),
                algorithm: format!("{ALGO_EN}+{}", word_result.algorithm),
                words: word_result.words,
                phonemes,
            });
        }

        let phonemes = align_phonemes_globally(&words_with_phonemes, input)?;
        if phonemes.is_empty() {
            let fallback = self.word_backend.align_words(input)?;
            return Ok(BackendResult {
                model_id: format!("{}+{}", resolve_phoneme_model_id(), fallback.model_id),
                algorithm: format!("{ALGO_MULTI_FALLBACK}+{}", fallback.algorithm),
                words: fallback.words,
                phonemes: Vec::new(),
            });
        }

        let words = group_words_from_phonemes(input.tokens, &phonemes, input.duration_sec);
        Ok(BackendResult {
            words,
            phonemes,
            model_id: resolve_phoneme_model_id(),
            algorithm: ALGO_MULTI.to_string(),
        })
    }
}

fn align_phonemes_with_word_constraints(
    words: &[WordAlignment],
    words_with_phonemes: &[WordPhonemes],
) -> Vec<PhonemeAlignment> {
    let mut output = Vec::new();
    for (word_index, (word_alignment, word_phonemes)) in
        words.iter().zip(words_with_phonemes.iter()).enumerate()
    {
        let phones: Vec<&str> = if word_phonemes.phonemes.is_empty() {
            vec![word_phonemes.word.as_str()]
        } else {
            word_phonemes.phonemes.iter().map(String::as_str).collect()
        };
        let span = (word_alignment.end_sec - word_alignment.start_sec).max(0.0);
        let step = if span > 0.0 { span / phones.len() as f64 } else { 0.0 };
        let last_index = phones.len() - 1;

        for (phone_index, phone) in phones.iter().enumerate() {
            let start = round3(word_alignment.start_sec + step * phone_index as f64);
            let mut end = round3(word_alignment.start_sec + step * (phone_index + 1) as f64);
            if phone_index == last_index {
                end = word_alignment.end_sec;
            }
            output.push(PhonemeAlignment {
                phoneme: (*phone).to_string(),
                word_index,
                start_sec: start,
                end_sec: end,
                confidence: round3((word_alignment.confidence - 0.03).max(0.6)),
            });
        }
    }
    output
}

/// Decode phonemes directly over the whole utterance via a real/simulated
/// phoneme emission provider + Viterbi trellis pass, deriving per-phoneme
/// confidence from emission mass.
fn align_phonemes_globally(
    words_with_phonemes: &[WordPhonemes],
    input: &BackendInput,
) -> VoxAlignResult<Vec<PhonemeAlignment>> {
    let flat_phonemes: Vec<String> = words_with_phonemes
        .iter()
        .flat_map(|item| {
            if item.phonemes.is_empty() {
                vec![item.word.clone()]
            } else {
                item.phonemes.clone()
            }
        })
        .collect();
    if flat_phonemes.is_empty() {
        return Ok(Vec::new());
    }

    let word_index_by_phoneme: Vec<usize> = words_with_phonemes
        .iter()
        .enumerate()
        .flat_map(|(word_index, item)| {
            let count = item.phonemes.len().max(1);
            std::iter::repeat(word_index).take(count)
        })
        .collect();

    let pack = acquire_phoneme_pack(input, &flat_phonemes);
    let state_symbols = build_state_symbols(&pack.token_ids, pack.blank_id);
    let state_path = viterbi(&pack.emissions, &state_symbols)
        .map_err(|err| VoxAlignError::DecoderInvariant(err.to_string()))?;
    let spans = token_spans(&state_path, pack.token_ids.len());

    let frame_count = pack.emissions.len().max(1);
    let frame_sec = if input.duration_sec > 0.0 {
        input.duration_sec / frame_count as f64
    } else {
        0.0
    };
    let last_phoneme_index = flat_phonemes.len() - 1;

    let phonemes = flat_phonemes
        .iter()
        .enumerate()
        .map(|(index, phoneme)| {
            let (token_start, token_end) = pack.symbol_token_spans[index];
            let phoneme_spans = &spans[token_start..token_end];
            let phoneme_token_ids = &pack.token_ids[token_start..token_end];

            let valid: Vec<&TokenFrameSpan> =
                phoneme_spans.iter().filter(|span| span.end_frame > span.start_frame).collect();
            let (start_frame, end_frame) = match (valid.first(), valid.last()) {
                (Some(first), Some(last)) => (first.start_frame, last.end_frame),
                _ => (0, 0),
            };

            let mut start_sec = round3(start_frame as f64 * frame_sec);
            let mut end_sec = round3(end_frame as f64 * frame_sec);
            if index == last_phoneme_index {
                end_sec = input.duration_sec;
            }
            if start_sec > end_sec {
                start_sec = end_sec;
            }

            let confidence = round3(phoneme_confidence(
                &pack.emissions,
                phoneme_token_ids,
                phoneme_spans,
            ));

            PhonemeAlignment {
                phoneme: phoneme.clone(),
                word_index: word_index_by_phoneme[index],
                start_sec,
                end_sec,
                confidence,
            }
        })
        .collect();
    Ok(phonemes)
}

fn phoneme_confidence(emissions: &[Vec<f32>], token_ids: &[u32], spans: &[TokenFrameSpan]) -> f64 {
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
        return 0.6;
    }
    let mean = probabilities.iter().sum::<f64>() / probabilities.len() as f64;
    mean.clamp(0.6, 0.95)
}

fn acquire_phoneme_pack(input: &BackendInput, phonemes: &[String]) -> EmissionPack {
    if let Some(audio) = input.audio {
        if env_truthy("USE_HF_PHONEME", false) {
            let model_id = env::var("PHONEME_MODEL_ID")
                .unwrap_or_else(|_| DEFAULT_PHONEME_MODEL_ID.to_string());
            let device = env::var("DEVICE").unwrap_or_else(|_| DEFAULT_DEVICE.to_string());
            let provider = PhonemeRealProvider::with_model(model_id, device, shared_cache());
            if let Ok(pack) = provider.encode(phonemes, input.language_code, &audio) {
                return pack;
            }
        }
        return simulate_phonemes(phonemes, audio.duration_sec());
    }
    simulate_phonemes(phonemes, input.duration_sec)
}

fn simulate_phonemes(phonemes: &[String], duration_sec: f64) -> EmissionPack {
    const NOMINAL_RATE: u32 = 100;
    let sample_count = (duration_sec.max(0.0) * f64::from(NOMINAL_RATE)).round() as usize;
    let samples = vec![0.0_f32; sample_count];
    let audio = AudioBuffer {
        samples: &samples,
        sample_rate_hz: NOMINAL_RATE,
    };
    PhonemeSimulatorProvider
        .encode(phonemes, "und", &audio)
        .expect("simulator never fails")
}

fn group_words_from_phonemes(
    tokens: &[String],
    phonemes: &[PhonemeAlignment],
    duration_sec: f64,
) -> Vec<WordAlignment> {
    let mut by_word: Vec<Vec<&PhonemeAlignment>> = vec![Vec::new(); tokens.len()];
    for phone in phonemes {
        if let Some(bucket) = by_word.get_mut(phone.word_index) {
            bucket.push(phone);
        }
    }

    let last_index = tokens.len().saturating_sub(1);
    tokens
        .iter()
        .enumerate()
        .map(|(word_index, token)| {
            let bucket = &by_word[word_index];
            let (start, mut end, confidence) = if bucket.is_empty() {
                (0.0, 0.0, 0.6)
            } else {
                let start = bucket.first().unwrap().start_sec;
                let end = bucket.last().unwrap().end_sec;
                let confidence =
                    bucket.iter().map(|p| p.confidence).sum::<f64>() / bucket.len() as f64;
                (start, end, round3(confidence))
            };
            if word_index == last_index {
                end = duration_sec;
            }
            WordAlignment {
                word: token.clone(),
                start_sec: start,
                end_sec: end,
                confidence,
            }
        })
        .collect()
}

fn word_to_phonemes(word: &str, language: Option<&str>) -> WordPhonemes {
    let letters: Vec<char> = word.to_lowercase().chars().filter(|c| c.is_alphabetic()).collect();

    match language {
        Some(KOREAN_CODE) => {
            let phones = korean_word_to_ipa(word);
            let phones = if phones.is_empty() {
                letters.iter().map(|c| c.to_string()).collect()
            } else {
                phones
            };
            WordPhonemes {
                word: word.to_string(),
                phonemes: phones,
            }
        }
        Some(ENGLISH_CODE) => {
            let phones: Vec<String> = letters.iter().map(|c| en_letter_to_ipa(*c)).collect();
            let phones = if phones.is_empty() { vec![word.to_string()] } else { phones };
            WordPhonemes {
                word: word.to_string(),
                phonemes: phones,
            }
        }
        _ => {
            let phones: Vec<String> = if letters.is_empty() {
                vec![word.to_string()]
            } else {
                letters.iter().map(|c| c.to_string()).collect()
            };
            WordPhonemes {
                word: word.to_string(),
                phonemes: phones,
            }
        }
    }
}

fn en_letter_to_ipa(letter: char) -> String {
    let mapped = match letter {
        'a' => "ae",
        'b' => "b",
        'c' => "k",
        'd' => "d",
        'e' => "eh",
        'f' => "f",
        'g' => "g",
        'h' => "h",
        'i' => "ih",
        'j' => "jh",
        'k' => "k",
        'l' => "l",
        'm' => "m",
        'n' => "n",
        'o' => "ow",
        'p' => "p",
        'q' => "k",
        'r' => "r",
        's' => "s",
        't' => "t",
        'u' => "uw",
        'v' => "v",
        'w' => "w",
        'x' => "ks",
        'y' => "y",
        'z' => "z",
        _ => return letter.to_string(),
    };
    mapped.to_string()
}

/// Minimal deterministic fallback until a real Korean G2P mapping is
/// added: one placeholder phone per Hangul syllable codepoint.
fn korean_word_to_ipa(word: &str) -> Vec<String> {
    word.chars()
        .filter(|c| ('\u{AC00}'..='\u{D7A3}').contains(c))
        .map(|_| "ko".to_string())
        .collect()
}

fn resolve_phoneme_model_id() -> String {
    env::var("PHONEME_MODEL_ID").unwrap_or_else(|_| DEFAULT_PHONEME_MODEL_ID.to_string())
}

fn normalize_language_code(language_code: &str) -> Option<String> {
    let cleaned = language_code.trim().to_lowercase().replace('_', "-");
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.split('-').next().unwrap_or(&cleaned).to_string())
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
    fn english_path_constrains_phonemes_within_word_spans() {
        let tokens = vec!["hi".to_string()];
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 1.0,
            language_code: "en",
            audio: None,
        };
        let result = PhonemeFirstBackend::new().align_words(&input).unwrap();
        assert_eq!(result.words.len(), 1);
        assert!(!result.phonemes.is_empty());
        for phone in &result.phonemes {
            assert!(phone.start_sec >= result.words[0].start_sec - 1e-6);
            assert!(phone.end_sec <= result.words[0].end_sec + 1e-6);
        }
    }

    #[test]
    fn korean_path_groups_words_from_phonemes() {
        let tokens = vec!["안녕".to_string()];
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 1.0,
            language_code: "ko",
            audio: None,
        };
        let result = PhonemeFirstBackend::new().align_words(&input).unwrap();
        assert_eq!(result.words.len(), 1);
        assert_eq!(result.words[0].end_sec, 1.0);
        assert!(!result.phonemes.is_empty());
    }

    #[test]
    fn empty_tokens_short_circuit() {
        let input = BackendInput {
            tokens: &[],
            duration_sec: 1.0,
            language_code: "en",
            audio: None,
        };
        let result = PhonemeFirstBackend::new().align_words(&input).unwrap();
        assert!(result.words.is_empty());
        assert!(result.phonemes.is_empty());
    }
}

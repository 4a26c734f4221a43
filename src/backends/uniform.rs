//! Baseline backend: evenly distribute token spans over the total
//! duration. No audio or language model involved; always succeeds.

use crate::backends::{AlignmentBackend, BackendInput, BackendResult};
use crate::error::VoxAlignResult;
use crate::models::{round3, WordAlignment};

const MODEL_ID: &str = "baseline-rule-v1";
const ALGORITHM: &str = "uniform-token-distribution";

pub struct UniformBackend;

impl AlignmentBackend for UniformBackend {
    fn align_words(&self, input: &BackendInput) -> VoxAlignResult<BackendResult> {
        if input.tokens.is_empty() {
            return Ok(BackendResult::words_only(Vec::new(), MODEL_ID, ALGORITHM));
        }

        let step = input.duration_sec / input.tokens.len() as f64;
        let last_index = input.tokens.len() - 1;
        let words = input
            .tokens
            .iter()
            .enumerate()
            .map(|(index, word)| {
                let start = round3(step * index as f64);
                let mut end = round3(step * (index + 1) as f64);
                if index == last_index {
                    end = input.duration_sec;
                }
                let confidence = round3((0.98 - index as f64 * 0.01).max(0.75));
                WordAlignment {
                    word: word.clone(),
                    start_sec: start,
                    end_sec: end,
                    confidence,
                }
            })
            .collect();

        Ok(BackendResult::words_only(words, MODEL_ID, ALGORITHM))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distributes_tokens_evenly_and_pins_last_end() {
        let tokens = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 3.0,
            language_code: "en",
            audio: None,
        };
        let result = UniformBackend.align_words(&input).unwrap();
        assert_eq!(result.words.len(), 3);
        assert_eq!(result.words[0].start_sec, 0.0);
        assert_eq!(result.words.last().unwrap().end_sec, 3.0);
        assert_eq!(result.model_id, MODEL_ID);
    }

    #[test]
    fn confidence_decays_and_floors_at_075() {
        let tokens: Vec<String> = (0..40).map(|i| format!("w{i}")).collect();
        let input = BackendInput {
            tokens: &tokens,
            duration_sec: 40.0,
            language_code: "en",
            audio: None,
        };
        let result = UniformBackend.align_words(&input).unwrap();
        assert_eq!(result.words.last().unwrap().confidence, 0.75);
    }

    #[test]
    fn empty_tokens_yield_empty_words() {
        let input = BackendInput {
            tokens: &[],
            duration_sec: 1.0,
            language_code: "en",
            audio: None,
        };
        let result = UniformBackend.align_words(&input).unwrap();
        assert!(result.words.is_empty());
    }
}

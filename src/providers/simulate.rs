//! Deterministic emission simulator shared by the word and phoneme
//! simulator providers (spec §4.2).

use std::sync::Arc;

use crate::providers::EmissionPack;
use crate::trellis::build_state_symbols;

const FRAME_HZ: f64 = 100.0;
const PEAK_LOGIT: f32 = 2.0;
const BLANK_LOGIT: f32 = 0.3;
const BASELINE_LOGIT: f32 = -2.0;
const BLANK_ID: u32 = 0;

/// Build a deterministic simulated emission pack for `symbol_count` input
/// symbols (words or phonemes), each encoding to exactly one sub-token.
pub fn simulate_emission_pack(
    symbol_count: usize,
    duration_sec: f64,
    model_id: &str,
    algorithm_tag: &str,
) -> EmissionPack {
    let token_ids: Vec<u32> = (1..=symbol_count as u32).collect();
    let symbol_token_spans: Vec<(usize, usize)> = (0..symbol_count).map(|i| (i, i + 1)).collect();

    let mut frame_count = ((duration_sec * FRAME_HZ).round() as i64).max(1) as usize;
    frame_count = frame_count.max(symbol_count * 3);

    let state_symbols = build_state_symbols(&token_ids, BLANK_ID);
    let vocab_size = token_ids.iter().copied().max().unwrap_or(0) as usize + 1;
    let emissions = simulate_emissions(frame_count, vocab_size, &state_symbols, BLANK_ID);

    EmissionPack {
        emissions: Arc::new(emissions),
        token_ids,
        symbol_token_spans,
        blank_id: BLANK_ID,
        model_id: model_id.to_string(),
        algorithm_tag: algorithm_tag.to_string(),
    }
}

fn simulate_emissions(
    frame_count: usize,
    vocab_size: usize,
    state_symbols: &[u32],
    blank_id: u32,
) -> Vec<Vec<f32>> {
    let state_count = state_symbols.len();
    let mut emissions = Vec::with_capacity(frame_count);

    for frame in 0..frame_count {
        let target_state = if frame_count == 1 {
            state_count - 1
        } else {
            ((frame as f64 / (frame_count - 1) as f64) * (state_count - 1) as f64).round() as usize
        };
        let target_symbol = state_symbols[target_state];

        let mut logits = vec![BASELINE_LOGIT; vocab_size];
        logits[blank_id as usize] = -0.2;

        if target_symbol == blank_id {
            logits[blank_id as usize] = 1.4;
        } else {
            logits[target_symbol as usize] = PEAK_LOGIT;
            logits[blank_id as usize] = BLANK_LOGIT;
        }

        emissions.push(log_softmax(&logits));
    }
    emissions
}

fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max_logit = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exp_sum: f32 = logits.iter().map(|&v| (v - max_logit).exp()).sum();
    let log_denom = max_logit + exp_sum.ln();
    logits.iter().map(|&v| v - log_denom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_log_normalized() {
        let pack = simulate_emission_pack(3, 1.2, "sim", "sim-algo");
        for row in pack.emissions.iter() {
            let sum: f32 = row.iter().map(|&v| v.exp()).sum();
            assert!((sum - 1.0).abs() < 1e-3);
        }
    }

    #[test]
    fn frame_count_respects_slack_floor() {
        let pack = simulate_emission_pack(5, 0.01, "sim", "sim-algo");
        assert!(pack.emissions.len() >= 5 * 3);
    }

    #[test]
    fn zero_symbols_has_single_blank_state() {
        let pack = simulate_emission_pack(0, 1.0, "sim", "sim-algo");
        assert_eq!(pack.token_ids.len(), 0);
        assert!(!pack.emissions.is_empty());
    }
}

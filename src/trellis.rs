//! CTC trellis primitives: expanded-state construction, Viterbi decoding,
//! and token-to-frame span extraction.
//!
//! This is a simplified CTC alignment variant that forbids jumping across a
//! blank between adjacent non-blank tokens: valid transitions from state `i`
//! are "stay at `i`" or "advance to `i+1`" only. Ties between stay and
//! advance prefer stay.

use thiserror::Error;

/// Errors raised by the trellis decoder itself (not provider/backend errors).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrellisError {
    #[error("expanded state sequence must not be empty")]
    EmptyState,
    #[error("decoder found no reachable path: all scores were -inf at the last frame")]
    Unreachable,
}

/// Build the expanded CTC state sequence `[blank, t0, blank, t1, ..., blank]`.
///
/// Length is `2N + 1` for `N` input tokens. Pure function.
pub fn build_state_symbols(tokens: &[u32], blank_id: u32) -> Vec<u32> {
    let mut states = Vec::with_capacity(tokens.len() * 2 + 1);
    states.push(blank_id);
    for &token in tokens {
        states.push(token);
        states.push(blank_id);
    }
    states
}

/// Run Viterbi decoding over the expanded CTC state lattice.
///
/// `emissions[t][v]` are log-probabilities for frame `t`, vocabulary id `v`.
/// Returns the best state index per frame.
pub fn viterbi(emissions: &[Vec<f32>], state_symbols: &[u32]) -> Result<Vec<usize>, TrellisError> {
    let frame_count = emissions.len();
    let state_count = state_symbols.len();

    if frame_count == 0 {
        return Ok(Vec::new());
    }
    if state_count == 0 {
        return Err(TrellisError::EmptyState);
    }

    const NEG_INF: f32 = f32::NEG_INFINITY;
    let mut scores = vec![NEG_INF; frame_count * state_count];
    let mut backptr = vec![0usize; frame_count * state_count];

    let at = |t: usize, j: usize| t * state_count + j;

    scores[at(0, 0)] = emissions[0][state_symbols[0] as usize];
    if state_count > 1 {
        scores[at(0, 1)] = emissions[0][state_symbols[1] as usize];
        backptr[at(0, 1)] = 0;
    }

    for t in 1..frame_count {
        for j in 0..state_count {
            let stay = scores[at(t - 1, j)];
            let advance = if j > 0 { scores[at(t - 1, j - 1)] } else { NEG_INF };

            let (best_prev, best_score) = if advance > stay {
                (j - 1, advance)
            } else {
                (j, stay)
            };

            if best_score == NEG_INF {
                continue;
            }

            let symbol = state_symbols[j] as usize;
            scores[at(t, j)] = best_score + emissions[t][symbol];
            backptr[at(t, j)] = best_prev;
        }
    }

    let last = frame_count - 1;
    let mut end_candidates = vec![state_count - 1];
    if state_count > 1 {
        end_candidates.push(state_count - 2);
    }

    let best_end = end_candidates
        .into_iter()
        .max_by(|&a, &b| scores[at(last, a)].total_cmp(&scores[at(last, b)]))
        .unwrap();

    if scores[at(last, best_end)] == NEG_INF {
        return Err(TrellisError::Unreachable);
    }

    let mut path = vec![0usize; frame_count];
    let mut cursor = best_end;
    for t in (0..frame_count).rev() {
        path[t] = cursor;
        if t > 0 {
            cursor = backptr[at(t, cursor)];
        }
    }

    Ok(path)
}

/// Half-open frame interval `[start, end)` for one token position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenFrameSpan {
    pub token_index: usize,
    pub start_frame: usize,
    pub end_frame: usize,
}

/// Extract per-token frame spans from a decoded state path.
///
/// For each token position `k` in `0..token_count`, collects all frames
/// whose state index equals `2k + 1`. Tokens the path never visits get the
/// degenerate span `(0, 0)`.
pub fn token_spans(state_path: &[usize], token_count: usize) -> Vec<TokenFrameSpan> {
    let mut spans = Vec::with_capacity(token_count);
    for k in 0..token_count {
        let token_state = 2 * k + 1;
        let mut start_frame = None;
        let mut end_frame = 0usize;
        for (frame, &state) in state_path.iter().enumerate() {
            if state == token_state {
                if start_frame.is_none() {
                    start_frame = Some(frame);
                }
                end_frame = frame + 1;
            }
        }
        let (start_frame, end_frame) = match start_frame {
            Some(s) => (s, end_frame),
            None => (0, 0),
        };
        spans.push(TokenFrameSpan {
            token_index: k,
            start_frame,
            end_frame,
        });
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_expansion_law() {
        assert_eq!(build_state_symbols(&[], 0), vec![0]);
        assert_eq!(build_state_symbols(&[11, 22], 0), vec![0, 11, 0, 22, 0]);
    }

    #[test]
    fn state_expansion_alternates_blank_and_token() {
        let states = build_state_symbols(&[5, 6, 7], 0);
        assert_eq!(states.len(), 7);
        for (i, &s) in states.iter().enumerate() {
            if i % 2 == 0 {
                assert_eq!(s, 0, "even index {i} should be blank");
            } else {
                assert_ne!(s, 0, "odd index {i} should be a token");
            }
        }
    }

    fn sample_emissions() -> Vec<Vec<f32>> {
        vec![
            vec![-0.1, -2.0, -2.0],
            vec![-1.5, -0.2, -2.0],
            vec![-0.5, -0.3, -1.2],
            vec![-1.8, -1.0, -0.2],
            vec![-0.2, -2.0, -1.0],
        ]
    }

    #[test]
    fn viterbi_basic_path_shape() {
        let emissions = sample_emissions();
        let states = build_state_symbols(&[1, 2], 0);
        let path = viterbi(&emissions, &states).unwrap();

        assert_eq!(path.len(), emissions.len());
        assert!(path.iter().all(|&s| s < states.len()));
        assert!(path[0] == 0 || path[0] == 1);
    }

    #[test]
    fn token_spans_from_hand_built_path() {
        // scenario 6 from spec.md: path visits states [0/1, 1, 1, 3, 3/4]
        let path = vec![0, 1, 1, 3, 3];
        let spans = token_spans(&path, 2);
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start_frame, spans[0].end_frame), (1, 3));
        assert_eq!((spans[1].start_frame, spans[1].end_frame), (3, 5));
    }

    #[test]
    fn token_spans_degenerate_when_unvisited() {
        let path = vec![0, 0, 0];
        let spans = token_spans(&path, 1);
        assert_eq!(spans[0].start_frame, 0);
        assert_eq!(spans[0].end_frame, 0);
    }

    #[test]
    fn empty_frames_yield_empty_path() {
        let emissions: Vec<Vec<f32>> = vec![];
        let states = build_state_symbols(&[1], 0);
        let path = viterbi(&emissions, &states).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn empty_state_sequence_is_invalid() {
        let emissions = vec![vec![0.0f32]];
        let err = viterbi(&emissions, &[]).unwrap_err();
        assert_eq!(err, TrellisError::EmptyState);
    }

    #[test]
    fn viterbi_matches_dp_argmax() {
        // Property: accumulated log-prob of the returned path equals the
        // DP table's argmax value at the last frame among end states.
        let emissions = sample_emissions();
        let states = build_state_symbols(&[1, 2], 0);
        let path = viterbi(&emissions, &states).unwrap();

        let mut total = 0.0f32;
        total += emissions[0][states[path[0]] as usize];
        for t in 1..path.len() {
            // path must only stay or advance by one
            assert!(path[t] == path[t - 1] || path[t] == path[t - 1] + 1);
            total += emissions[t][states[path[t]] as usize];
        }

        // Re-run a brute DP restricted to valid transitions to get the max.
        let best = brute_force_best_score(&emissions, &states);
        assert!((total - best).abs() < 1e-4);
    }

    fn brute_force_best_score(emissions: &[Vec<f32>], states: &[u32]) -> f32 {
        let t = emissions.len();
        let n = states.len();
        let mut scores = vec![vec![f32::NEG_INFINITY; n]; t];
        scores[0][0] = emissions[0][states[0] as usize];
        if n > 1 {
            scores[0][1] = emissions[0][states[1] as usize];
        }
        for frame in 1..t {
            for j in 0..n {
                let stay = scores[frame - 1][j];
                let advance = if j > 0 { scores[frame - 1][j - 1] } else { f32::NEG_INFINITY };
                let best = stay.max(advance);
                if best == f32::NEG_INFINITY {
                    continue;
                }
                scores[frame][j] = best + emissions[frame][states[j] as usize];
            }
        }
        let last = t - 1;
        let mut candidates = vec![n - 1];
        if n > 1 {
            candidates.push(n - 2);
        }
        candidates
            .into_iter()
            .map(|j| scores[last][j])
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

//! Duration/timing-source resolution shared by the alignment pipeline.
//!
//! Grounded in `_estimate_duration_sec` from the (superseded) original
//! baseline pipeline: when no audio duration is available, duration is
//! estimated from token count at a fixed per-token rate, floored at one
//! second. Kept as a named constant rather than inlined, per spec Open
//! Question (c) — not tuned further.
use crate::models::{round3, TimingSource};

pub const DEFAULT_HEURISTIC_SECONDS_PER_TOKEN: f64 = 0.32;

/// Resolve alignment duration: audio-derived when available, otherwise a
/// token-count heuristic.
pub fn resolve_duration(audio_duration_sec: Option<f64>, token_count: usize) -> (f64, TimingSource) {
    match audio_duration_sec {
        Some(duration) if duration > 0.0 => (round3(duration), TimingSource::Audio),
        _ => (estimate_duration_heuristic(token_count), TimingSource::Heuristic),
    }
}

pub fn estimate_duration_heuristic(token_count: usize) -> f64 {
    round3((token_count as f64 * DEFAULT_HEURISTIC_SECONDS_PER_TOKEN).max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heuristic_floors_at_one_second() {
        assert_eq!(estimate_duration_heuristic(1), 1.0);
        assert_eq!(estimate_duration_heuristic(0), 1.0);
    }

    #[test]
    fn heuristic_scales_with_token_count() {
        assert_eq!(estimate_duration_heuristic(10), 3.2);
    }

    #[test]
    fn prefers_audio_duration_when_present() {
        let (duration, source) = resolve_duration(Some(4.5), 3);
        assert_eq!(duration, 4.5);
        assert_eq!(source, TimingSource::Audio);
    }

    #[test]
    fn falls_back_to_heuristic_when_audio_missing() {
        let (duration, source) = resolve_duration(None, 5);
        assert_eq!(duration, 1.6);
        assert_eq!(source, TimingSource::Heuristic);
    }
}

//! Linear resampling, ported from `resample_linear` in the original
//! `io/audio.py`: interpolate over a `[0, duration_sec)` time axis rather
//! than a naive index ratio, so the resampled signal spans the same
//! wall-clock duration as the source.

#[derive(Debug, Clone, thiserror::Error)]
pub enum ResampleError {
    #[error("sample rates must be positive")]
    NonPositiveRate,
}

pub fn resample_linear(audio: &[f32], src_hz: u32, dst_hz: u32) -> Result<Vec<f32>, ResampleError> {
    if src_hz == 0 || dst_hz == 0 {
        return Err(ResampleError::NonPositiveRate);
    }
    if src_hz == dst_hz {
        return Ok(audio.to_vec());
    }
    if audio.is_empty() {
        return Ok(Vec::new());
    }

    let src_len = audio.len();
    let duration_sec = src_len as f64 / f64::from(src_hz);
    let dst_len = ((duration_sec * f64::from(dst_hz)).round() as usize).max(1);

    let mut output = Vec::with_capacity(dst_len);
    for i in 0..dst_len {
        let t = duration_sec * i as f64 / dst_len as f64;
        output.push(interpolate_at(audio, src_len, duration_sec, t));
    }
    Ok(output)
}

fn interpolate_at(audio: &[f32], src_len: usize, duration_sec: f64, t: f64) -> f32 {
    if src_len == 1 {
        return audio[0];
    }
    let src_step = duration_sec / src_len as f64;
    let position = t / src_step;
    let lower = position.floor() as isize;
    let frac = (position - lower as f64) as f32;

    let lower_index = lower.clamp(0, src_len as isize - 1) as usize;
    let upper_index = (lower + 1).clamp(0, src_len as isize - 1) as usize;
    audio[lower_index] + (audio[upper_index] - audio[lower_index]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let audio = vec![0.1, 0.2, 0.3];
        let result = resample_linear(&audio, 16_000, 16_000).unwrap();
        assert_eq!(result, audio);
    }

    #[test]
    fn upsamples_to_expected_length() {
        let audio = vec![0.0, 1.0, 0.0, -1.0];
        let result = resample_linear(&audio, 8_000, 16_000).unwrap();
        assert_eq!(result.len(), 8);
    }

    #[test]
    fn downsamples_to_expected_length() {
        let audio = vec![0.0; 1600];
        let result = resample_linear(&audio, 16_000, 8_000).unwrap();
        assert_eq!(result.len(), 800);
    }

    #[test]
    fn zero_rate_is_rejected() {
        let result = resample_linear(&[0.0], 0, 16_000);
        assert!(result.is_err());
    }
}

//! Alignment output serialization. Grounded in `to_json`/`write_json`
//! from the original `io/export.py` (`model_dump_json(indent=2)`).

use std::fs;
use std::path::Path;

use crate::models::AlignResponse;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize alignment response: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write output file: {0}")]
    Io(#[from] std::io::Error),
}

pub fn to_json(response: &AlignResponse) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(response)?)
}

pub fn write_json(response: &AlignResponse, output_path: &Path) -> Result<(), ExportError> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut body = to_json(response)?;
    body.push('\n');
    fs::write(output_path, body)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlignBackend, AlignmentMetadata, TimingSource, TranscriptSource};
    use chrono::{TimeZone, Utc};

    fn sample_response() -> AlignResponse {
        AlignResponse {
            metadata: AlignmentMetadata {
                language: "en".to_string(),
                alignment_backend: AlignBackend::Uniform,
                normalizer_id: "english-basic-v1".to_string(),
                token_count: 0,
                timing_source: TimingSource::Heuristic,
                transcript_source: TranscriptSource::Provided,
                asr_backend: None,
                asr_model_id: None,
                license_warning: None,
                model_id: "baseline-rule-v1".to_string(),
                algorithm: "uniform-token-distribution".to_string(),
                generated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                duration_sec: 0.0,
                sample_rate_hz: None,
            },
            words: Vec::new(),
            phonemes: Vec::new(),
        }
    }

    #[test]
    fn serializes_with_pretty_indentation() {
        let json = to_json(&sample_response()).unwrap();
        assert!(json.contains("\"language\": \"en\""));
        assert!(json.contains('\n'));
    }
}

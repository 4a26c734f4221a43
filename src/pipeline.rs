//! Top-level alignment pipeline: resolves language/transcript/audio
//! inputs, dispatches to the selected backend, and assembles the
//! response contract (§6.2). Shared by the CLI and the HTTP server so
//! both surfaces exercise identical semantics.

use std::path::Path;

use chrono::Utc;
use tracing::warn;

use crate::asr;
use crate::backends::{resolve_backend, BackendInput};
use crate::error::{VoxAlignError, VoxAlignResult};
use crate::io::wav::{read_audio_metadata, read_wav_audio};
use crate::languages::{canonical_language_code, is_known_language_code, resolve_language_pack};
use crate::models::{AlignRequest, AlignResponse, AlignmentMetadata, TranscriptSource};
use crate::providers::AudioBuffer;
use crate::timing::resolve_duration;

const CRISPER_WHISPER_LICENSE_NOTE: &str =
    "nyrahealth/CrisperWhisper is distributed under a non-commercial CC BY-NC 4.0 research license";

pub fn run_alignment(request: &AlignRequest) -> VoxAlignResult<AlignResponse> {
    let audio_path = Path::new(&request.audio_path);
    let decoded_audio = load_audio(audio_path);
    if let Err(ref err) = decoded_audio {
        warn!(audio_path = %request.audio_path, error = %err, "audio unreadable, degrading to heuristic timing");
    }
    let decoded_audio = decoded_audio.ok();

    let (transcript, transcript_source, asr_backend, asr_model_id, license_warning, detected_language) =
        resolve_transcript(request, decoded_audio.as_ref())?;

    let requested_language = canonical_language_code(Some(&request.language)).unwrap_or_else(|| "und".to_string());
    // §4.6: when the request asked for "auto" and the ASR collaborator
    // returned a language it recognizes, re-resolve onto that pack instead
    // of staying on "und".
    let language_code = if requested_language == "auto" {
        detected_language
            .filter(|code| is_known_language_code(code))
            .unwrap_or(requested_language)
    } else {
        requested_language
    };
    let pack = resolve_language_pack(&language_code);
    let normalized = pack.normalize(&transcript);

    let audio_duration_sec = decoded_audio.as_ref().map(|(_, _, duration)| *duration);
    let (duration_sec, timing_source) = resolve_duration(audio_duration_sec, normalized.tokens.len());

    let audio_buffer = decoded_audio
        .as_ref()
        .map(|(samples, sample_rate, _)| AudioBuffer {
            samples,
            sample_rate_hz: *sample_rate,
        });

    let backend_input = BackendInput {
        tokens: &normalized.tokens,
        duration_sec,
        language_code: pack.code(),
        audio: audio_buffer,
    };
    let backend = resolve_backend(request.backend);
    let mut result = backend.align_words(&backend_input)?;
    if !request.include_phonemes {
        result.phonemes.clear();
    }

    let sample_rate_hz = decoded_audio
        .as_ref()
        .map(|(_, sample_rate, _)| *sample_rate)
        .or(request.sample_rate_hz);

    let metadata = AlignmentMetadata {
        language: pack.code().to_string(),
        alignment_backend: request.backend,
        normalizer_id: pack.normalizer_id().to_string(),
        token_count: normalized.tokens.len(),
        timing_source,
        transcript_source,
        asr_backend,
        asr_model_id,
        license_warning,
        model_id: result.model_id,
        algorithm: result.algorithm,
        generated_at: Utc::now(),
        duration_sec,
        sample_rate_hz,
    };

    Ok(AlignResponse {
        metadata,
        words: result.words,
        phonemes: result.phonemes,
    })
}

type TranscriptResolution = (
    String,
    TranscriptSource,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
);

fn resolve_transcript(
    request: &AlignRequest,
    decoded_audio: Option<&(Vec<f32>, u32, f64)>,
) -> VoxAlignResult<TranscriptResolution> {
    if let Some(transcript) = &request.transcript {
        if !transcript.trim().is_empty() {
            return Ok((transcript.clone(), TranscriptSource::Provided, None, None, None, None));
        }
    }

    let audio_buffer = decoded_audio.map(|(samples, sample_rate, _)| AudioBuffer {
        samples,
        sample_rate_hz: *sample_rate,
    });

    let asr_result = asr::transcribe_audio(
        request.asr,
        Some(&request.language),
        request.verbatim,
        audio_buffer.as_ref(),
    )
    .map_err(|_| {
        VoxAlignError::InvalidRequest(
            "transcript must be provided when ASR is disabled".to_string(),
        )
    })?;

    let license_warning = if asr_result.backend == "crisper_whisper" {
        Some(CRISPER_WHISPER_LICENSE_NOTE.to_string())
    } else {
        None
    };

    Ok((
        asr_result.transcript,
        TranscriptSource::Asr,
        Some(asr_result.backend),
        Some(asr_result.model_id),
        license_warning,
        Some(asr_result.language_code),
    ))
}

/// Read WAV audio plus its duration. Any failure (unsupported container,
/// malformed file, io error) is reported as `AudioUnreadable`; callers
/// treat this as a signal to degrade rather than a hard failure.
fn load_audio(path: &Path) -> VoxAlignResult<(Vec<f32>, u32, f64)> {
    let metadata = read_audio_metadata(path).map_err(|err| VoxAlignError::AudioUnreadable(err.to_string()))?;
    let (samples, sample_rate_hz) =
        read_wav_audio(path).map_err(|err| VoxAlignError::AudioUnreadable(err.to_string()))?;
    Ok((samples, sample_rate_hz, metadata.duration_sec))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AlignBackend, AsrBackend};

    fn request(transcript: &str, backend: AlignBackend) -> AlignRequest {
        AlignRequest {
            audio_path: "missing-file.wav".to_string(),
            transcript: Some(transcript.to_string()),
            language: "auto".to_string(),
            backend,
            asr: AsrBackend::Disabled,
            verbatim: false,
            include_phonemes: true,
            sample_rate_hz: None,
        }
    }

    #[test]
    fn degrades_to_heuristic_timing_when_audio_missing() {
        let response = run_alignment(&request("hello world", AlignBackend::Uniform)).unwrap();
        assert_eq!(response.metadata.timing_source, crate::models::TimingSource::Heuristic);
        assert_eq!(response.words.len(), 2);
    }

    #[test]
    fn strips_phonemes_when_not_requested() {
        let mut req = request("hello world", AlignBackend::PhonemeFirst);
        req.include_phonemes = false;
        let response = run_alignment(&req).unwrap();
        assert!(response.phonemes.is_empty());
    }

    #[test]
    fn missing_transcript_without_asr_is_rejected() {
        let mut req = request("hello", AlignBackend::Uniform);
        req.transcript = None;
        let result = run_alignment(&req);
        assert!(result.is_err());
    }
}

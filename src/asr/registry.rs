//! ASR backend routing: resolves `auto` to a concrete backend, runs the
//! real transcription path when enabled, and falls back to deterministic
//! simulated transcripts otherwise. Grounded directly in
//! `_resolve_backend_choice` / `_simulated_asr_result` from the original
//! ASR registry.

use std::env;
use std::sync::Arc;

use crate::asr::base::{AsrError, AsrResult, AsrSource, ResolvedAsrBackend};
use crate::asr::real;
use crate::languages::canonical_language_code;
use crate::models::AsrBackend;
use crate::providers::cache::shared as shared_cache;
use crate::providers::AudioBuffer;

const DEFAULT_PARAKEET_MODEL_ID: &str = "nvidia/parakeet-ctc-1.1b";
const DEFAULT_PARAKEET_TDT_MODEL_ID: &str = "nvidia/parakeet-tdt-0.6b-v3";
const DEFAULT_CRISPER_MODEL_ID: &str = "nyrahealth/CrisperWhisper";
const DEFAULT_WHISPER_MODEL_ID: &str = "openai/whisper-large-v3";
const SIM_MODEL_ID: &str = "simulated-asr-v1";
const DEFAULT_DEVICE: &str = "auto";

const PARAKEET_TDT_EU_CODES: &[&str] = &[
    "bg", "ca", "cs", "cy", "da", "de", "el", "es", "et", "eu", "fi", "fr", "ga", "gl", "hr", "hu",
    "is", "it", "lt", "lv", "mk", "mt", "nl", "no", "pl", "pt", "ro", "sq", "sr", "sk", "sl", "sv",
];

pub fn transcribe_audio(
    requested_backend: AsrBackend,
    language_code: Option<&str>,
    verbatim: bool,
    audio: Option<&AudioBuffer>,
) -> Result<AsrResult, AsrError> {
    let selected = resolve_backend_choice(requested_backend, language_code, verbatim)
        .ok_or(AsrError::Disabled)?;

    let model_id = default_model_id(selected);
    let simulated = simulated_asr_result(selected, language_code);

    if !env_truthy("VOXALIGN_ASR_USE_HF", false) {
        return Ok(simulated);
    }
    let Some(audio) = audio else {
        return Ok(simulated);
    };

    let device = env::var("VOXALIGN_ASR_DEVICE").unwrap_or_else(|_| DEFAULT_DEVICE.to_string());
    match real::transcribe(&model_id, &device, audio, &shared_cache()) {
        Ok(transcript) if !transcript.is_empty() => Ok(AsrResult {
            transcript,
            language_code: canonical_language_code(language_code).unwrap_or_else(|| "und".to_string()),
            backend: selected.name().to_string(),
            model_id,
            source: AsrSource::Real,
        }),
        _ => Ok(simulated),
    }
}

fn resolve_backend_choice(
    requested_backend: AsrBackend,
    language_code: Option<&str>,
    verbatim: bool,
) -> Option<ResolvedAsrBackend> {
    match requested_backend {
        AsrBackend::Disabled => None,
        AsrBackend::Parakeet => Some(ResolvedAsrBackend::Parakeet),
        AsrBackend::ParakeetTdt => Some(ResolvedAsrBackend::ParakeetTdt),
        AsrBackend::CrisperWhisper => Some(ResolvedAsrBackend::CrisperWhisper),
        AsrBackend::WhisperLargeV3 => Some(ResolvedAsrBackend::WhisperLargeV3),
        AsrBackend::Auto => {
            let code = canonical_language_code(language_code);
            match code.as_deref() {
                Some("en") => Some(if verbatim {
                    ResolvedAsrBackend::CrisperWhisper
                } else {
                    ResolvedAsrBackend::Parakeet
                }),
                Some(other) if PARAKEET_TDT_EU_CODES.contains(&other) => {
                    Some(ResolvedAsrBackend::ParakeetTdt)
                }
                _ => Some(ResolvedAsrBackend::WhisperLargeV3),
            }
        }
    }
}

fn default_model_id(backend: ResolvedAsrBackend) -> String {
    match backend {
        ResolvedAsrBackend::Parakeet => {
            env::var("VOXALIGN_ASR_PARAKEET_MODEL_ID").unwrap_or_else(|_| DEFAULT_PARAKEET_MODEL_ID.to_string())
        }
        ResolvedAsrBackend::ParakeetTdt => env::var("VOXALIGN_ASR_PARAKEET_TDT_MODEL_ID")
            .unwrap_or_else(|_| DEFAULT_PARAKEET_TDT_MODEL_ID.to_string()),
        ResolvedAsrBackend::CrisperWhisper => {
            env::var("VOXALIGN_ASR_CRISPER_MODEL_ID").unwrap_or_else(|_| DEFAULT_CRISPER_MODEL_ID.to_string())
        }
        ResolvedAsrBackend::WhisperLargeV3 => {
            env::var("VOXALIGN_ASR_WHISPER_MODEL_ID").unwrap_or_else(|_| DEFAULT_WHISPER_MODEL_ID.to_string())
        }
    }
}

fn simulated_asr_result(backend: ResolvedAsrBackend, language_code: Option<&str>) -> AsrResult {
    let code = canonical_language_code(language_code).unwrap_or_else(|| "und".to_string());
    let transcript = match backend {
        ResolvedAsrBackend::CrisperWhisper => {
            env::var("VOXALIGN_ASR_SIM_CRISPER").unwrap_or_else(|_| "uh hello uh world".to_string())
        }
        ResolvedAsrBackend::ParakeetTdt => match code.as_str() {
            "fr" => env::var("VOXALIGN_ASR_SIM_PARAKEET_TDT_FR").unwrap_or_else(|_| "bonjour le monde".to_string()),
            "de" => env::var("VOXALIGN_ASR_SIM_PARAKEET_TDT_DE").unwrap_or_else(|_| "hallo welt".to_string()),
            "es" => env::var("VOXALIGN_ASR_SIM_PARAKEET_TDT_ES").unwrap_or_else(|_| "hola mundo".to_string()),
            _ => env::var("VOXALIGN_ASR_SIM_PARAKEET_TDT").unwrap_or_else(|_| "hello world".to_string()),
        },
        ResolvedAsrBackend::WhisperLargeV3 => match code.as_str() {
            "ko" => env::var("VOXALIGN_ASR_SIM_WHISPER_KO").unwrap_or_else(|_| "안녕하세요 반갑습니다".to_string()),
            _ => env::var("VOXALIGN_ASR_SIM_WHISPER").unwrap_or_else(|_| "hello world".to_string()),
        },
        ResolvedAsrBackend::Parakeet => {
            env::var("VOXALIGN_ASR_SIM_PARAKEET").unwrap_or_else(|_| "hello world".to_string())
        }
    };

    AsrResult {
        transcript: normalize_transcript(&transcript),
        language_code: code,
        backend: backend.name().to_string(),
        model_id: SIM_MODEL_ID.to_string(),
        source: AsrSource::Simulated,
    }
}

fn normalize_transcript(text: &str) -> String {
    text.trim().split_whitespace().collect::<Vec<_>>().join(" ")
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
    fn auto_selects_crisper_for_verbatim_english() {
        let chosen = resolve_backend_choice(AsrBackend::Auto, Some("en-US"), true);
        assert_eq!(chosen, Some(ResolvedAsrBackend::CrisperWhisper));
    }

    #[test]
    fn auto_selects_parakeet_for_non_verbatim_english() {
        let chosen = resolve_backend_choice(AsrBackend::Auto, Some("en"), false);
        assert_eq!(chosen, Some(ResolvedAsrBackend::Parakeet));
    }

    #[test]
    fn auto_selects_parakeet_tdt_for_european_code() {
        let chosen = resolve_backend_choice(AsrBackend::Auto, Some("de"), false);
        assert_eq!(chosen, Some(ResolvedAsrBackend::ParakeetTdt));
    }

    #[test]
    fn auto_falls_back_to_whisper_for_other_codes() {
        let chosen = resolve_backend_choice(AsrBackend::Auto, Some("ko"), false);
        assert_eq!(chosen, Some(ResolvedAsrBackend::WhisperLargeV3));
    }

    #[test]
    fn disabled_backend_yields_none() {
        assert_eq!(resolve_backend_choice(AsrBackend::Disabled, Some("en"), false), None);
    }

    #[test]
    fn simulated_whisper_korean_uses_korean_sample() {
        let result = simulated_asr_result(ResolvedAsrBackend::WhisperLargeV3, Some("ko"));
        assert_eq!(result.transcript, "안녕하세요 반갑습니다");
        assert_eq!(result.source, AsrSource::Simulated);
    }
}

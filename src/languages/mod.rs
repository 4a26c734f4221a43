pub mod base;
pub mod english;
pub mod generic;
pub mod registry;

pub use base::{LanguagePack, NormalizedTranscript};
pub use registry::{is_known_language_code, resolve_language_pack};

/// Canonicalize a BCP-47-ish code for routing purposes: lowercase, region
/// suffix stripped (`en-US` -> `en`). Returns `None` for an empty input.
pub fn canonical_language_code(language_code: Option<&str>) -> Option<String> {
    let cleaned = language_code?.trim().to_lowercase().replace('_', "-");
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned.split('-').next().unwrap_or(&cleaned).to_string())
}

#[cfg(test)]
mod canonical_tests {
    use super::canonical_language_code;

    #[test]
    fn strips_region_suffix() {
        assert_eq!(canonical_language_code(Some("en-US")), Some("en".to_string()));
        assert_eq!(canonical_language_code(Some("KO_kr")), Some("ko".to_string()));
    }

    #[test]
    fn handles_missing_code() {
        assert_eq!(canonical_language_code(None), None);
        assert_eq!(canonical_language_code(Some("  ")), None);
    }
}

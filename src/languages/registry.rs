//! Language pack registry and code resolution.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::languages::base::LanguagePack;
use crate::languages::english::EnglishLanguagePack;
use crate::languages::generic::GenericLanguagePack;

const EUROPEAN_CODES: &[&str] = &[
    "bg", "ca", "cs", "cy", "da", "de", "el", "es", "et", "eu", "fi", "fr", "ga", "gl", "hr", "hu",
    "is", "it", "lt", "lv", "mk", "mt", "nl", "no", "pl", "pt", "ro", "sk", "sl", "sq", "sr", "sv",
];

fn aliases() -> &'static HashMap<&'static str, &'static str> {
    static ALIASES: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    ALIASES.get_or_init(|| {
        HashMap::from([
            ("auto", "und"),
            ("en-us", "en"),
            ("en-gb", "en"),
            ("en-ca", "en"),
            ("en-au", "en"),
            ("ko-kr", "ko"),
        ])
    })
}

fn packs() -> &'static HashMap<String, Box<dyn LanguagePack>> {
    static PACKS: OnceLock<HashMap<String, Box<dyn LanguagePack>>> = OnceLock::new();
    PACKS.get_or_init(|| {
        let mut map: HashMap<String, Box<dyn LanguagePack>> = HashMap::new();
        map.insert("en".to_string(), Box::new(EnglishLanguagePack));
        map.insert(
            "und".to_string(),
            Box::new(GenericLanguagePack::new("und", "Undetermined")),
        );
        map.insert(
            "ko".to_string(),
            Box::new(GenericLanguagePack::new("ko", "Korean")),
        );
        for code in EUROPEAN_CODES {
            map.insert(
                (*code).to_string(),
                Box::new(GenericLanguagePack::new(*code, code.to_uppercase())),
            );
        }
        map
    })
}

/// Whether a code (after alias resolution) names a pack the registry
/// actually carries, as opposed to one that would only resolve via the
/// `und` catch-all. Used to decide whether an ASR-detected language code
/// is trustworthy enough to re-resolve a prior "auto" request onto.
pub fn is_known_language_code(language_code: &str) -> bool {
    let folded = language_code.to_lowercase();
    let canonical = aliases().get(folded.as_str()).copied().unwrap_or(&folded);
    packs().contains_key(canonical)
}

/// Resolve a language code to the best available language pack.
///
/// Unknown codes resolve to the generic pack; the registry never fails.
pub fn resolve_language_pack(language_code: &str) -> &'static dyn LanguagePack {
    let folded = language_code.to_lowercase();
    let canonical = aliases().get(folded.as_str()).copied().unwrap_or(&folded);
    packs()
        .get(canonical)
        .map(|boxed| boxed.as_ref())
        .unwrap_or_else(|| packs().get("und").unwrap().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_alias() {
        let pack = resolve_language_pack("en-US");
        assert_eq!(pack.code(), "en");
    }

    #[test]
    fn known_code_check_follows_aliases() {
        assert!(is_known_language_code("en-US"));
        assert!(is_known_language_code("ko"));
        assert!(!is_known_language_code("zz"));
    }

    #[test]
    fn resolves_unknown_code_to_generic() {
        let pack = resolve_language_pack("xx");
        assert_eq!(pack.normalizer_id(), "generic-unicode-v1");
    }

    #[test]
    fn resolves_auto_to_undetermined() {
        let pack = resolve_language_pack("auto");
        assert_eq!(pack.code(), "und");
    }
}

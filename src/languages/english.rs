//! English language pack.

use std::sync::OnceLock;

use regex::Regex;

use crate::languages::base::{LanguagePack, NormalizedTranscript};

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn non_english_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9'\-\s]").unwrap())
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-z0-9]+(?:['\-][a-z0-9]+)?").unwrap())
}

fn apply_charmap(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect()
}

pub struct EnglishLanguagePack;

impl LanguagePack for EnglishLanguagePack {
    fn code(&self) -> &str {
        "en"
    }

    fn name(&self) -> &str {
        "English"
    }

    fn normalizer_id(&self) -> &str {
        "english-basic-v1"
    }

    fn normalize(&self, transcript: &str) -> NormalizedTranscript {
        let mapped = apply_charmap(transcript).to_lowercase();
        let stripped = non_english_re().replace_all(&mapped, " ");
        let collapsed = spaces_re().replace_all(&stripped, " ");
        let normalized = collapsed.trim().to_string();
        let tokens = token_re()
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect();

        NormalizedTranscript {
            original: transcript.to_string(),
            normalized,
            tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_tokenizes() {
        let pack = EnglishLanguagePack;
        let result = pack.normalize("Hello, multilingual world!!!");
        assert_eq!(result.tokens, vec!["hello", "multilingual", "world"]);
    }

    #[test]
    fn normalizes_curly_quotes_and_dashes() {
        let pack = EnglishLanguagePack;
        let result = pack.normalize("it\u{2019}s a well\u{2013}known co\u{2011}op's");
        assert!(result.normalized.contains("it's"));
    }

    #[test]
    fn keeps_hyphenated_and_apostrophe_words_intact() {
        let pack = EnglishLanguagePack;
        let result = pack.normalize("well-known don't");
        assert_eq!(result.tokens, vec!["well-known", "don't"]);
    }
}

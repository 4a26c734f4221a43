//! Generic/fallback language pack, reusable across unimplemented languages.

use std::sync::OnceLock;

use regex::Regex;

use crate::languages::base::{LanguagePack, NormalizedTranscript};

fn spaces_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").unwrap())
}

fn invalid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s'\-]").unwrap())
}

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{L}\p{N}]+(?:['\-][\p{L}\p{N}]+)?").unwrap())
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

pub struct GenericLanguagePack {
    code: String,
    name: String,
}

impl GenericLanguagePack {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

impl LanguagePack for GenericLanguagePack {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn normalizer_id(&self) -> &str {
        "generic-unicode-v1"
    }

    fn normalize(&self, transcript: &str) -> NormalizedTranscript {
        let mapped = apply_charmap(transcript).to_lowercase();
        let stripped = invalid_re().replace_all(&mapped, " ");
        let no_underscore = stripped.replace('_', " ");
        let collapsed = spaces_re().replace_all(&no_underscore, " ");
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
    fn tokenizes_unicode_words() {
        let pack = GenericLanguagePack::new("ko", "Korean");
        let result = pack.normalize("안녕하세요 반갑습니다");
        assert_eq!(result.tokens, vec!["안녕하세요", "반갑습니다"]);
    }

    #[test]
    fn strips_punctuation() {
        let pack = GenericLanguagePack::new("und", "Undetermined");
        let result = pack.normalize("hello, world!!!");
        assert_eq!(result.tokens, vec!["hello", "world"]);
    }
}

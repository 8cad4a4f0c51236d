// Post text normalization.
//
// Turns raw post text into the `post_limpio` form used by every later stage:
// lower-case, accent-free (except ñ), without URLs or punctuation, and with
// stopwords, domain noise words, short tokens and anything containing digits
// removed.

use std::sync::LazyLock;

use regex_lite::Regex;
use unicode_normalization::char::{decompose_canonical, is_combining_mark};
use unicode_normalization::UnicodeNormalization;

use crate::lexicon::Lexicon;

/// Tokens shorter than this are dropped unless listed as exceptions.
pub const MIN_TOKEN_CHARS: usize = 4;

static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"http\S+|www\.\S+|bit\.ly\S+").expect("valid URL pattern")
});

/// Deterministic text cleaner bound to one lexicon.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    lexicon: Lexicon,
}

impl TextNormalizer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Normalize a post. Missing or empty text yields an empty string.
    pub fn normalize(&self, raw: Option<&str>) -> String {
        match raw {
            Some(text) if !text.trim().is_empty() => self.normalize_text(text),
            _ => String::new(),
        }
    }

    fn normalize_text(&self, text: &str) -> String {
        let folded = fold_case_and_accents(text);
        let without_urls = URL_PATTERN.replace_all(&folded, " ");
        let stripped = strip_punctuation(&without_urls);

        stripped
            .split_whitespace()
            .filter(|token| self.keep_token(token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn keep_token(&self, token: &str) -> bool {
        if self.lexicon.normalizer_stopwords.contains(token) || self.lexicon.removal.contains(token)
        {
            return false;
        }
        if token.chars().count() < MIN_TOKEN_CHARS && !self.lexicon.exceptions.contains(token) {
            return false;
        }
        // ASCII digits only: `½` and `Ⅻ` are numeric but not digits.
        !token.chars().any(|c| c.is_ascii_digit())
    }
}

/// Lower-case the text and strip diacritics, keeping `ñ` as its own letter.
///
/// The input is composed first so a decomposed `n` + combining tilde is
/// treated the same as a precomposed `ñ`.
pub fn fold_case_and_accents(text: &str) -> String {
    let lowered = text.nfc().collect::<String>().to_lowercase();
    let mut out = String::with_capacity(lowered.len());

    for c in lowered.chars() {
        if c == 'ñ' {
            out.push(c);
            continue;
        }
        decompose_canonical(c, |d| {
            if !is_combining_mark(d) {
                out.push(d);
            }
        });
    }

    out
}

/// Replace every char that is not a word char, whitespace or `ñ` with a space.
fn strip_punctuation(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '_' || c.is_whitespace() || c == 'ñ' {
                c
            } else {
                ' '
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new(Lexicon::spanish())
    }

    #[test]
    fn test_fold_keeps_enye_and_strips_accents() {
        assert_eq!(fold_case_and_accents("MAÑANA Canción"), "mañana cancion");
        assert_eq!(fold_case_and_accents("Ñandú"), "ñandu");
    }

    #[test]
    fn test_fold_composes_decomposed_enye() {
        assert_eq!(fold_case_and_accents("man\u{0303}ana"), "mañana");
    }

    #[test]
    fn test_none_and_blank_are_empty() {
        let n = normalizer();
        assert_eq!(n.normalize(None), "");
        assert_eq!(n.normalize(Some("")), "");
        assert_eq!(n.normalize(Some("   \n")), "");
    }

    #[test]
    fn test_urls_removed() {
        let n = normalizer();
        let out = n.normalize(Some(
            "Reclamo atendido https://t.co/abc www.ejemplo.pe/ruta bit.ly/xyz gracias",
        ));
        assert_eq!(out, "reclamo atendido");
    }

    #[test]
    fn test_digits_and_short_tokens_removed() {
        let n = normalizer();
        let out = n.normalize(Some("Robo de 3 celulares en piso2 del sol 2024"));
        assert_eq!(out, "robo celulares");
    }

    #[test]
    fn test_exceptions_survive_length_filter() {
        let n = normalizer();
        let out = n.normalize(Some("La PNP llegó a SJL con la MML"));
        assert_eq!(out, "pnp llego sjl mml");
    }

    #[test]
    fn test_accented_stopwords_do_not_remove_folded_tokens() {
        let n = normalizer();
        assert_eq!(
            n.normalize(Some("Los clientes también están reclamando")),
            "clientes tambien estan reclamando"
        );
    }

    #[test]
    fn test_vulgar_fractions_are_not_digits() {
        let n = normalizer();
        assert_eq!(n.normalize(Some("Oferta de ½kilo de pollo")), "oferta ½kilo pollo");
    }

    #[test]
    fn test_punctuation_splits_tokens() {
        let n = normalizer();
        let out = n.normalize(Some("¡Incendio!!! evacuación,seguridad"));
        assert_eq!(out, "incendio evacuacion seguridad");
    }
}

// Word lists used by the normalizer and the keyword tokenizer.
//
// The lists are plain immutable values passed into the components that use
// them, so two runs with different vocabularies can live side by side. The
// built-in defaults are tuned for Spanish-language posts about Peruvian
// shopping centres; every list can be replaced from a file at startup.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use stop_words::{get, LANGUAGE};

use crate::text::normalize::fold_case_and_accents;

/// Short tokens (three letters or fewer) that survive the length filter:
/// district names, agencies and institutions that are usually written as
/// acronyms.
pub const DEFAULT_EXCEPTIONS: &[&str] = &[
    "sjl", "sjm", "vmt", "vla", "lpp", "ess", "mml", "mtc", "onp", "afp", "sun", "sbn", "idu",
    "pj", "mp", "csj", "osce", "pnp", "sat", "apc", "ugp", "psc", "jna", "san",
];

/// Curated function words removed by the normalizer.
pub const DEFAULT_NORMALIZER_STOPWORDS: &[&str] = &[
    "de", "la", "que", "el", "en", "y", "a", "los", "del", "se", "las", "por", "un", "para",
    "con", "no", "una", "su", "al", "lo", "como", "más", "pero", "sus", "le", "ya", "o", "este",
    "sí", "porque", "esta", "entre", "cuando", "muy", "sin", "sobre", "también", "me", "hasta",
    "hay", "donde", "quien", "desde", "todo", "nos", "durante", "todos", "uno", "les", "ni",
    "contra", "otros", "ese", "eso", "ante", "ellos", "e", "esto", "mí", "antes", "algunos",
    "qué", "unos", "yo", "otro", "otras", "otra", "él", "tanto", "esa", "estos", "mucho",
    "quienes", "nada", "muchos", "cual", "poco", "ella", "estar", "estas", "algunas", "algo",
    "nosotros", "mi", "mis", "tú", "te", "ti", "tu", "tus", "ellas", "nosotras", "vosotras",
    "vos", "mismo", "mismos", "misma", "mismas", "sea", "somos", "sois", "están",
];

/// Domain words with no thematic value: brand and venue names, media
/// outlets, connectors, weekdays, months and spelled-out numbers.
pub const DEFAULT_REMOVAL: &[&str] = &[
    "plaza", "plazas", "comercial", "centro", "soles", "ripley", "tienda", "tiendas", "mall",
    "anos", "real", "persona", "personas", "personal", "exitosanoticias", "trabajador",
    "trabajadores", "fecha", "exitosa", "radioexitosa", "exitosatv", "senal", "abierta", "tras",
    "segun", "contra", "durante", "mediante", "acerca", "respecto", "conforme", "alrededor",
    "cerca", "lejos", "junto", "frente", "aqui", "debido", "gracias", "incluso", "excepto",
    "salvo", "aunque", "ademas", "luego", "entonces", "mientras", "finalmente", "actualmente",
    "recientemente", "anteriormente", "posteriormente", "patio", "comida", "comidas", "lunes",
    "martes", "miercoles", "jueves", "viernes", "sabado", "domingo", "enero", "febrero",
    "marzo", "abril", "mayo", "junio", "julio", "agosto", "setiembre", "septiembre", "octubre",
    "noviembre", "diciembre", "uno", "dos", "tres", "cuatro", "cinco", "seis", "siete", "ocho",
    "nueve", "diez", "once", "doce", "trece", "catorce", "quince", "dieciseis", "diecisiete",
    "dieciocho", "diecinueve", "veinte",
];

/// All word lists consumed by the text stages.
///
/// The normalizer and keyword stopword lists are separate: the normalizer
/// uses a short curated list, keyword ranking uses the NLTK Spanish list.
#[derive(Debug, Clone)]
pub struct Lexicon {
    /// Stopwords removed by the text normalizer (lower-case, accents as
    /// given, so `también` does not remove the token `tambien`).
    pub normalizer_stopwords: HashSet<String>,
    /// Domain words removed by the text normalizer (folded form).
    pub removal: HashSet<String>,
    /// Short tokens kept despite the length filter (folded form).
    pub exceptions: HashSet<String>,
    /// Stopwords dropped by the keyword tokenizer (lower-case, as given).
    pub keyword_stopwords: HashSet<String>,
}

/// Optional replacement files for each list.
#[derive(Debug, Clone, Default)]
pub struct LexiconFiles<'a> {
    pub normalizer_stopwords: Option<&'a Path>,
    pub removal: Option<&'a Path>,
    pub exceptions: Option<&'a Path>,
    pub keyword_stopwords: Option<&'a Path>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::spanish()
    }
}

impl Lexicon {
    /// Build a lexicon from raw word lists.
    ///
    /// Removal and exception lists are folded (lower-case, accents stripped,
    /// `ñ` kept) so they compare against normalized tokens directly.
    pub fn new<S: AsRef<str>>(
        normalizer_stopwords: &[S],
        removal: &[S],
        exceptions: &[S],
        keyword_stopwords: &[S],
    ) -> Self {
        Self {
            normalizer_stopwords: lowered_set(normalizer_stopwords),
            removal: folded_set(removal),
            exceptions: folded_set(exceptions),
            keyword_stopwords: lowered_set(keyword_stopwords),
        }
    }

    /// Built-in Spanish lexicon.
    pub fn spanish() -> Self {
        let keyword_stopwords: Vec<String> = get(LANGUAGE::Spanish);
        let defaults = |list: &[&str]| list.iter().map(|w| w.to_string()).collect::<Vec<_>>();

        Self::new(
            &defaults(DEFAULT_NORMALIZER_STOPWORDS),
            &defaults(DEFAULT_REMOVAL),
            &defaults(DEFAULT_EXCEPTIONS),
            &keyword_stopwords,
        )
    }

    /// Start from the built-in lexicon and replace any list that has a file.
    pub fn load(files: &LexiconFiles<'_>) -> Result<Self> {
        let mut lexicon = Self::spanish();

        if let Some(path) = files.normalizer_stopwords {
            lexicon.normalizer_stopwords = lowered_set(&read_word_list(path)?);
        }
        if let Some(path) = files.removal {
            lexicon.removal = folded_set(&read_word_list(path)?);
        }
        if let Some(path) = files.exceptions {
            lexicon.exceptions = folded_set(&read_word_list(path)?);
        }
        if let Some(path) = files.keyword_stopwords {
            lexicon.keyword_stopwords = lowered_set(&read_word_list(path)?);
        }

        Ok(lexicon)
    }
}

/// Read a word list: one word per line, blank lines and `#` comments ignored.
pub fn read_word_list(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read word list {}", path.display()))?;
    Ok(parse_word_list(&content))
}

/// Parse the word-list file format.
pub fn parse_word_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

fn lowered_set<S: AsRef<str>>(words: &[S]) -> HashSet<String> {
    words
        .iter()
        .map(|w| w.as_ref().trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn folded_set<S: AsRef<str>>(words: &[S]) -> HashSet<String> {
    words
        .iter()
        .map(|w| fold_case_and_accents(w.as_ref().trim()))
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_removal_and_exceptions_are_folded() {
        let lexicon = Lexicon::new(
            &["También", "MÁS"],
            &["Miércoles"],
            &["PNP"],
            &[] as &[&str],
        );
        assert!(lexicon.normalizer_stopwords.contains("también"));
        assert!(lexicon.normalizer_stopwords.contains("más"));
        assert!(!lexicon.normalizer_stopwords.contains("tambien"));
        assert!(lexicon.removal.contains("miercoles"));
        assert!(lexicon.exceptions.contains("pnp"));
    }

    #[test]
    fn test_keyword_stopwords_are_the_nltk_list() {
        let lexicon = Lexicon::spanish();
        assert!(lexicon.keyword_stopwords.contains("de"));
        assert!(lexicon.keyword_stopwords.contains("estábamos"));
        assert!(!lexicon.keyword_stopwords.contains("trabajo"));
        assert!(lexicon.keyword_stopwords.len() < 400);
        assert!(lexicon.keyword_stopwords.len() > lexicon.normalizer_stopwords.len());
    }

    #[test]
    fn test_parse_word_list_skips_comments_and_blanks() {
        let words = parse_word_list("# marcas\nripley\n\n  saga  # tienda\n#fin\n");
        assert_eq!(words, vec!["ripley".to_string(), "saga".to_string()]);
    }

    #[test]
    fn test_load_replaces_only_given_lists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exceptions.txt");
        std::fs::write(&path, "ONU\nOEA\n").unwrap();

        let lexicon = Lexicon::load(&LexiconFiles {
            exceptions: Some(&path),
            ..Default::default()
        })
        .unwrap();

        assert_eq!(lexicon.exceptions.len(), 2);
        assert!(lexicon.exceptions.contains("onu"));
        assert!(lexicon.removal.contains("plaza"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let missing = Path::new("/nonexistent/tematica/words.txt");
        let result = Lexicon::load(&LexiconFiles {
            removal: Some(missing),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}

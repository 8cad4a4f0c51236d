// Unit tests for post normalization and keyword tokenization.
//
// Exercises TextNormalizer against the built-in Spanish lexicon and custom
// lexicons: idempotence, the ñ invariant, URL and punctuation removal, and
// the length/number filters.

use std::collections::HashSet;

use tematica::lexicon::Lexicon;
use tematica::text::normalize::{fold_case_and_accents, TextNormalizer};
use tematica::text::tokenize::KeywordTokenizer;

fn normalizer() -> TextNormalizer {
    TextNormalizer::new(Lexicon::spanish())
}

// ============================================================
// Example posts
// ============================================================

#[test]
fn venue_names_and_urls_are_removed() {
    let out = normalizer().normalize(Some("Visita la Plaza Comercial hoy! http://x.co"));
    assert!(!out.contains("plaza"));
    assert!(!out.contains("comercial"));
    assert!(!out.contains("http"));
    assert!(!out.contains("x.co"));
    assert_eq!(out, out.to_lowercase());
    assert!(!out.chars().any(|c| c.is_ascii_punctuation()));
    assert_eq!(out, "visita");
}

#[test]
fn realistic_post_keeps_thematic_words() {
    let out = normalizer().normalize(Some(
        "¡Atención! Robo de celulares en el estacionamiento del Mall, 3 detenidos por la PNP. www.exitosa.pe",
    ));
    assert_eq!(out, "atencion robo celulares estacionamiento detenidos pnp");
}

#[test]
fn missing_and_blank_posts_become_empty() {
    assert_eq!(normalizer().normalize(None), "");
    assert_eq!(normalizer().normalize(Some("   ")), "");
    assert_eq!(normalizer().normalize(Some("de la y")), "");
}

// ============================================================
// Invariants
// ============================================================

#[test]
fn normalization_is_idempotent() {
    let inputs = [
        "Incendio en la zona de comidas, evacuaron a 200 personas!!",
        "MAÑANA habrá descuentos en electrodomésticos y televisores",
        "Largas colas en SJL por la campaña escolar 2024",
        "",
    ];
    let n = normalizer();
    for input in inputs {
        let once = n.normalize(Some(input));
        let twice = n.normalize(Some(&once));
        assert_eq!(once, twice, "not idempotent for {input:?}");
    }
}

#[test]
fn enye_survives_in_any_case() {
    let n = normalizer();
    assert_eq!(n.normalize(Some("MAÑANA")), "mañana");
    assert_eq!(n.normalize(Some("mañana")), "mañana");
    assert_eq!(n.normalize(Some("Mañana")), "mañana");
}

#[test]
fn enye_kept_while_other_accents_are_stripped() {
    assert_eq!(fold_case_and_accents("Señalización Pública"), "señalizacion publica");
    // Decomposed n + combining tilde is treated like the precomposed letter
    assert_eq!(fold_case_and_accents("ma\u{006E}\u{0303}ana"), "mañana");
}

#[test]
fn numeric_tokens_are_dropped() {
    let out = normalizer().normalize(Some("Oferta 2x1 hasta 2024 en televisores"));
    assert_eq!(out, "oferta televisores");
}

#[test]
fn accented_curated_stopwords_keep_folded_words() {
    let out = normalizer().normalize(Some("Los clientes también están reclamando en la plaza"));
    assert_eq!(out, "clientes tambien estan reclamando");
}

#[test]
fn only_ascii_digits_make_a_token_numeric() {
    let out = normalizer().normalize(Some("Remate 2x1: ½kilo de pollo"));
    assert_eq!(out, "remate ½kilo pollo");
}

#[test]
fn exceptions_survive_length_filter() {
    let out = normalizer().normalize(Some("Operativo de la PNP en SJL y VMT"));
    assert_eq!(out, "operativo pnp sjl vmt");
}

#[test]
fn custom_lexicon_replaces_defaults() {
    let lexicon = Lexicon::new(
        &["hola"],
        &["Tienda"],
        &["ok"],
        &[] as &[&str],
    );
    let n = TextNormalizer::new(lexicon);
    // "plaza" is only removed by the built-in list
    assert_eq!(n.normalize(Some("hola plaza tienda ok")), "plaza ok");
}

// ============================================================
// Keyword tokenizer
// ============================================================

#[test]
fn tokenizer_drops_short_words_and_stopwords() {
    let stopwords: HashSet<String> = ["para".to_string()].into_iter().collect();
    let tokenizer = KeywordTokenizer::new(stopwords);
    assert_eq!(
        tokenizer.tokenize("Ya hay ofertas para TODOS, sí"),
        vec!["hay", "ofertas", "todos"]
    );
}

#[test]
fn tokenizer_uses_general_spanish_list() {
    let tokenizer = KeywordTokenizer::from_lexicon(&Lexicon::spanish());
    let tokens = tokenizer.tokenize("robo de celulares para todos ellos");
    assert!(tokens.contains(&"robo".to_string()));
    assert!(tokens.contains(&"celulares".to_string()));
    assert!(!tokens.contains(&"para".to_string()));
    assert!(!tokens.contains(&"ellos".to_string()));
}

#[test]
fn tokenizer_keeps_content_words_outside_nltk_list() {
    let tokenizer = KeywordTokenizer::from_lexicon(&Lexicon::spanish());
    let tokens = tokenizer.tokenize("trabajo empleo tiempo mejor valor horas total nuevo robo");
    assert_eq!(
        tokens,
        ["trabajo", "empleo", "tiempo", "mejor", "valor", "horas", "total", "nuevo", "robo"]
    );
}

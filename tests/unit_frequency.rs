// Unit tests for keyword frequency rankings.
//
// Counting across texts, ranking order, count conservation and the
// separation of per-cluster vocabularies.

use std::collections::{HashMap, HashSet};

use tematica::lexicon::Lexicon;
use tematica::text::tokenize::KeywordTokenizer;
use tematica::topics::frequency::{FrequencyAnalyzer, KeywordFrequency, GLOBAL_GROUP};

fn analyzer() -> FrequencyAnalyzer {
    FrequencyAnalyzer::new(KeywordTokenizer::new(HashSet::new()))
}

#[test]
fn counts_accumulate_across_texts() {
    let ranked = analyzer().top_keywords(&["gato perro gato", "perro gato gato"], 2);
    assert_eq!(ranked, vec![("gato".to_string(), 4), ("perro".to_string(), 2)]);
}

#[test]
fn ranking_is_non_increasing_and_truncated() {
    let texts = [
        "robo robo robo celulares celulares incendio",
        "incendio incendio humo robo",
        "descuentos",
    ];
    let ranked = analyzer().top_keywords(&texts, 3);
    assert_eq!(ranked.len(), 3);
    assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    assert_eq!(ranked[0], ("robo".to_string(), 4));
    assert_eq!(ranked[1], ("incendio".to_string(), 3));
}

#[test]
fn counts_sum_to_retained_tokens() {
    let tokenizer = KeywordTokenizer::from_lexicon(&Lexicon::spanish());
    let texts = [
        "robo de celulares en el estacionamiento",
        "celulares robados durante la campaña",
        "la campaña escolar trae descuentos",
    ];
    let retained: usize = texts.iter().map(|t| tokenizer.tokenize(t).len()).sum();

    let analyzer = FrequencyAnalyzer::new(tokenizer);
    let total: usize = analyzer
        .top_keywords(&texts, usize::MAX)
        .iter()
        .map(|(_, c)| c)
        .sum();
    assert_eq!(total, retained);
    assert!(total > 0);
}

#[test]
fn disjoint_clusters_never_mix_counts() {
    let rows = vec![
        ("C1", "robo celulares robo"),
        ("C2", "incendio humo incendio"),
        ("C1", "celulares ladrones"),
        ("C2", "bomberos humo"),
    ];
    let table = analyzer().top_keywords_by_group(rows, 10);

    let mut by_group: HashMap<&str, Vec<&KeywordFrequency>> = HashMap::new();
    for row in &table {
        by_group.entry(row.group.as_str()).or_default().push(row);
    }

    let c1: HashSet<&str> = by_group["C1"].iter().map(|r| r.word.as_str()).collect();
    let c2: HashSet<&str> = by_group["C2"].iter().map(|r| r.word.as_str()).collect();
    assert!(c1.is_disjoint(&c2));
    assert_eq!(c1, HashSet::from(["robo", "celulares", "ladrones"]));

    let celulares = by_group["C1"].iter().find(|r| r.word == "celulares").unwrap();
    assert_eq!(celulares.count, 2);
    let humo = by_group["C2"].iter().find(|r| r.word == "humo").unwrap();
    assert_eq!(humo.count, 2);
}

#[test]
fn groups_are_emitted_in_label_order() {
    let rows = vec![("C3", "uno"), ("C1", "dos"), ("C2", "tres")];
    let table = analyzer().top_keywords_by_group(rows, 5);
    let groups: Vec<&str> = table.iter().map(|r| r.group.as_str()).collect();
    assert_eq!(groups, vec!["C1", "C2", "C3"]);
}

#[test]
fn per_group_top_n_applies_to_each_group() {
    let rows = vec![
        ("C1", "alfa beta gamma delta"),
        ("C2", "epsilon zeta"),
    ];
    let table = analyzer().top_keywords_by_group(rows, 2);
    assert_eq!(table.iter().filter(|r| r.group == "C1").count(), 2);
    assert_eq!(table.iter().filter(|r| r.group == "C2").count(), 2);
}

#[test]
fn global_table_rows_carry_global_group() {
    let table = analyzer().global_keywords(&["gato perro"], 10);
    assert!(table.iter().all(|r| r.group == GLOBAL_GROUP));
}

#[test]
fn empty_corpus_yields_empty_ranking() {
    let empty: Vec<String> = Vec::new();
    assert!(analyzer().top_keywords(&empty, 50).is_empty());
    assert!(analyzer()
        .top_keywords_by_group(Vec::<(&str, &str)>::new(), 50)
        .is_empty());
}

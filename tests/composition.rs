// Composition tests: the stages chained together the way the CLI runs them.
//
//   raw records -> normalize -> global keywords
//                            -> embed -> cluster -> keywords per cluster -> prompt
//
// The hash embedder stands in for the sentence model, so these tests need no
// model files and no network.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tematica::error::PipelineError;
use tematica::lexicon::Lexicon;
use tematica::pipeline::{self, stages, RunOptions};
use tematica::prompt::build_prompt;
use tematica::records::io::{
    load_dataset, load_keywords, parse_json, save_dataset, save_keywords, FileFormat,
};
use tematica::records::{Dataset, FIELD_CLUSTER, FIELD_POST_LIMPIO};
use tematica::text::normalize::TextNormalizer;
use tematica::text::tokenize::KeywordTokenizer;
use tematica::topics::frequency::FrequencyAnalyzer;
use tematica::topics::hashing::HashEmbedder;
use tematica::topics::kmeans::{ClusterEngine, KMeansConfig};

fn mall_posts() -> Dataset {
    parse_json(
        r#"[
        {"post": "Robo de celulares en el estacionamiento del Mall", "published": "2024-07-28 15:30:00", "facebook_reactions": 10, "facebook_shares": 5, "facebook_comments": 5},
        {"post": "Otro robo de celulares, los ladrones escaparon", "published": "2024-07-29 09:00:00", "facebook_reactions": 4, "facebook_shares": 0, "facebook_comments": 4},
        {"post": "Denuncian robo de celulares en las escaleras", "published": "2024-08-01 20:15:00", "facebook_reactions": 1, "facebook_shares": 1, "facebook_comments": 0},
        {"post": "Incendio en el patio de comidas, bomberos controlan el humo", "published": "2024-12-24 12:00:00", "facebook_reactions": 50, "facebook_shares": 20, "facebook_comments": 30},
        {"post": "Bomberos atienden incendio y evacuan clientes por el humo", "published": "2024-12-25 13:45:00", "facebook_reactions": 0, "facebook_shares": 0, "facebook_comments": 0},
        {"post": "El humo del incendio obligó a cerrar el cine", "published": "fecha rota", "facebook_reactions": 3, "facebook_shares": 3, "facebook_comments": 3},
        {"post": null}
    ]"#,
    )
    .unwrap()
}

fn options(k: usize) -> RunOptions {
    RunOptions {
        kmeans: KMeansConfig::new(k, 42),
        top_n: 10,
        cluster_top_n: 5,
        ..RunOptions::default()
    }
}

// ============================================================
// Full run
// ============================================================

#[tokio::test]
async fn full_run_labels_every_record_and_ranks_keywords() {
    let mut dataset = mall_posts();
    let report = pipeline::run(
        &mut dataset,
        &Lexicon::spanish(),
        Arc::new(HashEmbedder::default()),
        &options(2),
    )
    .await
    .unwrap();

    assert_eq!(report.empty_posts, 1);
    assert_eq!(report.unparsed_dates, Some(2));

    for record in dataset.records() {
        let label = record[FIELD_CLUSTER].as_str().unwrap();
        assert!(label == "C1" || label == "C2");
        assert!(record.contains_key("ratio_reacciones"));
        assert!(record.contains_key("estacion"));
    }

    let top = &report.global_keywords;
    assert!(top.len() <= 10);
    assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
    let top_words: HashSet<&str> = top.iter().map(|r| r.word.as_str()).collect();
    assert!(top_words.contains("robo"));
    assert!(top_words.contains("incendio"));
    assert!(!top_words.contains("mall"));

    let groups: HashSet<&str> = report
        .cluster_keywords
        .iter()
        .map(|r| r.group.as_str())
        .collect();
    assert!(groups.iter().all(|g| *g == "C1" || *g == "C2"));
    for group in &groups {
        assert!(report.cluster_keywords.iter().filter(|r| r.group == *group).count() <= 5);
    }
    assert_eq!(report.clustering.sizes().iter().sum::<usize>(), dataset.len());
}

#[tokio::test]
async fn full_run_is_deterministic() {
    let lexicon = Lexicon::spanish();
    let mut first = mall_posts();
    let mut second = mall_posts();

    let a = pipeline::run(&mut first, &lexicon, Arc::new(HashEmbedder::default()), &options(3))
        .await
        .unwrap();
    let b = pipeline::run(&mut second, &lexicon, Arc::new(HashEmbedder::default()), &options(3))
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(a.global_keywords, b.global_keywords);
    assert_eq!(a.cluster_keywords, b.cluster_keywords);
    assert_eq!(a.clustering.assignments, b.clustering.assignments);
}

#[tokio::test]
async fn full_run_rejects_records_without_post() {
    let mut dataset = parse_json(r#"[{"texto": "hola"}, {"texto": "chau"}]"#).unwrap();
    let err = pipeline::run(
        &mut dataset,
        &Lexicon::spanish(),
        Arc::new(HashEmbedder::default()),
        &options(1),
    )
    .await
    .unwrap_err();

    assert_eq!(
        err.downcast_ref::<PipelineError>(),
        Some(&PipelineError::missing_field("post"))
    );
    assert!(!dataset.has_field(FIELD_POST_LIMPIO));
}

#[tokio::test]
async fn full_run_with_too_many_clusters_fails() {
    let mut dataset = mall_posts();
    let err = pipeline::run(
        &mut dataset,
        &Lexicon::spanish(),
        Arc::new(HashEmbedder::default()),
        &options(50),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Misconfiguration(_))
    ));
}

// ============================================================
// Step-by-step, through files
// ============================================================

#[tokio::test]
async fn stages_chain_through_saved_files() {
    let dir = tempfile::tempdir().unwrap();
    let lexicon = Lexicon::spanish();

    // clean
    let mut dataset = mall_posts();
    stages::normalize_stage(&mut dataset, &TextNormalizer::new(lexicon.clone())).unwrap();
    let cleaned_path = dir.path().join("1_Dataset_Limpio.csv");
    save_dataset(&dataset, &cleaned_path, FileFormat::Csv).unwrap();

    // cluster
    let mut cleaned = load_dataset(&cleaned_path).unwrap();
    let engine = ClusterEngine::new(KMeansConfig::new(2, 42));
    stages::cluster_stage(&mut cleaned, Arc::new(HashEmbedder::default()), &engine)
        .await
        .unwrap();
    let clustered_path = dir.path().join("3_Cluster_Indicadores.jsonl");
    save_dataset(&cleaned, &clustered_path, FileFormat::JsonLines).unwrap();

    // cluster keywords + prompt
    let clustered = load_dataset(&clustered_path).unwrap();
    let analyzer = FrequencyAnalyzer::new(KeywordTokenizer::from_lexicon(&lexicon));
    let table = stages::cluster_keywords_stage(&clustered, &analyzer, 30).unwrap();
    let table_path = dir.path().join("4_Top_Words_Cluster.csv");
    save_keywords(&table, &table_path, FileFormat::Csv).unwrap();
    let reloaded = load_keywords(&table_path).unwrap();
    assert_eq!(reloaded, table);
    let prompt = build_prompt(&reloaded);

    for group in table.iter().map(|r| r.group.as_str()) {
        assert!(prompt.contains(&format!("{group}:\n")));
    }
    assert_eq!(clustered.len(), 7);
    assert!(clustered.columns().iter().any(|c| c == FIELD_CLUSTER));
}

#[test]
fn cluster_keywords_require_cluster_column() {
    let dataset = parse_json(r#"[{"post_limpio": "robo celulares"}]"#).unwrap();
    let analyzer = FrequencyAnalyzer::new(KeywordTokenizer::from_lexicon(&Lexicon::spanish()));
    let err = stages::cluster_keywords_stage(&dataset, &analyzer, 10).unwrap_err();
    assert_eq!(err, PipelineError::missing_field("cluster"));
}

#[test]
fn unlabeled_rows_do_not_leak_into_clusters() {
    let mut dataset = parse_json(
        r#"[
        {"post_limpio": "robo celulares"},
        {"post_limpio": "incendio humo"},
        {"post_limpio": "descuentos"}
    ]"#,
    )
    .unwrap();
    dataset
        .set_field(FIELD_CLUSTER, vec![json!("C1"), json!("C2"), Value::Null])
        .unwrap();

    let analyzer = FrequencyAnalyzer::new(KeywordTokenizer::from_lexicon(&Lexicon::spanish()));
    let table = stages::cluster_keywords_stage(&dataset, &analyzer, 10).unwrap();
    assert!(!table.iter().any(|r| r.word == "descuentos"));
    assert_eq!(
        table.iter().find(|r| r.word == "incendio").map(|r| r.group.as_str()),
        Some("C2")
    );
}

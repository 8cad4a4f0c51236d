// Individual pipeline stages over a loaded dataset.
//
// Each stage checks its required fields through the dataset's typed views
// before doing any work, then writes its output column back onto the
// records. Stages are independent so the CLI can run them one at a time on
// files produced by an earlier step.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::records::{Dataset, FIELD_CLUSTER, FIELD_POST_LIMPIO};
use crate::text::normalize::TextNormalizer;
use crate::topics::frequency::{FrequencyAnalyzer, KeywordFrequency};
use crate::topics::kmeans::{ClusterEngine, Clustering};
use crate::topics::traits::EmbeddingProvider;
use crate::topics::Embedding;

/// Add `post_limpio` to every record. Returns how many posts normalized to
/// the empty string.
pub fn normalize_stage(dataset: &mut Dataset, normalizer: &TextNormalizer) -> PipelineResult<usize> {
    let posts = dataset.raw_posts()?;

    let cleaned: Vec<String> = posts
        .iter()
        .map(|p| normalizer.normalize(p.post.as_deref()))
        .collect();
    let empty = cleaned.iter().filter(|t| t.is_empty()).count();

    dataset.set_field(FIELD_POST_LIMPIO, cleaned.into_iter().map(Value::String).collect())?;

    if empty > 0 {
        warn!(empty, "Some posts were empty after normalization");
    }
    info!(records = dataset.len(), "Normalized posts");
    Ok(empty)
}

/// Embed `texts` with `provider` on the blocking thread pool.
///
/// The provider must return one vector per text, all of the same dimension;
/// anything else is a provider failure.
pub async fn embed_stage(
    provider: Arc<dyn EmbeddingProvider>,
    texts: Vec<String>,
) -> Result<Vec<Embedding>> {
    let expected = texts.len();
    let model_id = provider.model_id().to_string();
    info!(texts = expected, model = %model_id, "Computing embeddings");

    let vectors = tokio::task::spawn_blocking(move || provider.encode(&texts))
        .await
        .context("Embedding task panicked")?
        .map_err(|e| PipelineError::provider(format!("{model_id}: {e:#}")))?;

    check_embeddings(&vectors, expected)?;
    Ok(vectors)
}

fn check_embeddings(vectors: &[Embedding], expected: usize) -> PipelineResult<()> {
    if vectors.len() != expected {
        return Err(PipelineError::provider(format!(
            "returned {} vectors for {expected} texts",
            vectors.len()
        )));
    }
    if let Some(first) = vectors.first() {
        let dim = first.len();
        if let Some(i) = vectors.iter().position(|v| v.len() != dim) {
            return Err(PipelineError::provider(format!(
                "vector {i} has dimension {} (expected {dim})",
                vectors[i].len()
            )));
        }
    }
    Ok(())
}

/// Embed `post_limpio`, cluster the vectors and add `cluster` (`C1`..`Ck`)
/// to every record.
pub async fn cluster_stage(
    dataset: &mut Dataset,
    provider: Arc<dyn EmbeddingProvider>,
    engine: &ClusterEngine,
) -> Result<Clustering> {
    let texts: Vec<String> = dataset
        .clean_posts()?
        .into_iter()
        .map(|p| p.post_limpio)
        .collect();

    // Fail on bad parameters before paying for the embeddings.
    engine.config().validate()?;
    if engine.config().k > texts.len() {
        return Err(PipelineError::misconfiguration(format!(
            "cannot form {} clusters from {} records",
            engine.config().k,
            texts.len()
        ))
        .into());
    }

    let vectors = embed_stage(provider, texts).await?;
    let clustering = engine.fit(&vectors)?;

    let labels: Vec<Value> = clustering
        .labels()
        .into_iter()
        .map(|l| Value::String(l.to_string()))
        .collect();
    dataset.set_field(FIELD_CLUSTER, labels)?;

    Ok(clustering)
}

/// Top keywords over every `post_limpio` in the dataset.
pub fn global_keywords_stage(
    dataset: &Dataset,
    analyzer: &FrequencyAnalyzer,
    top_n: usize,
) -> PipelineResult<Vec<KeywordFrequency>> {
    let texts: Vec<String> = dataset
        .clean_posts()?
        .into_iter()
        .map(|p| p.post_limpio)
        .collect();
    let table = analyzer.global_keywords(&texts, top_n);
    info!(keywords = table.len(), "Ranked global keywords");
    Ok(table)
}

/// Top keywords per cluster label. Records without a label are skipped.
pub fn cluster_keywords_stage(
    dataset: &Dataset,
    analyzer: &FrequencyAnalyzer,
    top_n: usize,
) -> PipelineResult<Vec<KeywordFrequency>> {
    let posts = dataset.clustered_posts()?;

    let unlabeled = posts.iter().filter(|p| p.cluster.is_none()).count();
    if unlabeled > 0 {
        warn!(unlabeled, "Skipping records without a cluster label");
    }

    let rows = posts
        .iter()
        .filter_map(|p| p.cluster.as_deref().map(|c| (c, p.post_limpio.as_str())));
    let table = analyzer.top_keywords_by_group(rows, top_n);
    info!(rows = table.len(), "Ranked keywords per cluster");
    Ok(table)
}

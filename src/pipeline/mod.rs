// Pipeline orchestration.
//
// `stages` holds the individual steps; `run` chains them into the full
// batch: normalize, enrich, rank global keywords, embed and cluster, then
// rank keywords per cluster.

pub mod stages;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::enrich::{dates, engagement};
use crate::lexicon::Lexicon;
use crate::records::Dataset;
use crate::text::normalize::TextNormalizer;
use crate::text::tokenize::KeywordTokenizer;
use crate::topics::frequency::{FrequencyAnalyzer, KeywordFrequency};
use crate::topics::kmeans::{ClusterEngine, Clustering, KMeansConfig};
use crate::topics::traits::EmbeddingProvider;

/// Parameters for a full run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub kmeans: KMeansConfig,
    /// Keywords kept in the global ranking
    pub top_n: usize,
    /// Keywords kept per cluster
    pub cluster_top_n: usize,
    /// Derive calendar fields from `published` when present
    pub enrich_dates: bool,
    /// Add engagement ratio columns
    pub engagement: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            kmeans: KMeansConfig::default(),
            top_n: 50,
            cluster_top_n: 30,
            enrich_dates: true,
            engagement: true,
        }
    }
}

/// Everything a full run produces besides the enriched dataset itself.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub global_keywords: Vec<KeywordFrequency>,
    pub cluster_keywords: Vec<KeywordFrequency>,
    pub clustering: Clustering,
    /// Posts that normalized to the empty string
    pub empty_posts: usize,
    /// Records whose publication date could not be parsed, if dates were
    /// enriched
    pub unparsed_dates: Option<usize>,
}

/// Run every stage over `dataset`, writing `post_limpio`, `cluster` and the
/// enrichment columns onto its records.
///
/// Schema problems surface before any embedding work starts.
pub async fn run(
    dataset: &mut Dataset,
    lexicon: &Lexicon,
    provider: Arc<dyn EmbeddingProvider>,
    options: &RunOptions,
) -> Result<RunReport> {
    let normalizer = TextNormalizer::new(lexicon.clone());
    let analyzer = FrequencyAnalyzer::new(KeywordTokenizer::from_lexicon(lexicon));
    let engine = ClusterEngine::new(options.kmeans.clone());

    let empty_posts = stages::normalize_stage(dataset, &normalizer)?;
    let unparsed_dates = if options.enrich_dates {
        dates::enrich_dates(dataset)
    } else {
        None
    };

    let global_keywords = stages::global_keywords_stage(dataset, &analyzer, options.top_n)?;

    let clustering = stages::cluster_stage(dataset, provider, &engine).await?;
    if options.engagement {
        engagement::add_engagement_metrics(dataset);
    }

    let cluster_keywords =
        stages::cluster_keywords_stage(dataset, &analyzer, options.cluster_top_n)?;

    info!(
        records = dataset.len(),
        clusters = clustering.k(),
        "Pipeline run complete"
    );

    Ok(RunReport {
        global_keywords,
        cluster_keywords,
        clustering,
        empty_posts,
        unparsed_dates,
    })
}

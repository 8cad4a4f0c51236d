use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::lexicon::{Lexicon, LexiconFiles};
use crate::topics::kmeans::KMeansConfig;

/// Which embedding backend to use.
#[derive(Debug, Clone, PartialEq)]
pub enum EmbedderBackend {
    /// Local ONNX sentence model (default)
    Onnx,
    /// Deterministic feature hashing. No model files; for tests and dry runs.
    Hash,
}

impl FromStr for EmbedderBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "onnx" => Ok(EmbedderBackend::Onnx),
            "hash" => Ok(EmbedderBackend::Hash),
            other => anyhow::bail!("unknown embedder '{other}' (expected onnx or hash)"),
        }
    }
}

/// Run configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Every value has a
/// default; CLI flags override individual fields after loading.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of clusters (TEMATICA_CLUSTERS)
    pub n_clusters: usize,
    /// Seed for k-means initialization (TEMATICA_SEED)
    pub seed: u64,
    /// Keywords kept in the global ranking (TEMATICA_TOP_N)
    pub top_n: usize,
    /// Keywords kept per cluster (TEMATICA_CLUSTER_TOP_N)
    pub cluster_top_n: usize,
    pub max_iterations: usize,
    pub n_init: usize,
    pub embedder: EmbedderBackend,
    /// Sentence model identifier (TEMATICA_MODEL_ID)
    pub model_id: String,
    /// Base directory for model files (TEMATICA_MODEL_DIR)
    pub model_dir: PathBuf,
    /// Texts per embedding inference call
    pub batch_size: usize,
    pub stopwords_file: Option<PathBuf>,
    pub removal_file: Option<PathBuf>,
    pub exceptions_file: Option<PathBuf>,
    pub keyword_stopwords_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            seed: 42,
            top_n: 50,
            cluster_top_n: 30,
            max_iterations: 300,
            n_init: 1,
            embedder: EmbedderBackend::Onnx,
            model_id: crate::model::download::DEFAULT_MODEL_ID.to_string(),
            model_dir: crate::model::download::default_model_dir(),
            batch_size: 32,
            stopwords_file: None,
            removal_file: None,
            exceptions_file: None,
            keyword_stopwords_file: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A variable that is set but cannot be parsed is an error rather than
    /// a silent fallback to the default.
    pub fn load() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            n_clusters: parse_var("TEMATICA_CLUSTERS", defaults.n_clusters)?,
            seed: parse_var("TEMATICA_SEED", defaults.seed)?,
            top_n: parse_var("TEMATICA_TOP_N", defaults.top_n)?,
            cluster_top_n: parse_var("TEMATICA_CLUSTER_TOP_N", defaults.cluster_top_n)?,
            max_iterations: parse_var("TEMATICA_MAX_ITERATIONS", defaults.max_iterations)?,
            n_init: parse_var("TEMATICA_N_INIT", defaults.n_init)?,
            embedder: parse_var("TEMATICA_EMBEDDER", defaults.embedder)?,
            model_id: env::var("TEMATICA_MODEL_ID").unwrap_or(defaults.model_id),
            model_dir: env::var("TEMATICA_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_dir),
            batch_size: parse_var("TEMATICA_BATCH_SIZE", defaults.batch_size)?,
            stopwords_file: path_var("TEMATICA_STOPWORDS_FILE"),
            removal_file: path_var("TEMATICA_REMOVAL_FILE"),
            exceptions_file: path_var("TEMATICA_EXCEPTIONS_FILE"),
            keyword_stopwords_file: path_var("TEMATICA_KEYWORD_STOPWORDS_FILE"),
        })
    }

    /// Check the clustering parameters before any work starts.
    pub fn require_clustering(&self) -> Result<()> {
        if self.n_clusters == 0 {
            anyhow::bail!(
                "TEMATICA_CLUSTERS must be at least 1.\n\
                 Set it in your .env file or pass --clusters."
            );
        }
        if self.batch_size == 0 {
            anyhow::bail!("TEMATICA_BATCH_SIZE must be at least 1.");
        }
        self.kmeans().validate()?;
        Ok(())
    }

    /// Validate that the chosen embedder has what it needs.
    /// For ONNX the model files must exist (or the user should run
    /// download-model).
    pub fn require_embedder(&self) -> Result<()> {
        match self.embedder {
            EmbedderBackend::Onnx => {
                if !crate::model::download::embedding_files_present(&self.model_dir, &self.model_id)
                {
                    anyhow::bail!(
                        "Embedding model files not found in {}\n\
                         Run `tematica download-model` to download them.\n\
                         Or set TEMATICA_EMBEDDER=hash for a model-free dry run.",
                        crate::model::download::embedding_model_dir(&self.model_dir, &self.model_id)
                            .display()
                    );
                }
                Ok(())
            }
            EmbedderBackend::Hash => Ok(()),
        }
    }

    pub fn kmeans(&self) -> KMeansConfig {
        KMeansConfig {
            k: self.n_clusters,
            seed: self.seed,
            max_iterations: self.max_iterations,
            n_init: self.n_init,
            ..KMeansConfig::default()
        }
    }

    /// Build the lexicon, replacing built-in lists with configured files.
    pub fn lexicon(&self) -> Result<Lexicon> {
        Lexicon::load(&LexiconFiles {
            normalizer_stopwords: self.stopwords_file.as_deref(),
            removal: self.removal_file.as_deref(),
            exceptions: self.exceptions_file.as_deref(),
            keyword_stopwords: self.keyword_stopwords_file.as_deref(),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("Invalid value for {name}: '{raw}'")),
        _ => Ok(default),
    }
}

fn path_var(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::info;

use tematica::config::{Config, EmbedderBackend};
use tematica::pipeline::{self, stages, RunOptions};
use tematica::records::io::{self, FileFormat};
use tematica::text::normalize::TextNormalizer;
use tematica::text::tokenize::KeywordTokenizer;
use tematica::topics::frequency::{FrequencyAnalyzer, KeywordFrequency};
use tematica::topics::kmeans::ClusterEngine;
use tematica::topics::traits::EmbeddingProvider;

const CLEAN_OUTPUT: &str = "1_Dataset_Limpio";
const KEYWORDS_OUTPUT: &str = "2_keywords_por_post";
const CLUSTER_OUTPUT: &str = "3_Cluster_Indicadores";
const CLUSTER_KEYWORDS_OUTPUT: &str = "4_Top_Words_Cluster";
const PROMPT_OUTPUT: &str = "5_prompt_tematicas";

/// Tematica: topic discovery for social media posts.
///
/// Cleans Spanish-language posts, groups them into thematic clusters with
/// sentence embeddings and k-means, and ranks the keywords of each cluster.
#[derive(Parser)]
#[command(name = "tematica", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize posts and add publication-date context
    Clean {
        /// Input records (.json, .jsonl or .csv)
        input: String,

        /// Output file (default: 1_Dataset_Limpio next to the input)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Record format when --output is not given
        #[arg(long, value_enum, default_value = "json")]
        format: RecordFormat,

        /// Skip the date enrichment columns
        #[arg(long)]
        no_dates: bool,
    },

    /// Rank the most frequent keywords across all cleaned posts
    Keywords {
        /// Cleaned records (output of `tematica clean`)
        input: String,

        /// Number of keywords to keep (default: TEMATICA_TOP_N)
        #[arg(long)]
        top_n: Option<usize>,

        #[arg(long, value_enum, default_value = "csv")]
        format: TableFormat,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Embed cleaned posts and assign each one a cluster label
    Cluster {
        /// Cleaned records (output of `tematica clean`)
        input: String,

        /// Number of clusters (default: TEMATICA_CLUSTERS)
        #[arg(long)]
        clusters: Option<usize>,

        /// k-means seed (default: TEMATICA_SEED)
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value = "json")]
        format: RecordFormat,
    },

    /// Rank keywords within each cluster
    ClusterKeywords {
        /// Clustered records (output of `tematica cluster`)
        input: String,

        /// Keywords per cluster (default: TEMATICA_CLUSTER_TOP_N)
        #[arg(long)]
        top_n: Option<usize>,

        #[arg(long, value_enum, default_value = "csv")]
        format: TableFormat,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write the labeling prompt for a per-cluster keyword table
    Prompt {
        /// Keyword table (output of `tematica cluster-keywords`)
        table: String,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Run every stage and write all outputs next to the input
    Run {
        input: String,

        #[arg(long)]
        clusters: Option<usize>,

        #[arg(long)]
        seed: Option<u64>,

        /// Global keywords to keep
        #[arg(long)]
        top_n: Option<usize>,

        /// Keywords per cluster
        #[arg(long)]
        cluster_top_n: Option<usize>,
    },

    /// Download the sentence embedding model
    DownloadModel,
}

/// File format for record outputs.
#[derive(Clone, Copy, ValueEnum)]
enum RecordFormat {
    Json,
    Jsonl,
    Csv,
}

impl From<RecordFormat> for FileFormat {
    fn from(f: RecordFormat) -> Self {
        match f {
            RecordFormat::Json => FileFormat::Json,
            RecordFormat::Jsonl => FileFormat::JsonLines,
            RecordFormat::Csv => FileFormat::Csv,
        }
    }
}

/// Destination for keyword tables. `console` prints without writing a file.
#[derive(Clone, Copy, PartialEq, ValueEnum)]
enum TableFormat {
    Console,
    Json,
    Jsonl,
    Csv,
}

impl TableFormat {
    fn file_format(self) -> Option<FileFormat> {
        match self {
            TableFormat::Console => None,
            TableFormat::Json => Some(FileFormat::Json),
            TableFormat::Jsonl => Some(FileFormat::JsonLines),
            TableFormat::Csv => Some(FileFormat::Csv),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tematica=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean {
            input,
            output,
            format,
            no_dates,
        } => {
            let config = Config::load()?;
            let input = io::clean_path_input(&input);
            let mut dataset = io::load_dataset(&input)?;

            let normalizer = TextNormalizer::new(config.lexicon()?);
            let empty = stages::normalize_stage(&mut dataset, &normalizer)?;
            if !no_dates {
                tematica::enrich::dates::enrich_dates(&mut dataset);
            }

            let path = output_path(output, &input, CLEAN_OUTPUT, format.into());
            io::save_dataset(&dataset, &path, FileFormat::from_path(&path)?)?;

            println!("Cleaned {} posts.", dataset.len());
            if empty > 0 {
                println!(
                    "  {} {} posts had no usable words after cleaning",
                    "Note:".yellow(),
                    empty
                );
            }
            print_saved(&path);
        }

        Commands::Keywords {
            input,
            top_n,
            format,
            output,
        } => {
            let config = Config::load()?;
            let input = io::clean_path_input(&input);
            let dataset = io::load_dataset(&input)?;
            let analyzer = analyzer(&config)?;

            let table = stages::global_keywords_stage(
                &dataset,
                &analyzer,
                top_n.unwrap_or(config.top_n),
            )
            .context("Keyword ranking needs cleaned posts; run `tematica clean` first")?;

            emit_table(&table, format, output, &input, KEYWORDS_OUTPUT)?;
        }

        Commands::Cluster {
            input,
            clusters,
            seed,
            output,
            format,
        } => {
            let mut config = Config::load()?;
            apply_overrides(&mut config, clusters, seed, None, None);
            config.require_clustering()?;
            config.require_embedder()?;

            let input = io::clean_path_input(&input);
            let mut dataset = io::load_dataset(&input)?;
            dataset
                .require(tematica::records::FIELD_POST_LIMPIO)
                .context("Clustering needs cleaned posts; run `tematica clean` first")?;

            let provider = create_embedder(&config)?;
            let engine = ClusterEngine::new(config.kmeans());
            let clustering = stages::cluster_stage(&mut dataset, provider, &engine).await?;
            tematica::enrich::engagement::add_engagement_metrics(&mut dataset);

            let path = output_path(output, &input, CLUSTER_OUTPUT, format.into());
            io::save_dataset(&dataset, &path, FileFormat::from_path(&path)?)?;

            tematica::output::terminal::display_cluster_summary(&clustering, &[]);
            print_saved(&path);
        }

        Commands::ClusterKeywords {
            input,
            top_n,
            format,
            output,
        } => {
            let config = Config::load()?;
            let input = io::clean_path_input(&input);
            let dataset = io::load_dataset(&input)?;
            let analyzer = analyzer(&config)?;

            let table = stages::cluster_keywords_stage(
                &dataset,
                &analyzer,
                top_n.unwrap_or(config.cluster_top_n),
            )
            .context("Per-cluster ranking needs clustered posts; run `tematica cluster` first")?;

            emit_table(&table, format, output, &input, CLUSTER_KEYWORDS_OUTPUT)?;
        }

        Commands::Prompt { table, output } => {
            let table_path = io::clean_path_input(&table);
            let table = io::load_keywords(&table_path)?;
            let prompt = tematica::prompt::build_prompt(&table);

            let path = output.unwrap_or_else(|| {
                io::unique_output_path(&io::output_dir(&table_path), PROMPT_OUTPUT, "txt")
            });
            write_text(&path, &prompt)?;

            println!("{prompt}\n");
            print_saved(&path);
        }

        Commands::Run {
            input,
            clusters,
            seed,
            top_n,
            cluster_top_n,
        } => {
            let mut config = Config::load()?;
            apply_overrides(&mut config, clusters, seed, top_n, cluster_top_n);
            config.require_clustering()?;
            config.require_embedder()?;

            let input = io::clean_path_input(&input);
            let mut dataset = io::load_dataset(&input)?;
            let lexicon = config.lexicon()?;
            let provider = create_embedder(&config)?;

            let options = RunOptions {
                kmeans: config.kmeans(),
                top_n: config.top_n,
                cluster_top_n: config.cluster_top_n,
                ..RunOptions::default()
            };
            let report = pipeline::run(&mut dataset, &lexicon, provider, &options).await?;

            let dir = io::output_dir(&input);
            let dataset_path = io::unique_output_path(&dir, CLUSTER_OUTPUT, "json");
            io::save_dataset(&dataset, &dataset_path, FileFormat::Json)?;
            let global_path = io::unique_output_path(&dir, KEYWORDS_OUTPUT, "csv");
            io::save_keywords(&report.global_keywords, &global_path, FileFormat::Csv)?;
            let cluster_path = io::unique_output_path(&dir, CLUSTER_KEYWORDS_OUTPUT, "csv");
            io::save_keywords(&report.cluster_keywords, &cluster_path, FileFormat::Csv)?;
            let prompt_path = io::unique_output_path(&dir, PROMPT_OUTPUT, "txt");
            write_text(
                &prompt_path,
                &tematica::prompt::build_prompt(&report.cluster_keywords),
            )?;

            tematica::output::terminal::display_cluster_summary(
                &report.clustering,
                &report.cluster_keywords,
            );
            println!("{}", "Run complete.".bold());
            for path in [&dataset_path, &global_path, &cluster_path, &prompt_path] {
                print_saved(path);
            }
        }

        Commands::DownloadModel => {
            let config = Config::load()?;

            println!("Downloading sentence embedding model...");
            println!("  Destination: {}", config.model_dir.display());

            tematica::model::download::download_model(&config.model_dir, &config.model_id).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
            println!("You can now run `tematica cluster` or `tematica run`.");
        }
    }

    Ok(())
}

fn apply_overrides(
    config: &mut Config,
    clusters: Option<usize>,
    seed: Option<u64>,
    top_n: Option<usize>,
    cluster_top_n: Option<usize>,
) {
    if let Some(k) = clusters {
        config.n_clusters = k;
    }
    if let Some(s) = seed {
        config.seed = s;
    }
    if let Some(n) = top_n {
        config.top_n = n;
    }
    if let Some(n) = cluster_top_n {
        config.cluster_top_n = n;
    }
}

fn analyzer(config: &Config) -> Result<FrequencyAnalyzer> {
    let lexicon = config.lexicon()?;
    Ok(FrequencyAnalyzer::new(KeywordTokenizer::from_lexicon(&lexicon)))
}

/// Create an embedding provider based on the configured backend.
fn create_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.embedder {
        EmbedderBackend::Onnx => load_onnx_embedder(config),
        EmbedderBackend::Hash => {
            info!("Using hash embedder (no semantic model)");
            Ok(Arc::new(tematica::topics::hashing::HashEmbedder::default()))
        }
    }
}

#[cfg(feature = "onnx")]
fn load_onnx_embedder(config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    info!(model = %config.model_id, "Using local ONNX sentence embedder");
    let dir = tematica::model::download::embedding_model_dir(&config.model_dir, &config.model_id);
    let embedder =
        tematica::topics::embeddings::SentenceEmbedder::load(&dir, &config.model_id, config.batch_size)?;
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx_embedder(_config: &Config) -> Result<Arc<dyn EmbeddingProvider>> {
    anyhow::bail!(
        "TEMATICA_EMBEDDER=onnx but the 'onnx' feature is not compiled in.\n\
         Rebuild with: cargo build --features onnx\n\
         Or set TEMATICA_EMBEDDER=hash."
    )
}

/// The explicit output path, or a collision-free default next to the input.
fn output_path(explicit: Option<PathBuf>, input: &Path, base: &str, format: FileFormat) -> PathBuf {
    explicit.unwrap_or_else(|| {
        io::unique_output_path(&io::output_dir(input), base, format.extension())
    })
}

fn emit_table(
    table: &[KeywordFrequency],
    format: TableFormat,
    output: Option<PathBuf>,
    input: &Path,
    base: &str,
) -> Result<()> {
    match format.file_format() {
        None => {
            tematica::output::terminal::display_keywords(table);
            Ok(())
        }
        Some(file_format) => {
            let path = output_path(output, input, base, file_format);
            io::save_keywords(table, &path, file_format)?;
            println!("Ranked {} keywords.", table.len());
            print_saved(&path);
            Ok(())
        }
    }
}

fn write_text(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn print_saved(path: &Path) {
    println!("  {} {}", "Saved:".green(), path.display());
}

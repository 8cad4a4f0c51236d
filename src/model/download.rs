// Model download helper for the sentence embedding model.
//
// Fetches the ONNX export and tokenizer of a sentence-transformers model
// from HuggingFace into a platform-appropriate directory
// (~/.local/share/tematica/models/<model> on Linux) so they persist across
// runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

/// Default multilingual sentence embedding model.
pub const DEFAULT_MODEL_ID: &str = "paraphrase-multilingual-MiniLM-L12-v2";

/// HuggingFace organization hosting the sentence-transformers models.
const HF_BASE_URL: &str = "https://huggingface.co/sentence-transformers";

/// Remote file paths within the model repo.
const REMOTE_MODEL_FILE: &str = "onnx/model.onnx";
const REMOTE_TOKENIZER_FILE: &str = "tokenizer.json";

/// Local file names within the model directory.
pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

/// Returns the default directory for storing model files.
pub fn default_model_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tematica")
        .join("models")
}

/// Subdirectory of `base` holding a given model.
///
/// Only the last path segment of the id is used, so `org/name` and `name`
/// share a directory.
pub fn embedding_model_dir(base: &Path, model_id: &str) -> PathBuf {
    let name = model_id.rsplit('/').next().unwrap_or(model_id);
    base.join(name)
}

/// Check whether both model files exist for `model_id`.
pub fn embedding_files_present(base: &Path, model_id: &str) -> bool {
    let dir = embedding_model_dir(base, model_id);
    dir.join(MODEL_FILE).exists() && dir.join(TOKENIZER_FILE).exists()
}

fn model_repo_url(model_id: &str) -> String {
    if model_id.contains('/') {
        format!("https://huggingface.co/{model_id}/resolve/main")
    } else {
        format!("{HF_BASE_URL}/{model_id}/resolve/main")
    }
}

/// Download the embedding model files. Skips files that already exist.
pub async fn download_model(base: &Path, model_id: &str) -> Result<PathBuf> {
    let dir = embedding_model_dir(base, model_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create model directory: {}", dir.display()))?;

    let repo = model_repo_url(model_id);
    println!("\nSentence embedding model ({model_id}):");

    let tokenizer_path = dir.join(TOKENIZER_FILE);
    if tokenizer_path.exists() {
        info!("Embedding tokenizer already exists, skipping");
        println!("  {TOKENIZER_FILE} (already exists)");
    } else {
        println!("  Downloading {TOKENIZER_FILE}...");
        download_file(
            &format!("{repo}/{REMOTE_TOKENIZER_FILE}"),
            &tokenizer_path,
            false,
        )
        .await?;
    }

    let model_path = dir.join(MODEL_FILE);
    if model_path.exists() {
        info!("Embedding model already exists, skipping");
        println!("  {MODEL_FILE} (already exists)");
    } else {
        println!("  Downloading {MODEL_FILE} (~470 MB)...");
        download_file(&format!("{repo}/{REMOTE_MODEL_FILE}"), &model_path, true).await?;
    }

    Ok(dir)
}

/// Download a single file from a URL to a local path.
/// If `show_progress` is true, display a progress bar.
async fn download_file(url: &str, dest: &Path, show_progress: bool) -> Result<()> {
    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed with status {}: {}", response.status(), url);
    }

    let pb = if show_progress {
        let pb = match response.content_length() {
            Some(size) => {
                let pb = ProgressBar::new(size);
                pb.set_style(
                    ProgressStyle::default_bar()
                        .template("    [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                        .expect("valid template")
                        .progress_chars("=> "),
                );
                pb
            }
            None => {
                let pb = ProgressBar::new_spinner();
                pb.set_style(
                    ProgressStyle::default_spinner()
                        .template("    {spinner} {bytes}")
                        .expect("valid template"),
                );
                pb
            }
        };
        Some(pb)
    } else {
        None
    };

    let mut bytes = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .context("Failed to read response body")?
    {
        bytes.extend_from_slice(&chunk);
        if let Some(ref pb) = pb {
            pb.set_position(bytes.len() as u64);
        }
    }

    // Write to a temporary name first so an interrupted download never
    // leaves a truncated file that looks complete.
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, dest)
        .with_context(|| format!("Failed to move {} into place", dest.display()))?;

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    info!("Downloaded {} to {}", url, dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_dir_is_under_tematica() {
        let dir = default_model_dir();
        let path_str = dir.to_string_lossy();
        assert!(
            path_str.contains("tematica") && path_str.contains("models"),
            "Expected path containing tematica/models, got: {path_str}"
        );
    }

    #[test]
    fn test_model_dir_uses_last_segment() {
        let base = PathBuf::from("/tmp/test-models");
        assert_eq!(
            embedding_model_dir(&base, "sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2"),
            base.join(DEFAULT_MODEL_ID)
        );
        assert_eq!(embedding_model_dir(&base, DEFAULT_MODEL_ID), base.join(DEFAULT_MODEL_ID));
    }

    #[test]
    fn test_repo_url() {
        assert_eq!(
            model_repo_url(DEFAULT_MODEL_ID),
            "https://huggingface.co/sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2/resolve/main"
        );
        assert_eq!(
            model_repo_url("org/model"),
            "https://huggingface.co/org/model/resolve/main"
        );
    }

    #[test]
    fn test_files_present() {
        let base = tempfile::tempdir().unwrap();
        assert!(!embedding_files_present(base.path(), DEFAULT_MODEL_ID));

        let dir = embedding_model_dir(base.path(), DEFAULT_MODEL_ID);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(MODEL_FILE), b"fake").unwrap();
        std::fs::write(dir.join(TOKENIZER_FILE), b"fake").unwrap();
        assert!(embedding_files_present(base.path(), DEFAULT_MODEL_ID));
    }
}

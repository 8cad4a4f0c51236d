// Sentence embeddings from a local multilingual ONNX model.
//
// Default model: paraphrase-multilingual-MiniLM-L12-v2, which maps Spanish
// (and 50+ other languages) into a shared vector space. Token embeddings are
// mean-pooled over the attention mask, matching how the model was trained.
//
// The model runs on the local CPU. Inference is batched; the vector
// dimension is read from the model output rather than assumed.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::debug;

use super::traits::EmbeddingProvider;
use super::Embedding;

/// Texts per inference call unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Sentence embedder backed by an ONNX session.
///
/// `Session::run` needs `&mut self`, so the session sits behind a mutex; the
/// Arc lets the pipeline move the embedder into `spawn_blocking`.
pub struct SentenceEmbedder {
    model_id: String,
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    dimension: usize,
    /// Whether the model takes a `token_type_ids` input
    token_type_ids: bool,
    batch_size: usize,
}

impl SentenceEmbedder {
    /// Load the model and tokenizer from `model_dir`.
    ///
    /// Expects `model.onnx` and `tokenizer.json` in the directory. Runs one
    /// probe inference to learn the vector dimension.
    pub fn load(model_dir: &Path, model_id: &str, batch_size: usize) -> Result<Self> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        if !model_path.exists() {
            anyhow::bail!(
                "Embedding model not found: {}\nRun `tematica download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Embedding tokenizer not found: {}\nRun `tematica download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| {
                format!(
                    "Failed to load embedding model from {}",
                    model_path.display()
                )
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load embedding tokenizer: {}", e))?;

        let session = Arc::new(Mutex::new(session));
        let tokenizer = Arc::new(tokenizer);

        // XLM-R exports take input_ids and attention_mask only; BERT exports
        // also need token_type_ids. Keep whichever input set the model accepts.
        let probe_text = ["prueba".to_string()];
        let (token_type_ids, probe) = match embed_sync(&session, &tokenizer, &probe_text, false) {
            Ok(vectors) => (false, vectors),
            Err(first) => {
                let vectors =
                    embed_sync(&session, &tokenizer, &probe_text, true).map_err(|_| first)?;
                (true, vectors)
            }
        };
        let dimension = probe.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 {
            anyhow::bail!("Embedding model {model_id} produced an empty vector");
        }

        debug!(
            model = model_id,
            dim = dimension,
            token_type_ids,
            "Loaded sentence embedding model from {}",
            model_dir.display()
        );

        Ok(Self {
            model_id: model_id.to_string(),
            session,
            tokenizer,
            dimension,
            token_type_ids,
            batch_size: batch_size.max(1),
        })
    }
}

impl EmbeddingProvider for SentenceEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let pb = ProgressBar::new(texts.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  [{bar:40.cyan/blue}] {pos}/{len} posts ({eta})")
                .expect("valid template")
                .progress_chars("=> "),
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            let batch = embed_sync(&self.session, &self.tokenizer, chunk, self.token_type_ids)?;
            embeddings.extend(batch);
            pb.inc(chunk.len() as u64);
        }

        pb.finish_and_clear();
        Ok(embeddings)
    }
}

/// Tokenize, run inference and mean-pool one batch.
fn embed_sync(
    session: &Arc<Mutex<Session>>,
    tokenizer: &Arc<Tokenizer>,
    texts: &[String],
    with_token_type_ids: bool,
) -> Result<Vec<Embedding>> {
    let encodings: Vec<_> = texts
        .iter()
        .map(|t| {
            tokenizer
                .encode(t.as_str(), true)
                .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))
        })
        .collect::<Result<Vec<_>>>()?;

    let batch_size = encodings.len();
    let max_len = encodings
        .iter()
        .map(|e| e.get_ids().len())
        .max()
        .unwrap_or(0);

    if max_len == 0 {
        anyhow::bail!("Tokenizer produced no tokens for a batch of {batch_size} texts");
    }

    // input_ids and attention_mask are padded with 0
    let mut input_ids_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);
    let mut attention_mask_flat: Vec<i64> = Vec::with_capacity(batch_size * max_len);

    for enc in &encodings {
        let ids = enc.get_ids();
        let mask = enc.get_attention_mask();
        let pad_len = max_len - ids.len();

        input_ids_flat.extend(ids.iter().map(|&id| id as i64));
        input_ids_flat.extend(std::iter::repeat_n(0i64, pad_len));
        attention_mask_flat.extend(mask.iter().map(|&m| m as i64));
        attention_mask_flat.extend(std::iter::repeat_n(0i64, pad_len));
    }

    let shape = [batch_size as i64, max_len as i64];

    let input_ids_tensor =
        Tensor::from_array((shape, input_ids_flat)).context("Failed to create input_ids tensor")?;
    let attention_mask_tensor = Tensor::from_array((shape, attention_mask_flat.clone()))
        .context("Failed to create attention_mask tensor")?;
    // All zero for single-sentence input
    let token_type_ids_tensor = if with_token_type_ids {
        Some(
            Tensor::from_array((shape, vec![0i64; batch_size * max_len]))
                .context("Failed to create token_type_ids tensor")?,
        )
    } else {
        None
    };

    // Output is last_hidden_state: [batch, seq_len, dim]
    let (dim, hidden_states) = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = match token_type_ids_tensor {
            Some(token_type_ids_tensor) => session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor
            }),
            None => session.run(ort::inputs! {
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor
            }),
        }
        .context("Embedding ONNX inference failed")?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .context("Failed to extract embedding output tensor")?;

        let dim = shape.last().copied().unwrap_or(0) as usize;
        (dim, data.to_vec())
    };

    if dim == 0 || hidden_states.len() != batch_size * max_len * dim {
        anyhow::bail!(
            "Unexpected embedding output: {} values for batch {batch_size} x {max_len} tokens",
            hidden_states.len()
        );
    }

    let mut embeddings = Vec::with_capacity(batch_size);
    for i in 0..batch_size {
        let mut sum = vec![0.0_f64; dim];
        let mut mask_sum = 0.0_f64;

        for j in 0..max_len {
            let mask_val = attention_mask_flat[i * max_len + j] as f64;
            if mask_val > 0.0 {
                mask_sum += mask_val;
                let offset = (i * max_len + j) * dim;
                for (k, s) in sum.iter_mut().enumerate() {
                    *s += hidden_states[offset + k] as f64 * mask_val;
                }
            }
        }

        if mask_sum > 0.0 {
            for val in &mut sum {
                *val /= mask_sum;
            }
        }

        embeddings.push(sum);
    }

    debug!(batch_size, dim, "Computed sentence embeddings");

    Ok(embeddings)
}

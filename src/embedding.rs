//! Text embeddings for cluster input vectors. Grounded on
//! `infra/embeddings/openai_embedder.py`'s `embed_batch` contract (same
//! input order preserved in the output, retried on transient failure) and
//! on this codebase's own `Client::with_config(OpenAIConfig::new()...)`
//! construction pattern.

use async_openai::config::OpenAIConfig;
use async_openai::types::embedding::CreateEmbeddingRequestArgs;
use async_openai::Client;

use crate::errors::Error;

const MAX_RETRY_ATTEMPTS: u32 = 3;

pub struct Embedder {
  client: Client<OpenAIConfig>,
  model: String,
  dim: usize,
}

impl Embedder {
  pub fn new(api_key: &str, model: impl Into<String>, dim: usize) -> Self {
    let config = OpenAIConfig::new().with_api_key(api_key);
    Embedder { client: Client::with_config(config), model: model.into(), dim }
  }

  pub fn model_name(&self) -> &str {
    &self.model
  }

  pub fn dimension(&self) -> usize {
    self.dim
  }

  /// Embeds a batch of texts, preserving input order in the returned vector.
  /// Retries transient API failures with a short exponential backoff;
  /// returns an empty vector unchanged for an empty input batch rather than
  /// making a call.
  pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, Error> {
    if texts.is_empty() {
      return Ok(Vec::new());
    }

    let mut attempt = 0;
    loop {
      let request = CreateEmbeddingRequestArgs::default()
        .model(&self.model)
        .input(texts.to_vec())
        .build()
        .map_err(|e| Error::platform(e.to_string()))?;

      match self.client.embeddings().create(request).await {
        Ok(response) => {
          let mut by_index: Vec<(u32, Vec<f32>)> = response
            .data
            .into_iter()
            .map(|item| (item.index, item.embedding.into_iter().map(|v| v as f32).collect()))
            .collect();
          by_index.sort_by_key(|(index, _)| *index);
          return Ok(by_index.into_iter().map(|(_, embedding)| embedding).collect());
        }
        Err(e) => {
          attempt += 1;
          if attempt >= MAX_RETRY_ATTEMPTS {
            return Err(Error::platform(format!("embedding request failed after {attempt} attempts: {e}")));
          }
          let backoff_secs = 2u64.saturating_pow(attempt).min(30);
          tokio::time::sleep(std::time::Duration::from_secs(backoff_secs)).await;
        }
      }
    }
  }

  /// Splits `texts` into request-sized chunks before embedding, matching the
  /// order-preservation contract of `embed_batch` across the whole input.
  pub async fn embed_all(&self, texts: &[String], batch_size: usize) -> Result<Vec<Vec<f32>>, Error> {
    let mut all = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size.max(1)) {
      let embedded = self.embed_batch(chunk).await?;
      all.extend(embedded);
    }
    Ok(all)
  }
}

/// Builds the text passed to the embedder for one video: title and channel
/// name concatenated, matching what the source feeds to its embedder (title
/// carries almost all of the topical signal; channel name disambiguates
/// recurring show formats with generic titles like "Part 2").
pub fn embedding_input(title: &str, channel_title: &str) -> String {
  format!("{title} — {channel_title}")
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn embedding_input_combines_title_and_channel() {
    let input = embedding_input("How to bake sourdough", "Baking Basics");
    assert_eq!(input, "How to bake sourdough — Baking Basics");
  }
}

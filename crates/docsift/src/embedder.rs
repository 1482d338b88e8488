use docsift_core::config::{EmbedderKind, EmbedderSettings};
use docsift_core::embed::{normalize, HashingEmbedder};
use rig::client::{EmbeddingsClient, Nothing};
use rig::embeddings::EmbeddingModel;
use rig::providers::ollama;

use crate::prelude::*;

/// Text to unit-length vector, one vector per input, in input order.
#[allow(async_fn_in_trait)]
pub trait TextEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;
}

impl TextEmbedder for HashingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(self.embed_all(&texts))
    }
}

/// Embeddings served by a local Ollama instance.
pub struct OllamaEmbedder {
    client: ollama::Client,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(url: &str, model: impl Into<String>, batch_size: usize) -> Result<Self> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(url)
            .build()
            .map_err(|e| eyre!("Failed to create Ollama client: {}", e))?;

        Ok(Self {
            client,
            model: model.into(),
            batch_size: batch_size.max(1),
        })
    }
}

impl TextEmbedder for OllamaEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let model = self.client.embedding_model(&self.model);
        let mut vectors = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let embeddings = model
                .embed_texts(batch.to_vec())
                .await
                .map_err(|e| Error::Embedding(format!("{} ({})", e, self.model)))?;

            for embedding in embeddings {
                let mut vector: Vec<f32> = embedding.vec.iter().map(|v| *v as f32).collect();
                normalize(&mut vector);
                vectors.push(vector);
            }
        }

        Ok(vectors)
    }
}

/// The embedder picked by settings.
pub enum Embedder {
    Ollama(OllamaEmbedder),
    Hashing(HashingEmbedder),
}

impl Embedder {
    pub fn from_settings(settings: &EmbedderSettings) -> Result<Self> {
        Ok(match settings.kind {
            EmbedderKind::Ollama => Embedder::Ollama(OllamaEmbedder::new(
                &settings.url,
                &settings.model,
                settings.batch_size,
            )?),
            EmbedderKind::Hashing => Embedder::Hashing(HashingEmbedder::new(settings.dims)),
        })
    }

    pub fn describe(&self) -> String {
        match self {
            Embedder::Ollama(e) => format!("ollama:{}", e.model),
            Embedder::Hashing(e) => format!("hashing:{}", e.dims()),
        }
    }
}

impl TextEmbedder for Embedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        match self {
            Embedder::Ollama(e) => e.embed(texts).await,
            Embedder::Hashing(e) => TextEmbedder::embed(e, texts).await,
        }
    }
}

/// Embed `texts` and check that every text got exactly one vector.
pub async fn embed_checked<E: TextEmbedder>(
    embedder: &E,
    texts: Vec<String>,
) -> Result<Vec<Vec<f32>>> {
    let expected = texts.len();
    let vectors = embedder.embed(texts).await?;
    if vectors.len() != expected {
        return Err(Error::EmbeddingCount {
            expected,
            got: vectors.len(),
        }
        .into());
    }
    Ok(vectors)
}

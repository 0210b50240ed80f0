mod chunking;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use podcast_core::ids::{IdGenerator, PaperId, UuidIdGen};
use podcast_core::types::{Chunk, ScoredItem, StylePattern};

pub use chunking::chunk_body;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Passage,
    Query,
}

#[derive(Debug, thiserror::Error)]
pub enum EmbedderError {
    #[error("embedder transport error: {0}")]
    Transport(String),
}

#[derive(Debug, thiserror::Error)]
pub enum RetrieverError {
    #[error("retriever transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone)]
pub struct RetrievalItem {
    pub id: String,
    pub vector: Vec<f32>,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub paper_id: Option<String>,
    pub style_id: Option<String>,
}

pub trait Embedder: Send + Sync {
    fn embed<'a>(
        &'a self,
        texts: &'a [String],
        input_type: InputType,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Vec<f32>>, EmbedderError>> + Send + 'a>>;
}

pub trait Retriever: Send + Sync {
    fn upsert<'a>(
        &'a self,
        namespace: &'a str,
        items: Vec<RetrievalItem>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RetrieverError>> + Send + 'a>>;

    fn query<'a>(
        &'a self,
        namespace: &'a str,
        vector: &'a [f32],
        k: usize,
        filter: Option<Filter>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ScoredItem>, RetrieverError>> + Send + 'a>>;
}

#[derive(Debug, Clone)]
pub struct IndexReceipt {
    pub total_chunks: usize,
    pub embedded_chunks: usize,
}

impl IndexReceipt {
    pub fn coverage_ratio(&self) -> f64 {
        if self.total_chunks == 0 {
            1.0
        } else {
            self.embedded_chunks as f64 / self.total_chunks as f64
        }
    }
}

pub struct RetrieverGatewayConfig {
    pub chunk_words: usize,
    pub chunk_overlap_words: usize,
    pub min_chunk_words: usize,
    pub embed_batch_size: usize,
    pub embed_batch_delay_ms: u64,
}

pub struct RetrieverGateway {
    embedder: Arc<dyn Embedder>,
    retriever: Arc<dyn Retriever>,
    config: RetrieverGatewayConfig,
    id_gen: Arc<dyn IdGenerator>,
    chunks: tokio::sync::RwLock<Vec<Chunk>>,
}

const FACTS_NAMESPACE_PREFIX: &str = "facts/";
const STYLES_NAMESPACE: &str = "styles";

impl RetrieverGateway {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        retriever: Arc<dyn Retriever>,
        config: RetrieverGatewayConfig,
    ) -> Self {
        Self {
            embedder,
            retriever,
            config,
            id_gen: Arc::new(UuidIdGen),
            chunks: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub fn with_id_generator(mut self, id_gen: Arc<dyn IdGenerator>) -> Self {
        self.id_gen = id_gen;
        self
    }

    /// Chunks `body`, embeds it in bounded batches, and upserts into the
    /// paper-scoped namespace. Batch failures accumulate rather than abort,
    /// so `coverage_ratio` is always computable even under partial failure.
    pub async fn index_paper(&self, paper_id: PaperId, body: &str) -> Result<IndexReceipt, RetrieverError> {
        let mut chunks = chunk_body(
            paper_id,
            body,
            self.config.chunk_words,
            self.config.chunk_overlap_words,
            self.config.min_chunk_words,
            self.id_gen.as_ref(),
        );
        let total_chunks = chunks.len();
        let mut embedded_chunks = 0usize;
        let namespace = format!("{FACTS_NAMESPACE_PREFIX}{paper_id}");

        for batch in chunks.chunks_mut(self.config.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            match self.embedder.embed(&texts, InputType::Passage).await {
                Ok(vectors) => {
                    let mut items = Vec::with_capacity(batch.len());
                    for (chunk, vector) in batch.iter_mut().zip(vectors.into_iter()) {
                        chunk.embedding = Some(vector.clone());
                        items.push(RetrievalItem {
                            id: chunk.chunk_id.to_string(),
                            vector,
                            text: chunk.text.clone(),
                        });
                    }
                    if let Err(e) = self.retriever.upsert(&namespace, items).await {
                        tracing::warn!(error = %e, "index_paper_upsert_failed");
                    } else {
                        embedded_chunks += batch.len();
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "index_paper_embed_batch_failed");
                }
            }
            if self.config.embed_batch_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.embed_batch_delay_ms)).await;
            }
        }

        *self.chunks.write().await = chunks;

        Ok(IndexReceipt {
            total_chunks,
            embedded_chunks,
        })
    }

    pub async fn index_styles(
        &self,
        style_corpus: &[StylePattern],
    ) -> Result<IndexReceipt, RetrieverError> {
        let total_chunks = style_corpus.len();
        let mut embedded_chunks = 0usize;

        for batch in style_corpus.chunks(self.config.embed_batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();
            match self.embedder.embed(&texts, InputType::Passage).await {
                Ok(vectors) => {
                    let items = batch
                        .iter()
                        .zip(vectors)
                        .map(|(pattern, vector)| RetrievalItem {
                            id: pattern.style_id.to_string(),
                            vector,
                            text: pattern.text.clone(),
                        })
                        .collect();
                    if self.retriever.upsert(STYLES_NAMESPACE, items).await.is_ok() {
                        embedded_chunks += batch.len();
                    }
                }
                Err(e) => tracing::warn!(error = %e, "index_styles_embed_batch_failed"),
            }
        }

        Ok(IndexReceipt {
            total_chunks,
            embedded_chunks,
        })
    }

    /// Retrieves the top-`k` fact chunks for `query`. When the vector index
    /// returns fewer than `k` hits (e.g. because embedding partially failed
    /// during indexing), pads the result with the nearest *unembedded*
    /// chunks by ordinal proximity, tagged `fallback: true` and always
    /// ranked after vector-scored hits.
    pub async fn retrieve_facts(
        &self,
        query: &str,
        k: usize,
        paper_id: Option<PaperId>,
    ) -> Result<Vec<ScoredItem>, RetrieverError> {
        let vector = self
            .embedder
            .embed(&[query.to_string()], InputType::Query)
            .await
            .map_err(|e| RetrieverError::Transport(e.to_string()))?;
        let vector = vector.into_iter().next().unwrap_or_default();

        let filter = paper_id.map(|id| Filter {
            paper_id: Some(id.to_string()),
            style_id: None,
        });
        let namespace = match paper_id {
            Some(id) => format!("{FACTS_NAMESPACE_PREFIX}{id}"),
            None => FACTS_NAMESPACE_PREFIX.trim_end_matches('/').to_string(),
        };

        let mut results = self.retriever.query(&namespace, &vector, k, filter).await?;

        if results.len() < k {
            let chunks = self.chunks.read().await;
            let unembedded: Vec<&Chunk> = chunks.iter().filter(|c| c.embedding.is_none()).collect();
            let needed = k - results.len();
            for chunk in unembedded.into_iter().take(needed) {
                results.push(ScoredItem {
                    id: chunk.chunk_id.to_string(),
                    score: 0.0,
                    text: chunk.text.clone(),
                    fallback: true,
                });
            }
        }

        Ok(results)
    }

    pub async fn retrieve_styles(&self, query: &str, k: usize) -> Result<Vec<ScoredItem>, RetrieverError> {
        let vector = self
            .embedder
            .embed(&[query.to_string()], InputType::Query)
            .await
            .map_err(|e| RetrieverError::Transport(e.to_string()))?;
        let vector = vector.into_iter().next().unwrap_or_default();
        self.retriever.query(STYLES_NAMESPACE, &vector, k, None).await
    }
}

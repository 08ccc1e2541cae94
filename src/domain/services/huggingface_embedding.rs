use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use async_trait::async_trait;
use rust_bert::pipelines::sentence_embeddings::{
    SentenceEmbeddingsBuilder, SentenceEmbeddingsModelType,
};
use tokio::{sync::oneshot, task};
use tracing::info;

use crate::{
    domain::entities::entity_point::Embeddings,
    ports::embedder::{Embedder, EmbedderError},
};

/// Message type for the internal channel, passing input texts in and the
/// generated embeddings (or the model failure) back out
type RunnerMessage = (Vec<String>, oneshot::Sender<Result<Vec<Embeddings>, String>>);

/// `Embedder` running a Hugging Face sentence-embeddings model
/// (AllMiniLmL12V2, 384-dimensional dense vectors).
///
/// The model is loaded once on a dedicated sync thread; requests are fed
/// to it through a channel. Construction is expensive, invocation is not,
/// and one instance is shared by every handler.
pub struct HuggingFaceEmbeddingsService {
    sender_to_runner: mpsc::SyncSender<RunnerMessage>,
    dimension: usize,
    _thread_handle: JoinHandle<()>,
}

impl HuggingFaceEmbeddingsService {
    /// Spawns the embeddings runner on a separate thread and returns the
    /// service used to interact with it
    pub fn new(dimension: usize) -> Self {
        let (sender, receiver) = mpsc::sync_channel(100);
        let handle = thread::spawn(move || Self::runner(receiver));

        Self {
            sender_to_runner: sender,
            dimension,
            _thread_handle: handle,
        }
    }

    /// The embeddings runner itself.
    ///
    /// Running extensive calculations inside a future should be avoided,
    /// so the runner lives in a sync context. A model failure is reported
    /// back to the caller instead of tearing the runner down.
    #[tracing::instrument(name = "Embeddings runner", skip(receiver))]
    fn runner(receiver: mpsc::Receiver<RunnerMessage>) {
        let model = match SentenceEmbeddingsBuilder::remote(
            SentenceEmbeddingsModelType::AllMiniLmL12V2,
        )
        .create_model()
        {
            Ok(model) => model,
            Err(error) => {
                // Every request fails with the load error until the process is restarted
                while let Ok((_, sender)) = receiver.recv() {
                    let _ = sender.send(Err(format!("Embedding model failed to load: {}", error)));
                }
                return;
            }
        };
        info!("Embeddings model loaded ✅");

        while let Ok((texts, sender)) = receiver.recv() {
            let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
            let result = model
                .encode(&texts)
                .map_err(|error| format!("Embedding model error: {}", error));

            let _ = sender.send(result);
        }
    }

    fn zero_vector(&self) -> Embeddings {
        vec![0.0; self.dimension]
    }

    async fn encode_non_empty(&self, texts: Vec<String>) -> Result<Vec<Embeddings>, EmbedderError> {
        let (sender, receiver) = oneshot::channel();

        task::block_in_place(|| self.sender_to_runner.send((texts, sender)))
            .map_err(|error| EmbedderError::Unavailable(error.to_string()))?;

        receiver
            .await
            .map_err(|error| EmbedderError::Unavailable(error.to_string()))?
            .map_err(EmbedderError::Unavailable)
    }
}

#[async_trait]
impl Embedder for HuggingFaceEmbeddingsService {
    fn dimension(&self) -> usize {
        self.dimension
    }

    #[tracing::instrument(name = "Generating embedding", skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Embeddings, EmbedderError> {
        // Zero vector is the sentinel for "no content", the model is not invoked
        if text.trim().is_empty() {
            return Ok(self.zero_vector());
        }

        let mut embeddings = self.encode_non_empty(vec![text.to_string()]).await?;
        embeddings
            .pop()
            .ok_or_else(|| EmbedderError::Unavailable("Model returned no embedding".to_string()))
    }

    #[tracing::instrument(name = "Generating embeddings batch", skip(self, texts))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embeddings>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        // Empty items follow the zero-vector rule, only the rest hit the model
        let non_empty: Vec<(usize, String)> = texts
            .iter()
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| (i, text.clone()))
            .collect();

        let mut result = vec![self.zero_vector(); texts.len()];

        if !non_empty.is_empty() {
            let encoded = self
                .encode_non_empty(non_empty.iter().map(|(_, t)| t.clone()).collect())
                .await?;

            for ((index, _), embedding) in non_empty.into_iter().zip(encoded) {
                result[index] = embedding;
            }
        }

        Ok(result)
    }
}

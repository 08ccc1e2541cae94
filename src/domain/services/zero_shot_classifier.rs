use std::{
    sync::mpsc,
    thread::{self, JoinHandle},
};

use async_trait::async_trait;
use rust_bert::pipelines::zero_shot_classification::ZeroShotClassificationModel;
use tokio::{sync::oneshot, task};
use tracing::info;

use crate::{
    domain::entities::moderation_verdict::CategoryScores,
    ports::content_classifier::{ContentClassifier, ContentClassifierError},
};

/// Candidate labels, one per category of the fixed taxonomy, in the order
/// of the `CategoryScores` fields
const CANDIDATE_LABELS: [&str; 6] = [
    "toxic",
    "severely toxic",
    "obscene",
    "threatening",
    "insulting",
    "attacking an identity",
];

const MAX_SEQUENCE_LENGTH: usize = 128;

type RunnerMessage = (String, oneshot::Sender<Result<CategoryScores, String>>);

/// Model-based `ContentClassifier`: zero-shot multilabel classification
/// over the six-category taxonomy.
///
/// Same runner-thread setup as the embeddings service: the model loads
/// once on a dedicated sync thread and is fed through a channel.
pub struct ZeroShotContentClassifier {
    sender_to_runner: mpsc::SyncSender<RunnerMessage>,
    _thread_handle: JoinHandle<()>,
}

impl ZeroShotContentClassifier {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::sync_channel(100);
        let handle = thread::spawn(move || Self::runner(receiver));

        Self {
            sender_to_runner: sender,
            _thread_handle: handle,
        }
    }

    #[tracing::instrument(name = "Zero-shot classifier runner", skip(receiver))]
    fn runner(receiver: mpsc::Receiver<RunnerMessage>) {
        let model = match ZeroShotClassificationModel::new(Default::default()) {
            Ok(model) => model,
            Err(error) => {
                // Every request fails with the load error until the process is restarted
                while let Ok((_, sender)) = receiver.recv() {
                    let _ =
                        sender.send(Err(format!("Zero-shot model failed to load: {}", error)));
                }
                return;
            }
        };
        info!("Zero-shot classification model loaded ✅");

        while let Ok((text, sender)) = receiver.recv() {
            let result = Self::classify_with_model(&model, &text);
            let _ = sender.send(result);
        }
    }

    fn classify_with_model(
        model: &ZeroShotClassificationModel,
        text: &str,
    ) -> Result<CategoryScores, String> {
        let labels = model
            .predict_multilabel([text], &CANDIDATE_LABELS, None, MAX_SEQUENCE_LENGTH)
            .map_err(|error| format!("Zero-shot model error: {}", error))?;

        let labels = labels
            .into_iter()
            .next()
            .ok_or_else(|| "Zero-shot model returned no prediction".to_string())?;

        let score_for = |label_text: &str| {
            labels
                .iter()
                .find(|label| label.text == label_text)
                .map(|label| label.score as f32)
                .unwrap_or(0.0)
        };

        Ok(CategoryScores {
            toxicity: score_for(CANDIDATE_LABELS[0]),
            severe_toxicity: score_for(CANDIDATE_LABELS[1]),
            obscene: score_for(CANDIDATE_LABELS[2]),
            threat: score_for(CANDIDATE_LABELS[3]),
            insult: score_for(CANDIDATE_LABELS[4]),
            identity_attack: score_for(CANDIDATE_LABELS[5]),
        })
    }
}

impl Default for ZeroShotContentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentClassifier for ZeroShotContentClassifier {
    #[tracing::instrument(name = "Classifying text", skip(self, text))]
    async fn classify(&self, text: &str) -> Result<CategoryScores, ContentClassifierError> {
        if text.trim().is_empty() {
            return Ok(CategoryScores::zeroed());
        }

        let (sender, receiver) = oneshot::channel();

        task::block_in_place(|| self.sender_to_runner.send((text.to_string(), sender)))
            .map_err(|error| ContentClassifierError::Unavailable(error.to_string()))?;

        receiver
            .await
            .map_err(|error| ContentClassifierError::Unavailable(error.to_string()))?
            .map_err(ContentClassifierError::Unavailable)
    }
}

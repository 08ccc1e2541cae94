pub mod collaborative;
pub mod huggingface_embedding;
pub mod ingestion;
pub mod keyword_classifier;
pub mod moderation;
pub mod retrieval;
pub mod scoring;
pub mod zero_shot_classifier;

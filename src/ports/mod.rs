pub mod content_classifier;
pub mod embedder;
pub mod record_store;
pub mod vector_index;

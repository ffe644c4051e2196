//! Document processing pipeline: extraction, chunking, backend calls, and request lifecycle.

pub mod chunking;
pub mod lifecycle;
pub mod pipeline;
pub mod retry;
mod service;
pub mod types;

pub use chunking::{Chunk, Chunker};
pub use lifecycle::{InvalidTransition, RequestLifecycle, RequestStage};
pub use pipeline::SummarizationPipeline;
pub use retry::RetryPolicy;
pub use service::{DocumentService, ProcessingApi};
pub use types::{ChunkingError, ProcessingError, SummaryOutcome};

//! Retrieval-augmented generation over the event corpus.
//!
//! - `ingest`: rows → embedded records → flat-file store
//! - `ranker`: cosine top-K over a loaded store generation
//! - `prompt` / `pipeline`: context assembly and the question-answer flow

pub mod fields;
pub mod ingest;
pub mod pipeline;
pub mod prompt;
pub mod ranker;
pub mod record;
pub mod store;

pub use ingest::Ingestor;
pub use pipeline::{QueryOutcome, QueryPipeline, QueryRequest};
pub use ranker::{cosine_similarity, rank, HitView, RankedHit};
pub use record::{EventMetadata, VectorRecord};
pub use store::VectorStore;

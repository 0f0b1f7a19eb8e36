//! Import workflow
//!
//! Token exchange → source chain → merge → enrichment → persistence. The
//! chain runs its strategies sequentially; each run owns its access token
//! and observation set, so concurrent imports share nothing but the store.

pub mod pipeline;
pub mod source_chain;

pub use pipeline::{ImportOutcome, ImportPipeline, ImportRequest, PipelineError};
pub use source_chain::{ChainReport, ProfileSourceChain, SourceFailure};

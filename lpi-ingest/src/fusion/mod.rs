// Fusion Module - Merge and Enrichment
//
// Observations (source chain) → FieldMergeResolver → MergedProfile → enrich → EnrichedProfile

pub mod enrichment;
pub mod merge_resolver;

pub use enrichment::{classify_role, enrich, extract_tags};
pub use merge_resolver::FieldMergeResolver;

mod combiner;
mod config;
mod metadata;
mod search;
mod tags;
mod trace;

pub use combiner::Combiner;
pub use config::{
    CombinerConfig, ENV_DEDUPE_SPANS, ENV_MAX_TAG_BYTES, ENV_MAX_TAG_VALUES, ENV_MAX_TRACE_BYTES,
    ENV_SEARCH_LIMIT,
};
pub use metadata::{CombineMetadata, SearchMetadata};
pub use search::combine_search_results;
pub use tags::combine_metadata_metrics;

mod combiner;
mod sort;

pub use combiner::TraceCombiner;
pub use sort::sort_trace;

use crate::error::MergeError;
use crate::trace::Trace;

/// Incremental, cross-instance merge of the fragments of one trace.
pub trait TraceMerger {
    /// Merge a fragment into the running result.
    /// Returns the number of spans the fragment contributed.
    fn consume(&mut self, fragment: Trace) -> Result<usize, MergeError>;

    /// Consume the merger, returning the merged trace and its total span count.
    fn finish(self) -> (Trace, usize);
}

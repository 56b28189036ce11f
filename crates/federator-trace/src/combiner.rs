use std::collections::HashSet;

use federator_core::error::MergeError;
use federator_core::merger::TraceMerger;
use federator_core::trace::{Span, SpanId, SpanKind, Trace};
use tracing::debug;

/// Identity of a span across instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SpanKey {
    span_id: SpanId,
    parent_span_id: Option<SpanId>,
    kind: SpanKind,
}

impl SpanKey {
    fn of(span: &Span) -> Self {
        Self {
            span_id: span.span_id,
            parent_span_id: span.parent_span_id,
            kind: span.kind,
        }
    }
}

/// Merges the fragments of one trace returned by several instances.
///
/// A fragment is sized by its serialized length. Once a ceiling is set, any
/// fragment that would push the consumed total past it is rejected whole.
pub struct TraceCombiner {
    result: Trace,
    seen: HashSet<SpanKey>,
    span_count: usize,
    consumed_bytes: usize,
    max_size_bytes: usize,
    dedupe: bool,
}

impl TraceCombiner {
    /// `max_size_bytes == 0` disables the ceiling.
    pub fn new(max_size_bytes: usize, dedupe: bool) -> Self {
        Self {
            result: Trace::default(),
            seen: HashSet::new(),
            span_count: 0,
            consumed_bytes: 0,
            max_size_bytes,
            dedupe,
        }
    }

    pub fn consumed_bytes(&self) -> usize {
        self.consumed_bytes
    }
}

impl TraceMerger for TraceCombiner {
    fn consume(&mut self, fragment: Trace) -> Result<usize, MergeError> {
        let size = serde_json::to_vec(&fragment)
            .map_err(|e| MergeError::Serialization(e.to_string()))?
            .len();

        if self.max_size_bytes > 0 && self.consumed_bytes + size > self.max_size_bytes {
            return Err(MergeError::TraceTooLarge {
                size: self.consumed_bytes + size,
                limit: self.max_size_bytes,
            });
        }
        self.consumed_bytes += size;

        let seen = &mut self.seen;
        let dedupe = self.dedupe;
        let mut added = 0;

        for mut rs in fragment.resource_spans {
            rs.scope_spans.retain_mut(|ss| {
                if dedupe {
                    ss.spans.retain(|span| seen.insert(SpanKey::of(span)));
                }
                added += ss.spans.len();
                !ss.spans.is_empty()
            });
            if !rs.scope_spans.is_empty() {
                self.result.resource_spans.push(rs);
            }
        }

        debug!(added, size, "consumed trace fragment");
        self.span_count += added;
        Ok(added)
    }

    fn finish(self) -> (Trace, usize) {
        (self.result, self.span_count)
    }
}

use federator_core::instance::{InstanceOutcome, InstanceResult};
use federator_core::merger::TraceMerger;
use federator_core::trace::{Trace, TraceByIdResponse};
use federator_trace::{TraceCombiner, sort_trace};
use tracing::{debug, warn};

use crate::combiner::Combiner;
use crate::metadata::CombineMetadata;

impl Combiner {
    /// Merges the trace-by-ID answers of every instance.
    ///
    /// Failed instances are counted and listed in the metadata. Returns `None`
    /// when no instance contributed a span.
    pub fn combine_trace(
        &self,
        results: Vec<InstanceResult<Trace>>,
    ) -> (Option<Trace>, CombineMetadata) {
        let merger = TraceCombiner::new(self.config().max_size_bytes, self.config().dedupe_spans);
        self.combine_trace_with(merger, results)
    }

    /// Same as [`combine_trace`](Self::combine_trace) for v2 envelopes. Only
    /// the trace is merged; envelope metrics are dropped.
    pub fn combine_trace_v2(
        &self,
        results: Vec<InstanceResult<TraceByIdResponse>>,
    ) -> (Option<Trace>, CombineMetadata) {
        let results = results
            .into_iter()
            .map(|r| r.map_payload(|resp| resp.trace))
            .collect();
        self.combine_trace(results)
    }

    pub fn combine_trace_with<M: TraceMerger>(
        &self,
        mut merger: M,
        results: Vec<InstanceResult<Trace>>,
    ) -> (Option<Trace>, CombineMetadata) {
        self.in_scope(|| {
            let mut meta = CombineMetadata::new(results.len());

            for InstanceResult { instance, outcome } in results {
                match outcome {
                    InstanceOutcome::Error { cause } => {
                        warn!(instance = %instance, error = %cause, "instance failed to return trace");
                        meta.instances_failed += 1;
                        meta.record_error(&instance, cause);
                    }
                    InstanceOutcome::NotFound => {
                        debug!(instance = %instance, "trace not found on instance");
                        meta.instances_responded += 1;
                        meta.instances_not_found += 1;
                    }
                    InstanceOutcome::Success { payload } => {
                        meta.instances_responded += 1;
                        let Some(trace) = payload.filter(|t| !t.is_empty()) else {
                            debug!(instance = %instance, "instance returned an empty trace");
                            meta.instances_not_found += 1;
                            continue;
                        };
                        meta.instances_with_trace += 1;
                        match merger.consume(trace) {
                            Ok(spans) => meta.total_spans += spans,
                            Err(e) => {
                                warn!(instance = %instance, error = %e, "failed to merge trace");
                                meta.record_error(&instance, format_args!("consume error: {e}"));
                            }
                        }
                    }
                }
            }

            meta.partial_response = meta.instances_failed > 0;

            let (mut trace, span_count) = merger.finish();
            if span_count > 0 {
                meta.total_spans = span_count;
            }
            if trace.span_count() == 0 {
                return (None, meta);
            }

            sort_trace(&mut trace);
            (Some(trace), meta)
        })
    }
}

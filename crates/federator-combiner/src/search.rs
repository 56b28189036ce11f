use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use federator_core::instance::{InstanceOutcome, InstanceResult};
use federator_core::search::{SearchMetrics, SearchResponse, SpanSet, TraceSearchMetadata};
use tracing::{debug, warn};

use crate::combiner::Combiner;
use crate::metadata::SearchMetadata;

impl Combiner {
    /// Merges search results from every instance into one response, newest
    /// traces first.
    ///
    /// An instance answering not-found counts as failed here, unlike in the
    /// trace-by-ID path.
    pub fn combine_search(
        &self,
        results: Vec<InstanceResult<SearchResponse>>,
    ) -> (SearchResponse, SearchMetadata) {
        self.in_scope(|| {
            let mut meta = SearchMetadata::new(results.len());
            let mut by_id: HashMap<String, TraceSearchMetadata> = HashMap::new();
            let mut metrics = SearchMetrics::default();

            for InstanceResult { instance, outcome } in results {
                match outcome {
                    InstanceOutcome::Error { cause } => {
                        warn!(instance = %instance, error = %cause, "instance failed to search");
                        meta.record_failure(&instance, cause);
                    }
                    InstanceOutcome::NotFound => {
                        warn!(instance = %instance, "search endpoint not found on instance");
                        meta.record_failure(&instance, "not found");
                    }
                    InstanceOutcome::Success { payload } => {
                        meta.instances_responded += 1;
                        let Some(response) = payload else {
                            debug!(instance = %instance, "instance returned an empty search response");
                            continue;
                        };
                        if let Some(m) = &response.metrics {
                            metrics += m;
                        }
                        for trace in response.traces {
                            match by_id.entry(trace.trace_id.clone()) {
                                Entry::Occupied(mut existing) => {
                                    combine_search_results(existing.get_mut(), trace)
                                }
                                Entry::Vacant(slot) => {
                                    slot.insert(trace);
                                }
                            }
                        }
                    }
                }
            }

            let mut traces: Vec<TraceSearchMetadata> = by_id.into_values().collect();
            traces.sort_by(|a, b| {
                b.start_time_unix_nano
                    .cmp(&a.start_time_unix_nano)
                    .then_with(|| a.trace_id.cmp(&b.trace_id))
            });
            let limit = self.config().search_limit;
            if limit > 0 && traces.len() > limit {
                debug!(found = traces.len(), limit, "truncating search results");
                traces.truncate(limit);
            }

            let response = SearchResponse {
                traces,
                metrics: Some(metrics),
            };
            (response, meta)
        })
    }
}

/// Identity of a span set within one trace.
#[derive(Debug, PartialEq, Eq, Hash)]
enum SpanSetKey {
    FirstSpan(String),
    Matched(u32),
}

impl SpanSetKey {
    fn of(ss: &SpanSet) -> Self {
        match ss.spans.first() {
            Some(span) => Self::FirstSpan(span.span_id.clone()),
            None => Self::Matched(ss.matched),
        }
    }
}

/// Folds `incoming` into `existing`, both describing the same trace.
///
/// Names keep the first non-empty value, the start time keeps the earliest,
/// the duration the longest. Service stats take the per-field maximum, since
/// each instance may only see part of the trace.
pub fn combine_search_results(existing: &mut TraceSearchMetadata, incoming: TraceSearchMetadata) {
    if existing.trace_id.is_empty() {
        existing.trace_id = incoming.trace_id;
    }
    if existing.root_service_name.is_empty() {
        existing.root_service_name = incoming.root_service_name;
    }
    if existing.root_trace_name.is_empty() {
        existing.root_trace_name = incoming.root_trace_name;
    }

    // zero means unset
    if existing.start_time_unix_nano == 0
        || incoming.start_time_unix_nano < existing.start_time_unix_nano
    {
        existing.start_time_unix_nano = incoming.start_time_unix_nano;
    }
    if existing.duration_ms == 0 || incoming.duration_ms > existing.duration_ms {
        existing.duration_ms = incoming.duration_ms;
    }

    for (service, stats) in incoming.service_stats {
        let entry = existing.service_stats.entry(service).or_default();
        entry.span_count = entry.span_count.max(stats.span_count);
        entry.error_count = entry.error_count.max(stats.error_count);
    }

    let mut seen: HashSet<SpanSetKey> = existing.span_sets.iter().map(SpanSetKey::of).collect();
    for ss in incoming.span_sets {
        if seen.insert(SpanSetKey::of(&ss)) {
            existing.span_sets.push(ss);
        }
    }
    if let Some(first) = existing.span_sets.first() {
        existing.span_set = Some(first.clone());
    }
}

use std::collections::HashMap;
use std::ops::AddAssign;

use serde::{Deserialize, Deserializer, Serialize};

use crate::trace::KeyValue;

/// Span summary carried inside a search result span set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchSpan {
    #[serde(rename = "spanID", default)]
    pub span_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub start_time_unix_nano: u64,
    #[serde(default)]
    pub duration_nanos: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

/// Spans of one trace that matched a query, plus the match count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpanSet {
    #[serde(default)]
    pub spans: Vec<SearchSpan>,
    #[serde(default)]
    pub matched: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<KeyValue>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStats {
    #[serde(default)]
    pub span_count: u32,
    #[serde(default)]
    pub error_count: u32,
}

/// One trace in a search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceSearchMetadata {
    #[serde(rename = "traceID", default)]
    pub trace_id: String,
    #[serde(default)]
    pub root_service_name: String,
    #[serde(default)]
    pub root_trace_name: String,
    #[serde(default)]
    pub start_time_unix_nano: u64,
    #[serde(default)]
    pub duration_ms: u32,
    /// Deprecated single span set, still read by older clients. Mirrors the
    /// first entry of `span_sets`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span_set: Option<SpanSet>,
    #[serde(default)]
    pub span_sets: Vec<SpanSet>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub service_stats: HashMap<String, ServiceStats>,
}

/// Work counters reported by a search. Every field is an instance-local total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetrics {
    #[serde(default)]
    pub inspected_traces: u32,
    #[serde(default)]
    pub inspected_bytes: u64,
    #[serde(default)]
    pub total_blocks: u32,
    #[serde(default)]
    pub completed_jobs: u32,
    #[serde(default)]
    pub total_jobs: u32,
    #[serde(default)]
    pub total_block_bytes: u64,
    #[serde(default)]
    pub inspected_spans: u64,
}

/// Counters saturate instead of overflowing.
impl AddAssign<&SearchMetrics> for SearchMetrics {
    fn add_assign(&mut self, rhs: &SearchMetrics) {
        self.inspected_traces = self.inspected_traces.saturating_add(rhs.inspected_traces);
        self.inspected_bytes = self.inspected_bytes.saturating_add(rhs.inspected_bytes);
        self.total_blocks = self.total_blocks.saturating_add(rhs.total_blocks);
        self.completed_jobs = self.completed_jobs.saturating_add(rhs.completed_jobs);
        self.total_jobs = self.total_jobs.saturating_add(rhs.total_jobs);
        self.total_block_bytes = self.total_block_bytes.saturating_add(rhs.total_block_bytes);
        self.inspected_spans = self.inspected_spans.saturating_add(rhs.inspected_spans);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Null entries sent by an instance are dropped while decoding.
    #[serde(default, deserialize_with = "skip_nulls")]
    pub traces: Vec<TraceSearchMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SearchMetrics>,
}

fn skip_nulls<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}

use std::io;
use std::sync::{Arc, Mutex};

use federator_combiner::{Combiner, CombinerConfig};
use federator_core::instance::InstanceResult;
use federator_core::search::{SearchResponse, TraceSearchMetadata};
use federator_core::tags::{SearchTagValuesV2Response, SearchTagsResponse, TagValue};
use federator_core::trace::Trace;
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Log sink shared between the subscriber and the test.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn search_hit(trace_id: &str) -> TraceSearchMetadata {
    TraceSearchMetadata {
        trace_id: trace_id.to_string(),
        root_service_name: "svc1".to_string(),
        start_time_unix_nano: 1_000_000_000,
        duration_ms: 100,
        ..Default::default()
    }
}

#[test]
fn test_search_same_trace_from_two_instances() {
    let results = vec![
        InstanceResult::success(
            "instance-a",
            SearchResponse {
                traces: vec![search_hit("abc123")],
                metrics: None,
            },
        ),
        InstanceResult::success(
            "instance-b",
            SearchResponse {
                traces: vec![search_hit("abc123")],
                metrics: None,
            },
        ),
    ];

    let (resp, meta) = Combiner::default().combine_search(results);

    assert_eq!(meta.instances_responded, 2);
    assert_eq!(meta.instances_failed, 0);
    assert_eq!(resp.traces.len(), 1);
    let trace = &resp.traces[0];
    assert_eq!(trace.trace_id, "abc123");
    assert_eq!(trace.root_service_name, "svc1");
    assert_eq!(trace.start_time_unix_nano, 1_000_000_000);
    assert_eq!(trace.duration_ms, 100);
}

#[test]
fn test_tag_values_v2_two_instances() {
    let results = vec![
        InstanceResult::success(
            "instance-a",
            SearchTagValuesV2Response {
                tag_values: vec![TagValue::new("string", "val1")],
                metrics: None,
            },
        ),
        InstanceResult::success(
            "instance-b",
            SearchTagValuesV2Response {
                tag_values: vec![
                    TagValue::new("string", "val1"),
                    TagValue::new("string", "val2"),
                ],
                metrics: None,
            },
        ),
    ];

    let resp = Combiner::default().combine_tag_values_v2(results);

    assert_eq!(
        resp.tag_values,
        vec![
            TagValue::new("string", "val1"),
            TagValue::new("string", "val2"),
        ]
    );
}

#[test]
fn test_trace_results_decoded_from_json() {
    let input = r#"[
        {"instance": "a", "status": "success", "payload": {"resourceSpans": [{
            "resource": {},
            "scopeSpans": [{"scope": {"name": "http"}, "spans": [
                {"traceId": "0102030405060708090a0b0c0d0e0f10", "spanId": "0000000000000002",
                 "parentSpanId": "0000000000000001", "name": "child", "startTimeUnixNano": 20},
                {"traceId": "0102030405060708090a0b0c0d0e0f10", "spanId": "0000000000000001",
                 "name": "root", "startTimeUnixNano": 10}
            ]}]
        }]}},
        {"instance": "b", "status": "success", "payload": {"resourceSpans": [{
            "scopeSpans": [{"spans": [
                {"traceId": "0102030405060708090a0b0c0d0e0f10", "spanId": "0000000000000001",
                 "name": "root", "startTimeUnixNano": 10}
            ]}]
        }]}},
        {"instance": "c", "status": "not_found"},
        {"instance": "d", "status": "error", "cause": "context deadline exceeded"}
    ]"#;
    let results: Vec<InstanceResult<Trace>> = serde_json::from_str(input).unwrap();

    let (trace, meta) = Combiner::default().combine_trace(results);

    let trace = trace.unwrap();
    let names: Vec<&str> = trace.spans().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["root", "child"]);
    assert_eq!(meta.instances_queried, 4);
    assert_eq!(meta.instances_responded, 3);
    assert_eq!(meta.instances_with_trace, 2);
    assert_eq!(meta.instances_not_found, 1);
    assert_eq!(meta.instances_failed, 1);
    assert_eq!(meta.total_spans, 2);
    assert!(meta.partial_response);
    assert_eq!(meta.errors, vec!["d: context deadline exceeded".to_string()]);
}

#[test]
fn test_tags_union_across_many_instances() {
    let sets: [&[&str]; 4] = [
        &["service.name", "http.method"],
        &["http.method", "http.status_code"],
        &[],
        &["db.system", "service.name"],
    ];
    let results = sets
        .iter()
        .enumerate()
        .map(|(i, names)| {
            InstanceResult::success(
                format!("instance-{i}"),
                SearchTagsResponse {
                    tag_names: names.iter().map(|s| s.to_string()).collect(),
                    metrics: None,
                },
            )
        })
        .collect();

    let resp = Combiner::default().combine_tags(results);

    assert_eq!(
        resp.tag_names,
        vec!["db.system", "http.method", "http.status_code", "service.name"]
    );
}

#[test]
fn test_injected_dispatch_receives_diagnostics() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_env_filter(EnvFilter::new("debug"))
        .with_ansi(false)
        .finish();
    let combiner = Combiner::new(CombinerConfig::default()).with_dispatch(Dispatch::new(subscriber));

    let results: Vec<InstanceResult<SearchResponse>> = vec![
        InstanceResult::error("instance-b", "connection refused"),
        InstanceResult::not_found("instance-c"),
    ];
    let (_, meta) = combiner.combine_search(results);

    assert_eq!(meta.instances_failed, 2);
    let output = logs.contents();
    assert!(output.contains("instance failed to search"), "{output}");
    assert!(output.contains("instance-b"), "{output}");
    assert!(output.contains("connection refused"), "{output}");
    assert!(output.contains("instance-c"), "{output}");
}

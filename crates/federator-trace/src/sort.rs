use federator_core::trace::{ResourceSpans, ScopeSpans, Trace};

/// Puts a merged trace into canonical order: spans by start time then span
/// id, and every scope and resource group by the start of its first span.
pub fn sort_trace(trace: &mut Trace) {
    for rs in &mut trace.resource_spans {
        for ss in &mut rs.scope_spans {
            ss.spans.sort_by(|a, b| {
                a.start_time_unix_nano
                    .cmp(&b.start_time_unix_nano)
                    .then_with(|| a.span_id.cmp(&b.span_id))
            });
        }
        rs.scope_spans.sort_by_key(scope_start);
    }
    trace.resource_spans.sort_by_key(resource_start);
}

fn scope_start(ss: &ScopeSpans) -> u64 {
    ss.spans.first().map_or(0, |s| s.start_time_unix_nano)
}

fn resource_start(rs: &ResourceSpans) -> u64 {
    rs.scope_spans.first().map_or(0, scope_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use federator_core::trace::{
        InstrumentationScope, Resource, Span, SpanId, SpanKind, TraceId,
    };

    fn span(id: u8, start: u64) -> Span {
        Span {
            trace_id: TraceId([9u8; 16]),
            span_id: SpanId([id; 8]),
            parent_span_id: None,
            name: format!("span-{id}"),
            kind: SpanKind::Internal,
            start_time_unix_nano: start,
            end_time_unix_nano: start + 1,
            attributes: Vec::new(),
            status: None,
        }
    }

    fn scope(name: &str, spans: Vec<Span>) -> ScopeSpans {
        ScopeSpans {
            scope: InstrumentationScope {
                name: name.to_string(),
                version: String::new(),
            },
            spans,
        }
    }

    #[test]
    fn test_spans_sorted_by_start_then_id() {
        let mut trace = Trace {
            resource_spans: vec![ResourceSpans {
                resource: Resource::default(),
                scope_spans: vec![scope("a", vec![span(3, 20), span(2, 10), span(1, 20)])],
            }],
        };
        sort_trace(&mut trace);

        let ids: Vec<u8> = trace.spans().map(|s| s.span_id.0[0]).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_groups_sorted_by_first_span() {
        let mut trace = Trace {
            resource_spans: vec![
                ResourceSpans {
                    resource: Resource::default(),
                    scope_spans: vec![scope("late", vec![span(5, 500)])],
                },
                ResourceSpans {
                    resource: Resource::default(),
                    scope_spans: vec![
                        scope("b", vec![span(4, 300)]),
                        scope("a", vec![span(6, 600), span(1, 100)]),
                    ],
                },
            ],
        };
        sort_trace(&mut trace);

        assert_eq!(trace.resource_spans[0].scope_spans[0].scope.name, "a");
        assert_eq!(trace.resource_spans[0].scope_spans[1].scope.name, "b");
        assert_eq!(trace.resource_spans[1].scope_spans[0].scope.name, "late");

        let starts: Vec<u64> = trace.spans().map(|s| s.start_time_unix_nano).collect();
        assert_eq!(starts, vec![100, 600, 300, 500]);
    }
}

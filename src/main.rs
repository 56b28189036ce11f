use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{Parser, ValueEnum};
use federator_combiner::{Combiner, CombinerConfig};
use federator_core::instance::InstanceResult;
use federator_core::search::SearchResponse;
use federator_core::tags::{
    SearchTagValuesResponse, SearchTagValuesV2Response, SearchTagsResponse, SearchTagsV2Response,
};
use federator_core::trace::{Trace, TraceByIdResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Dispatch, info};

// ─────────────────────────────────────────────────────────────────────────────
// CLI
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QueryKind {
    /// Trace-by-ID results (`[InstanceResult<Trace>]`).
    Trace,
    /// Trace-by-ID v2 envelopes (`[InstanceResult<TraceByIdResponse>]`).
    TraceV2,
    /// Search results.
    Search,
    /// Tag names.
    Tags,
    /// Tag names grouped by scope.
    TagsV2,
    /// Tag values.
    TagValues,
    /// Typed tag values.
    TagValuesV2,
}

#[derive(Debug, Clone, Default, ValueEnum)]
enum OutputMode {
    /// Indented JSON (default).
    #[default]
    Pretty,
    /// A single line of JSON.
    Compact,
}

#[derive(Parser)]
#[command(
    name = "federator",
    about = "Merge per-instance query results from federated tracing backends",
    version
)]
struct Cli {
    /// Which query the results answer.
    #[arg(short, long, value_enum)]
    kind: QueryKind,

    /// JSON array of per-instance results. `-` reads stdin.
    #[arg(short, long, default_value = "-", value_name = "PATH")]
    input: PathBuf,

    /// Byte ceiling for a merged trace (0 = unlimited).
    /// Overrides FEDERATOR_MAX_TRACE_BYTES.
    #[arg(long, value_name = "BYTES")]
    max_trace_bytes: Option<usize>,

    /// Keep spans that several instances returned more than once.
    #[arg(long)]
    no_dedupe: bool,

    /// Maximum number of traces in a search response (0 = unlimited).
    /// Overrides FEDERATOR_SEARCH_LIMIT.
    #[arg(long, value_name = "N")]
    search_limit: Option<usize>,

    /// Byte budget for distinct tag names or values (0 = unlimited).
    /// Overrides FEDERATOR_MAX_TAG_BYTES.
    #[arg(long, value_name = "BYTES")]
    max_tag_bytes: Option<usize>,

    /// Maximum number of distinct tag names or values (0 = unlimited).
    /// Overrides FEDERATOR_MAX_TAG_VALUES.
    #[arg(long, value_name = "N")]
    max_tag_values: Option<usize>,

    /// Output formatting.
    #[arg(short, long, value_enum, default_value = "pretty")]
    output: OutputMode,
}

impl Cli {
    /// Layers command-line flags over the environment configuration.
    fn combiner_config(&self, mut config: CombinerConfig) -> CombinerConfig {
        if let Some(bytes) = self.max_trace_bytes {
            config.max_size_bytes = bytes;
        }
        if self.no_dedupe {
            config.dedupe_spans = false;
        }
        if let Some(limit) = self.search_limit {
            config.search_limit = limit;
        }
        if let Some(bytes) = self.max_tag_bytes {
            config.max_tag_bytes = bytes;
        }
        if let Some(values) = self.max_tag_values {
            config.max_tag_values = values;
        }
        config
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Combine
// ─────────────────────────────────────────────────────────────────────────────

/// Merged response, plus bookkeeping for the query kinds that keep it.
#[derive(Serialize)]
struct CombinedOutput<R, M> {
    response: R,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<M>,
}

fn render<R: Serialize, M: Serialize>(
    response: R,
    metadata: Option<M>,
) -> anyhow::Result<serde_json::Value> {
    Ok(serde_json::to_value(CombinedOutput { response, metadata })?)
}

fn decode<T: DeserializeOwned>(input: &str) -> anyhow::Result<Vec<InstanceResult<T>>> {
    match serde_json::from_str(input) {
        Ok(results) => Ok(results),
        Err(e) => bail!("invalid instance results: {e}"),
    }
}

fn run_combine(
    combiner: &Combiner,
    kind: QueryKind,
    input: &str,
) -> anyhow::Result<serde_json::Value> {
    match kind {
        QueryKind::Trace => {
            let (trace, meta) = combiner.combine_trace(decode::<Trace>(input)?);
            render(trace, Some(meta))
        }
        QueryKind::TraceV2 => {
            let (trace, meta) = combiner.combine_trace_v2(decode::<TraceByIdResponse>(input)?);
            render(trace, Some(meta))
        }
        QueryKind::Search => {
            let (resp, meta) = combiner.combine_search(decode::<SearchResponse>(input)?);
            render(resp, Some(meta))
        }
        QueryKind::Tags => {
            let resp = combiner.combine_tags(decode::<SearchTagsResponse>(input)?);
            render(resp, None::<()>)
        }
        QueryKind::TagsV2 => {
            let resp = combiner.combine_tags_v2(decode::<SearchTagsV2Response>(input)?);
            render(resp, None::<()>)
        }
        QueryKind::TagValues => {
            let resp = combiner.combine_tag_values(decode::<SearchTagValuesResponse>(input)?);
            render(resp, None::<()>)
        }
        QueryKind::TagValuesV2 => {
            let resp = combiner.combine_tag_values_v2(decode::<SearchTagValuesV2Response>(input)?);
            render(resp, None::<()>)
        }
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(contents),
        Err(e) => bail!("failed to read {}: {e}", path.display()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("federator=info".parse()?),
        )
        .finish();
    let dispatch = Dispatch::new(subscriber);

    let cli = Cli::parse();
    tracing::dispatcher::with_default(&dispatch, || run(cli, dispatch.clone()))
}

fn run(cli: Cli, dispatch: Dispatch) -> anyhow::Result<()> {
    let config = cli.combiner_config(CombinerConfig::from_env()?);
    info!(
        kind = ?cli.kind,
        max_trace_bytes = config.max_size_bytes,
        dedupe = config.dedupe_spans,
        search_limit = config.search_limit,
        max_tag_bytes = config.max_tag_bytes,
        max_tag_values = config.max_tag_values,
        "combining instance results"
    );
    let combiner = Combiner::new(config).with_dispatch(dispatch);

    let input = read_input(&cli.input)?;
    let output = run_combine(&combiner, cli.kind, &input)?;

    match cli.output {
        OutputMode::Pretty => println!("{}", serde_json::to_string_pretty(&output)?),
        OutputMode::Compact => println!("{}", serde_json::to_string(&output)?),
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_input(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_cli_flags_override_config() {
        let cli = Cli::try_parse_from([
            "federator",
            "--kind",
            "trace-v2",
            "--max-trace-bytes",
            "4096",
            "--no-dedupe",
        ])
        .unwrap();
        assert_eq!(cli.kind, QueryKind::TraceV2);
        assert_eq!(cli.input, PathBuf::from("-"));

        let base = CombinerConfig {
            search_limit: 7,
            ..Default::default()
        };
        let config = cli.combiner_config(base);
        assert_eq!(config.max_size_bytes, 4096);
        assert!(!config.dedupe_spans);
        assert_eq!(config.search_limit, 7);
    }

    #[test]
    fn test_cli_tag_limits() {
        let cli = Cli::try_parse_from([
            "federator",
            "--kind",
            "tag-values-v2",
            "--max-tag-bytes",
            "10",
            "--max-tag-values",
            "3",
        ])
        .unwrap();
        let config = cli.combiner_config(CombinerConfig::default());
        assert_eq!(config.max_tag_bytes, 10);
        assert_eq!(config.max_tag_values, 3);

        let input = r#"[
            {"instance": "a", "status": "success", "payload": {"tagValues": [{"type": "string", "value": "v1"}]}},
            {"instance": "b", "status": "success", "payload": {"tagValues": [{"type": "string", "value": "v2"}]}}
        ]"#;
        let output = run_combine(&Combiner::new(config), cli.kind, input).unwrap();
        assert_eq!(
            output["response"]["tagValues"],
            serde_json::json!([{"type": "string", "value": "v1"}])
        );
    }

    #[test]
    fn test_search_from_file() {
        let file = write_input(
            r#"[
                {"instance": "a", "status": "success", "payload": {
                    "traces": [{"traceID": "abc123", "rootServiceName": "svc1",
                                "startTimeUnixNano": 1000000000, "durationMs": 100}],
                    "metrics": {"inspectedTraces": 3, "completedJobs": 1}
                }},
                {"instance": "b", "status": "success", "payload": {
                    "traces": [{"traceID": "abc123", "startTimeUnixNano": 900000000, "durationMs": 40}],
                    "metrics": {"inspectedTraces": 2, "completedJobs": 1}
                }},
                {"instance": "c", "status": "not_found"}
            ]"#,
        );
        let input = read_input(file.path()).unwrap();
        let output = run_combine(&Combiner::default(), QueryKind::Search, &input).unwrap();

        let traces = output["response"]["traces"].as_array().unwrap();
        assert_eq!(traces.len(), 1);
        assert_eq!(traces[0]["traceID"], "abc123");
        assert_eq!(traces[0]["rootServiceName"], "svc1");
        assert_eq!(traces[0]["startTimeUnixNano"], 900000000);
        assert_eq!(traces[0]["durationMs"], 100);
        assert_eq!(output["response"]["metrics"]["inspectedTraces"], 5);
        assert_eq!(output["response"]["metrics"]["completedJobs"], 2);
        assert_eq!(output["metadata"]["instancesResponded"], 2);
        assert_eq!(output["metadata"]["instancesFailed"], 1);
        assert_eq!(output["metadata"]["errors"][0], "c: not found");
    }

    #[test]
    fn test_tags_v2_output_has_no_metadata() {
        let file = write_input(
            r#"[
                {"instance": "a", "status": "success", "payload": {"scopes": [{"name": "span", "tags": ["b", "a"]}]}},
                {"instance": "b", "status": "error", "cause": "timeout"}
            ]"#,
        );
        let input = read_input(file.path()).unwrap();
        let output = run_combine(&Combiner::default(), QueryKind::TagsV2, &input).unwrap();

        assert_eq!(
            output["response"]["scopes"],
            serde_json::json!([{"name": "span", "tags": ["a", "b"]}])
        );
        assert!(output.get("metadata").is_none());
    }

    #[test]
    fn test_trace_not_found_everywhere_renders_null() {
        let input = r#"[{"instance": "a", "status": "not_found"}]"#;
        let output = run_combine(&Combiner::default(), QueryKind::Trace, input).unwrap();
        assert!(output["response"].is_null());
        assert_eq!(output["metadata"]["instancesNotFound"], 1);
    }

    #[test]
    fn test_invalid_input_is_an_error() {
        let err = run_combine(&Combiner::default(), QueryKind::Tags, "{").unwrap_err();
        assert!(err.to_string().starts_with("invalid instance results"));
    }

    #[test]
    fn test_missing_input_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(&dir.path().join("missing.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}

use std::fmt::Display;

use serde::Serialize;

/// Bookkeeping for a trace-by-ID combine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombineMetadata {
    pub instances_queried: usize,
    pub instances_responded: usize,
    pub instances_with_trace: usize,
    pub instances_not_found: usize,
    pub instances_failed: usize,
    pub total_spans: usize,
    pub partial_response: bool,
    /// One `"<instance>: <cause>"` line per failure, in input order.
    pub errors: Vec<String>,
}

impl CombineMetadata {
    pub fn new(instances_queried: usize) -> Self {
        Self {
            instances_queried,
            ..Default::default()
        }
    }

    pub(crate) fn record_error(&mut self, instance: &str, cause: impl Display) {
        self.errors.push(format!("{instance}: {cause}"));
    }
}

/// Bookkeeping for a search combine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMetadata {
    pub instances_queried: usize,
    pub instances_responded: usize,
    pub instances_failed: usize,
    pub errors: Vec<String>,
}

impl SearchMetadata {
    pub fn new(instances_queried: usize) -> Self {
        Self {
            instances_queried,
            ..Default::default()
        }
    }

    pub fn is_partial(&self) -> bool {
        self.instances_failed > 0
    }

    pub(crate) fn record_failure(&mut self, instance: &str, cause: impl Display) {
        self.instances_failed += 1;
        self.errors.push(format!("{instance}: {cause}"));
    }
}

use std::collections::{BTreeMap, BTreeSet};

use federator_core::instance::{InstanceOutcome, InstanceResult};
use federator_core::tags::{
    MetadataMetrics, SearchTagValuesResponse, SearchTagValuesV2Response, SearchTagsResponse,
    SearchTagsV2Response, SearchTagsV2Scope, TagValue,
};
use tracing::{debug, warn};

use crate::combiner::Combiner;
use crate::config::CombinerConfig;

/// Sums two optional metric reports. An absent side is the identity.
pub fn combine_metadata_metrics(
    existing: Option<MetadataMetrics>,
    incoming: Option<MetadataMetrics>,
) -> Option<MetadataMetrics> {
    match (existing, incoming) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Byte and count budget for the distinct entries of a merged tag response.
/// Once an entry does not fit, every later new entry is refused as well.
#[derive(Debug)]
struct TagBudget {
    max_bytes: usize,
    max_values: usize,
    bytes: usize,
    values: usize,
    exceeded: bool,
}

impl TagBudget {
    fn new(config: &CombinerConfig) -> Self {
        Self {
            max_bytes: config.max_tag_bytes,
            max_values: config.max_tag_values,
            bytes: 0,
            values: 0,
            exceeded: false,
        }
    }

    /// Accounts for a new entry of `size` bytes, returning whether it fits.
    fn admit(&mut self, size: usize) -> bool {
        if self.exceeded {
            return false;
        }
        let over_bytes = self.max_bytes > 0 && self.bytes.saturating_add(size) > self.max_bytes;
        let over_values = self.max_values > 0 && self.values >= self.max_values;
        if over_bytes || over_values {
            self.exceeded = true;
            return false;
        }
        self.bytes += size;
        self.values += 1;
        true
    }

    fn exceeded(&self) -> bool {
        self.exceeded
    }

    fn report(&self, op: &'static str) {
        if self.exceeded {
            warn!(
                op,
                bytes = self.bytes,
                values = self.values,
                max_bytes = self.max_bytes,
                max_values = self.max_values,
                "tag limit reached, response truncated"
            );
        }
    }
}

/// Inserts the entries of `incoming` not already in `set`, first seen first,
/// until `budget` runs out.
fn collect_within(set: &mut BTreeSet<String>, incoming: Vec<String>, budget: &mut TagBudget) {
    for entry in incoming {
        if set.contains(&entry) {
            continue;
        }
        if !budget.admit(entry.len()) {
            return;
        }
        set.insert(entry);
    }
}

/// Feeds every usable payload to `merge`. Failed, not-found and empty
/// answers contribute nothing.
fn for_each_payload<T>(op: &'static str, results: Vec<InstanceResult<T>>, mut merge: impl FnMut(T)) {
    for InstanceResult { instance, outcome } in results {
        match outcome {
            InstanceOutcome::Error { cause } => {
                warn!(instance = %instance, error = %cause, op, "instance failed, skipping");
            }
            InstanceOutcome::NotFound => {
                debug!(instance = %instance, op, "not found on instance");
            }
            InstanceOutcome::Success { payload: None } => {
                debug!(instance = %instance, op, "instance returned an empty response");
            }
            InstanceOutcome::Success {
                payload: Some(payload),
            } => merge(payload),
        }
    }
}

impl Combiner {
    /// Sorted union of tag names. When the tag budget runs out the names
    /// collected so far are kept and later ones dropped.
    pub fn combine_tags(&self, results: Vec<InstanceResult<SearchTagsResponse>>) -> SearchTagsResponse {
        self.in_scope(|| {
            let mut budget = TagBudget::new(self.config());
            let mut names = BTreeSet::new();
            let mut metrics = None;
            for_each_payload("tags", results, |resp| {
                metrics = combine_metadata_metrics(metrics, resp.metrics);
                collect_within(&mut names, resp.tag_names, &mut budget);
            });
            budget.report("tags");
            SearchTagsResponse {
                tag_names: names.into_iter().collect(),
                metrics,
            }
        })
    }

    /// The tag budget is shared by all scopes.
    pub fn combine_tags_v2(
        &self,
        results: Vec<InstanceResult<SearchTagsV2Response>>,
    ) -> SearchTagsV2Response {
        self.in_scope(|| {
            let mut budget = TagBudget::new(self.config());
            let mut scopes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            let mut metrics = None;
            for_each_payload("tags_v2", results, |resp| {
                metrics = combine_metadata_metrics(metrics, resp.metrics);
                for scope in resp.scopes {
                    if budget.exceeded() {
                        break;
                    }
                    let is_new = !scopes.contains_key(&scope.name);
                    let tags = scopes.entry(scope.name.clone()).or_default();
                    collect_within(tags, scope.tags, &mut budget);
                    if is_new && tags.is_empty() && budget.exceeded() {
                        scopes.remove(&scope.name);
                    }
                }
            });
            budget.report("tags_v2");
            SearchTagsV2Response {
                scopes: scopes
                    .into_iter()
                    .map(|(name, tags)| SearchTagsV2Scope {
                        name,
                        tags: tags.into_iter().collect(),
                    })
                    .collect(),
                metrics,
            }
        })
    }

    pub fn combine_tag_values(
        &self,
        results: Vec<InstanceResult<SearchTagValuesResponse>>,
    ) -> SearchTagValuesResponse {
        self.in_scope(|| {
            let mut budget = TagBudget::new(self.config());
            let mut values = BTreeSet::new();
            let mut metrics = None;
            for_each_payload("tag_values", results, |resp| {
                metrics = combine_metadata_metrics(metrics, resp.metrics);
                collect_within(&mut values, resp.tag_values, &mut budget);
            });
            budget.report("tag_values");
            SearchTagValuesResponse {
                tag_values: values.into_iter().collect(),
                metrics,
            }
        })
    }

    /// Values are keyed by their string; when two instances disagree on the
    /// type of a value the first one seen is kept. A value costs the bytes
    /// of its string plus its type name.
    pub fn combine_tag_values_v2(
        &self,
        results: Vec<InstanceResult<SearchTagValuesV2Response>>,
    ) -> SearchTagValuesV2Response {
        self.in_scope(|| {
            let mut budget = TagBudget::new(self.config());
            let mut values: BTreeMap<String, String> = BTreeMap::new();
            let mut metrics = None;
            for_each_payload("tag_values_v2", results, |resp| {
                metrics = combine_metadata_metrics(metrics, resp.metrics);
                for tv in resp.tag_values {
                    if values.contains_key(&tv.value) {
                        continue;
                    }
                    if !budget.admit(tv.value.len() + tv.value_type.len()) {
                        break;
                    }
                    values.insert(tv.value, tv.value_type);
                }
            });
            budget.report("tag_values_v2");
            SearchTagValuesV2Response {
                tag_values: values
                    .into_iter()
                    .map(|(value, value_type)| TagValue { value_type, value })
                    .collect(),
                metrics,
            }
        })
    }
}

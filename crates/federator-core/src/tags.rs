use std::ops::Add;

use serde::{Deserialize, Serialize};

/// Block/job counters reported by tag lookups. Additive across instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataMetrics {
    #[serde(default)]
    pub total_blocks: u32,
    #[serde(default)]
    pub total_jobs: u32,
    #[serde(default)]
    pub completed_jobs: u32,
    #[serde(default)]
    pub total_block_bytes: u64,
}

impl Add for MetadataMetrics {
    type Output = MetadataMetrics;

    fn add(self, rhs: MetadataMetrics) -> MetadataMetrics {
        MetadataMetrics {
            total_blocks: self.total_blocks.saturating_add(rhs.total_blocks),
            total_jobs: self.total_jobs.saturating_add(rhs.total_jobs),
            completed_jobs: self.completed_jobs.saturating_add(rhs.completed_jobs),
            total_block_bytes: self.total_block_bytes.saturating_add(rhs.total_block_bytes),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTagsResponse {
    #[serde(default)]
    pub tag_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetadataMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTagsV2Scope {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTagsV2Response {
    #[serde(default)]
    pub scopes: Vec<SearchTagsV2Scope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetadataMetrics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTagValuesResponse {
    #[serde(default)]
    pub tag_values: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetadataMetrics>,
}

/// A tag value together with its attribute type (`"string"`, `"int"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagValue {
    #[serde(rename = "type", default)]
    pub value_type: String,
    #[serde(default)]
    pub value: String,
}

impl TagValue {
    pub fn new(value_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            value_type: value_type.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchTagValuesV2Response {
    #[serde(default)]
    pub tag_values: Vec<TagValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetadataMetrics>,
}

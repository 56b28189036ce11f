use std::env;
use std::str::FromStr;

use federator_core::error::ConfigError;

pub const ENV_MAX_TRACE_BYTES: &str = "FEDERATOR_MAX_TRACE_BYTES";
pub const ENV_DEDUPE_SPANS: &str = "FEDERATOR_DEDUPE_SPANS";
pub const ENV_SEARCH_LIMIT: &str = "FEDERATOR_SEARCH_LIMIT";
pub const ENV_MAX_TAG_BYTES: &str = "FEDERATOR_MAX_TAG_BYTES";
pub const ENV_MAX_TAG_VALUES: &str = "FEDERATOR_MAX_TAG_VALUES";

/// Read-only settings shared by every combine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinerConfig {
    /// Byte ceiling for a merged trace. 0 means unlimited.
    pub max_size_bytes: usize,
    /// Drop spans already received from another instance.
    pub dedupe_spans: bool,
    /// Maximum number of traces in a merged search response. 0 means unlimited.
    pub search_limit: usize,
    /// Byte budget for the distinct names or values in a merged tag
    /// response. 0 means unlimited.
    pub max_tag_bytes: usize,
    /// Maximum number of distinct names or values in a merged tag response.
    /// 0 means unlimited.
    pub max_tag_values: usize,
}

impl Default for CombinerConfig {
    fn default() -> Self {
        Self {
            max_size_bytes: 0,
            dedupe_spans: true,
            search_limit: 0,
            max_tag_bytes: 0,
            max_tag_values: 0,
        }
    }
}

impl CombinerConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_size_bytes =
            parse_var(&lookup, ENV_MAX_TRACE_BYTES)?.unwrap_or(defaults.max_size_bytes);
        let search_limit = parse_var(&lookup, ENV_SEARCH_LIMIT)?.unwrap_or(defaults.search_limit);
        let max_tag_bytes =
            parse_var(&lookup, ENV_MAX_TAG_BYTES)?.unwrap_or(defaults.max_tag_bytes);
        let max_tag_values =
            parse_var(&lookup, ENV_MAX_TAG_VALUES)?.unwrap_or(defaults.max_tag_values);
        let dedupe_spans = match lookup(ENV_DEDUPE_SPANS) {
            Some(val) => parse_bool(ENV_DEDUPE_SPANS, &val)?,
            None => defaults.dedupe_spans,
        };

        Ok(Self {
            max_size_bytes,
            dedupe_spans,
            search_limit,
            max_tag_bytes,
            max_tag_values,
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| {
            ConfigError::Invalid(format!(
                "{key} must be a non-negative integer, got '{raw}'"
            ))
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ConfigError::Invalid(format!(
            "{key} must be true or false, got '{raw}'"
        ))),
    }
}

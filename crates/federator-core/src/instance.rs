use serde::{Deserialize, Serialize};

/// How a single federated instance answered one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstanceOutcome<T> {
    /// The instance answered. The payload is authoritative, and may be absent
    /// or empty.
    Success { payload: Option<T> },
    /// The instance reported that it has no such trace or tag (404).
    NotFound,
    /// Transport or processing failure.
    Error { cause: String },
}

/// One instance's result, as handed over by the fan-out layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceResult<T> {
    pub instance: String,
    #[serde(flatten)]
    pub outcome: InstanceOutcome<T>,
}

impl<T> InstanceResult<T> {
    pub fn success(instance: impl Into<String>, payload: T) -> Self {
        Self {
            instance: instance.into(),
            outcome: InstanceOutcome::Success {
                payload: Some(payload),
            },
        }
    }

    /// Successful response with no body.
    pub fn empty(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            outcome: InstanceOutcome::Success { payload: None },
        }
    }

    pub fn not_found(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
            outcome: InstanceOutcome::NotFound,
        }
    }

    pub fn error(instance: impl Into<String>, cause: impl ToString) -> Self {
        Self {
            instance: instance.into(),
            outcome: InstanceOutcome::Error {
                cause: cause.to_string(),
            },
        }
    }

    /// Replaces a successful payload, keeping the instance and outcome.
    /// Returning `None` turns the payload into an empty response.
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> Option<U>) -> InstanceResult<U> {
        let outcome = match self.outcome {
            InstanceOutcome::Success { payload } => InstanceOutcome::Success {
                payload: payload.and_then(f),
            },
            InstanceOutcome::NotFound => InstanceOutcome::NotFound,
            InstanceOutcome::Error { cause } => InstanceOutcome::Error { cause },
        };
        InstanceResult {
            instance: self.instance,
            outcome,
        }
    }
}

use tracing::Dispatch;

use crate::config::CombinerConfig;

/// Merges per-instance results of one federated query into a single response.
///
/// Holds only read-only settings, so one value can serve concurrent requests.
/// Diagnostics go to the injected [`Dispatch`] when one is set, and to the
/// caller's current subscriber otherwise.
#[derive(Debug, Clone, Default)]
pub struct Combiner {
    config: CombinerConfig,
    dispatch: Option<Dispatch>,
}

impl Combiner {
    pub fn new(config: CombinerConfig) -> Self {
        Self {
            config,
            dispatch: None,
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn config(&self) -> &CombinerConfig {
        &self.config
    }

    pub(crate) fn in_scope<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, f),
            None => f(),
        }
    }
}

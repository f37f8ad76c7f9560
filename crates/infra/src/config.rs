//! Engine configuration.
//!
//! Every setting has a default; `from_env` only overrides what is set and
//! parses. A value that does not parse is logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

pub const ENV_MAX_ATTEMPTS: &str = "STOCKROOM_MAX_ATTEMPTS";
pub const ENV_RETRY_BASE_MS: &str = "STOCKROOM_RETRY_BASE_MS";
pub const ENV_RETRY_MAX_MS: &str = "STOCKROOM_RETRY_MAX_MS";
pub const ENV_PROPAGATE_ON_EDIT: &str = "STOCKROOM_PROPAGATE_ON_EDIT";

/// When ingredient cost changes are pushed into composite products.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostPropagationPolicy {
    /// Only purchase creation recomputes composite costs.
    #[default]
    OnCreateOnly,
    /// Purchase edits recompute them as well.
    OnCreateAndEdit,
}

impl CostPropagationPolicy {
    pub fn propagates_on_edit(self) -> bool {
        matches!(self, CostPropagationPolicy::OnCreateAndEdit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub retry: RetryPolicy,
    pub cost_propagation: CostPropagationPolicy,
}

impl EngineConfig {
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cost_propagation(mut self, policy: CostPropagationPolicy) -> Self {
        self.cost_propagation = policy;
        self
    }

    /// Defaults overridden by the `STOCKROOM_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = RetryPolicy::default();

        let max_attempts = parse_or(&lookup, ENV_MAX_ATTEMPTS, defaults.max_attempts);
        let base_ms = parse_or(&lookup, ENV_RETRY_BASE_MS, millis(defaults.base_delay));
        let max_ms = parse_or(&lookup, ENV_RETRY_MAX_MS, millis(defaults.max_delay));
        let propagate_on_edit = parse_or(&lookup, ENV_PROPAGATE_ON_EDIT, false);

        Self {
            retry: RetryPolicy::exponential(
                max_attempts,
                Duration::from_millis(base_ms),
                Duration::from_millis(max_ms),
            ),
            cost_propagation: if propagate_on_edit {
                CostPropagationPolicy::OnCreateAndEdit
            } else {
                CostPropagationPolicy::OnCreateOnly
            },
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> T
where
    T: FromStr + core::fmt::Debug,
{
    match lookup(name) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(variable = name, value = %raw, ?default, "unparsable setting; using default");
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[]));
        assert_eq!(config, EngineConfig::default());
        assert!(!config.cost_propagation.propagates_on_edit());
    }

    #[test]
    fn variables_override_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MAX_ATTEMPTS, "8"),
            (ENV_RETRY_BASE_MS, "1"),
            (ENV_RETRY_MAX_MS, "4"),
            (ENV_PROPAGATE_ON_EDIT, "true"),
        ]));
        assert_eq!(config.retry.max_attempts, 8);
        assert_eq!(config.retry.base_delay, Duration::from_millis(1));
        assert_eq!(config.retry.max_delay, Duration::from_millis(4));
        assert_eq!(config.cost_propagation, CostPropagationPolicy::OnCreateAndEdit);
    }

    #[test]
    fn garbage_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_MAX_ATTEMPTS, "lots"),
            (ENV_PROPAGATE_ON_EDIT, "maybe"),
        ]));
        assert_eq!(config.retry.max_attempts, RetryPolicy::default().max_attempts);
        assert_eq!(config.cost_propagation, CostPropagationPolicy::OnCreateOnly);
    }
}

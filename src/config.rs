//! Hyperslabs global configuration options.

use std::sync::{OnceLock, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::decomposition::PartitionPolicy;

/// Global configuration options for the hyperslabs crate.
///
/// Retrieve the global [`Config`] with [`global_config`] and modify it with [`global_config_mut`].
///
/// ## Partition Policy
/// > default: [`PartitionPolicy::Exact`]
///
/// How the memory-side extent of each axis is divided among the processes along that axis.
/// [`Exact`](PartitionPolicy::Exact) requires every extent to be divisible by the process count and rejects other configurations.
/// [`Balanced`](PartitionPolicy::Balanced) hands the remainder to the processes with the lowest ids.
///
/// The policy can be overridden for an individual plan with [`PlanBuilder::partition_policy`](crate::plan::PlanBuilder::partition_policy).
///
/// ## Log Resolution Summary
/// > default: [`false`]
///
/// If enabled, every resolved plan emits a `tracing` event at the `INFO` level summarising its windows and element count.
#[derive(Debug)]
pub struct Config {
    partition_policy: PartitionPolicy,
    log_resolution_summary: bool,
}

#[allow(clippy::derivable_impls)]
impl Default for Config {
    fn default() -> Self {
        Config {
            partition_policy: PartitionPolicy::Exact,
            log_resolution_summary: false,
        }
    }
}

impl Config {
    /// Get the [partition policy](#partition-policy) configuration.
    #[must_use]
    pub fn partition_policy(&self) -> PartitionPolicy {
        self.partition_policy
    }

    /// Set the [partition policy](#partition-policy) configuration.
    pub fn set_partition_policy(&mut self, partition_policy: PartitionPolicy) {
        self.partition_policy = partition_policy;
    }

    /// Get the [log resolution summary](#log-resolution-summary) configuration.
    #[must_use]
    pub fn log_resolution_summary(&self) -> bool {
        self.log_resolution_summary
    }

    /// Set the [log resolution summary](#log-resolution-summary) configuration.
    pub fn set_log_resolution_summary(&mut self, log_resolution_summary: bool) {
        self.log_resolution_summary = log_resolution_summary;
    }
}

static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Returns a reference to the global hyperslabs configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config() -> RwLockReadGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .read()
        .unwrap()
}

/// Returns a mutable reference to the global hyperslabs configuration.
///
/// # Panics
/// This function panics if the underlying lock has been poisoned and might panic if the global config is already held by the current thread.
pub fn global_config_mut() -> RwLockWriteGuard<'static, Config> {
    CONFIG
        .get_or_init(|| RwLock::new(Config::default()))
        .write()
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_log_resolution_summary() {
        assert!(!global_config().log_resolution_summary());
        global_config_mut().set_log_resolution_summary(true);
        assert!(global_config().log_resolution_summary());
        global_config_mut().set_log_resolution_summary(false);
    }

    #[test]
    fn config_partition_policy_default() {
        assert_eq!(Config::default().partition_policy(), PartitionPolicy::Exact);
        let mut config = Config::default();
        config.set_partition_policy(PartitionPolicy::Balanced);
        assert_eq!(config.partition_policy(), PartitionPolicy::Balanced);
    }
}

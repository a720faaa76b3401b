//! Contract constants and board configuration.
//!
//! Every tunable has a compile-time default matching the board's published
//! contract, a builder-style setter, and an environment-variable override.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via [`BoardConfig`] setters
//! 2. **Environment variables** — `TASKBOARD_*` vars (see below)
//! 3. **Defaults** — the contract constants in this module
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `TASKBOARD_SECONDARIES` | `usize` | `secondaries` |
//! | `TASKBOARD_MAX_TASKS` | `usize` | `max_tasks` |
//! | `TASKBOARD_STACK_SIZE` | `usize` | `stack_size` |
//! | `TASKBOARD_REINSERT_AT_HEAD` | `bool` | `reinsert_at_head` |
//! | `TASKBOARD_SIGNAL_PRIMARY` | `bool` | `signal_primary_on_secondary_insert` |

use tracing::warn;

/// Upper bound on simultaneously live tasks.
pub const MAX_TASKS: usize = 65536;

/// Maximum number of secondary queues (and secondary executor threads).
pub const MAX_SECONDARIES: usize = 10;

/// Default coroutine stack size in bytes.
pub const STACK_SIZE: usize = 57344;

/// Maximum length, in bytes, of a remote-task message.
pub const MAX_MSG_LENGTH: usize = 254;

/// Environment variable name for the secondary queue count.
pub const ENV_SECONDARIES: &str = "TASKBOARD_SECONDARIES";
/// Environment variable name for the admission limit.
pub const ENV_MAX_TASKS: &str = "TASKBOARD_MAX_TASKS";
/// Environment variable name for the coroutine stack size.
pub const ENV_STACK_SIZE: &str = "TASKBOARD_STACK_SIZE";
/// Environment variable name for the yield reinsertion policy.
pub const ENV_REINSERT_AT_HEAD: &str = "TASKBOARD_REINSERT_AT_HEAD";
/// Environment variable name for the primary-wakeup-on-secondary-insert flag.
pub const ENV_SIGNAL_PRIMARY: &str = "TASKBOARD_SIGNAL_PRIMARY";

/// Configuration for a [`TaskBoard`](crate::TaskBoard).
#[derive(Debug, Clone)]
pub struct BoardConfig {
    /// Number of secondary queues/executors, capped at [`MAX_SECONDARIES`].
    pub secondaries: usize,
    /// Admission limit on simultaneously live tasks.
    pub max_tasks: usize,
    /// Stack size for task coroutines, in bytes.
    pub stack_size: usize,
    /// Whether a plainly-yielded task returns to the *head* of its queue
    /// (the same task is resumed next unless another insert displaces it)
    /// or to the tail.
    pub reinsert_at_head: bool,
    /// Whether inserting a secondary task also signals the primary
    /// executor's condvar so it can help drain secondary backlog.
    pub signal_primary_on_secondary_insert: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            secondaries: 1,
            max_tasks: MAX_TASKS,
            stack_size: STACK_SIZE,
            reinsert_at_head: true,
            signal_primary_on_secondary_insert: true,
        }
    }
}

impl BoardConfig {
    /// Default configuration with `n` secondary queues.
    #[must_use]
    pub fn with_secondaries(n: usize) -> Self {
        Self {
            secondaries: n,
            ..Self::default()
        }
    }

    /// Sets the secondary queue count.
    #[must_use]
    pub fn secondaries(mut self, n: usize) -> Self {
        self.secondaries = n;
        self
    }

    /// Sets the admission limit.
    #[must_use]
    pub fn max_tasks(mut self, n: usize) -> Self {
        self.max_tasks = n;
        self
    }

    /// Sets the coroutine stack size in bytes.
    #[must_use]
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Sets the yield reinsertion policy.
    #[must_use]
    pub fn reinsert_at_head(mut self, at_head: bool) -> Self {
        self.reinsert_at_head = at_head;
        self
    }

    /// Sets whether secondary inserts also wake the primary executor.
    #[must_use]
    pub fn signal_primary_on_secondary_insert(mut self, signal: bool) -> Self {
        self.signal_primary_on_secondary_insert = signal;
        self
    }

    /// Defaults with any `TASKBOARD_*` environment overrides applied.
    ///
    /// Unparseable values are ignored with a warning, matching the
    /// fail-open behavior expected from env-based tuning.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(n) = parse_env::<usize>(ENV_SECONDARIES) {
            config.secondaries = n;
        }
        if let Some(n) = parse_env::<usize>(ENV_MAX_TASKS) {
            config.max_tasks = n;
        }
        if let Some(n) = parse_env::<usize>(ENV_STACK_SIZE) {
            config.stack_size = n;
        }
        if let Some(b) = parse_env_bool(ENV_REINSERT_AT_HEAD) {
            config.reinsert_at_head = b;
        }
        if let Some(b) = parse_env_bool(ENV_SIGNAL_PRIMARY) {
            config.signal_primary_on_secondary_insert = b;
        }
        config
    }

    /// Secondary count after clamping to [`MAX_SECONDARIES`].
    #[must_use]
    pub(crate) fn effective_secondaries(&self) -> usize {
        self.secondaries.min(MAX_SECONDARIES)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

fn parse_env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(var = name, value = %raw, "ignoring unparseable boolean override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Env vars are process-global; serialize the tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_match_contract() {
        let config = BoardConfig::default();
        assert_eq!(config.max_tasks, MAX_TASKS);
        assert_eq!(config.stack_size, STACK_SIZE);
        assert!(config.reinsert_at_head);
        assert!(config.signal_primary_on_secondary_insert);
    }

    #[test]
    fn secondaries_clamped() {
        let config = BoardConfig::with_secondaries(64);
        assert_eq!(config.effective_secondaries(), MAX_SECONDARIES);
    }

    #[test]
    fn env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(ENV_MAX_TASKS, "128");
        std::env::set_var(ENV_REINSERT_AT_HEAD, "off");
        let config = BoardConfig::from_env();
        std::env::remove_var(ENV_MAX_TASKS);
        std::env::remove_var(ENV_REINSERT_AT_HEAD);
        assert_eq!(config.max_tasks, 128);
        assert!(!config.reinsert_at_head);
    }

    #[test]
    fn invalid_env_is_ignored() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var(ENV_STACK_SIZE, "not-a-number");
        let config = BoardConfig::from_env();
        std::env::remove_var(ENV_STACK_SIZE);
        assert_eq!(config.stack_size, STACK_SIZE);
    }
}

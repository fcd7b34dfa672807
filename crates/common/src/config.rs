use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub output_root: PathBuf,
    pub log_dir: PathBuf,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Exit with a nonzero status when a run writes no file.
    pub strict_exit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            log_dir: PathBuf::from("log"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            strict_exit: false,
        }
    }
}

impl Config {
    /// Reads optional overrides from the environment. Unset or unparsable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let output_root = lookup("HOT_OUTPUT_ROOT")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.output_root);
        let log_dir = lookup("HOT_LOG_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.log_dir);
        let timeout = lookup("HOT_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);
        let strict_exit = lookup("HOT_STRICT_EXIT")
            .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.strict_exit);

        Config {
            output_root,
            log_dir,
            timeout,
            retry: defaults.retry,
            strict_exit,
        }
    }
}

//! Fallback values applied when optional environment variables are unset.

/// Seconds a file's size must remain unchanged before it counts as stable.
pub const DEFAULT_STABLE_SECONDS: u64 = 3;
/// Seconds between size polls while waiting for stability.
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 1;
/// File name of the trigger marker inside the source directory.
pub const DEFAULT_TRIGGER_FILE: &str = "trigger.txt";
/// Per-file attempt budget for manifest reads and transfers.
pub const DEFAULT_RETRY_COUNT: u32 = 3;
/// Seconds slept between per-file attempts.
pub const DEFAULT_RETRY_DELAY_SECONDS: u64 = 2;
/// Prefix of the manifest artifact written to the source directory.
pub const DEFAULT_MANIFEST_PREFIX: &str = "manifest";

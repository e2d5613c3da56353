//! Size-polling stability detection.
//!
//! # Design
//! - A file counts as stable once its size has not changed for the configured
//!   threshold; the probe polls at a fixed interval and accumulates the
//!   unchanged duration.
//! - A vanished or unreadable file fails immediately; the caller decides
//!   whether to retry the surrounding operation.
//! - Without a `max_wait` the probe blocks until the file settles or
//!   vanishes; callers needing responsiveness opt into the bounded variant.

use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use dropship_config::StabilitySettings;
use tracing::{debug, warn};

/// Outcome of a stability wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// The size stayed unchanged for the full threshold window.
    Stable,
    /// The file disappeared or became unreadable mid-poll.
    Vanished,
    /// The optional wait cap elapsed before the file settled.
    TimedOut,
}

impl Stability {
    /// Whether the file is safe to read.
    #[must_use]
    pub const fn is_stable(self) -> bool {
        matches!(self, Self::Stable)
    }

    /// Label used for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Vanished => "vanished",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Size-polling probe that blocks until a file settles.
#[derive(Debug, Clone, Copy)]
pub struct StabilityProbe {
    poll_interval: Duration,
    threshold: Duration,
    max_wait: Option<Duration>,
}

impl StabilityProbe {
    /// Construct a probe with an unbounded wait.
    #[must_use]
    pub const fn new(poll_interval: Duration, threshold: Duration) -> Self {
        Self {
            poll_interval,
            threshold,
            max_wait: None,
        }
    }

    /// Cap the total wait; once exceeded the probe reports
    /// [`Stability::TimedOut`].
    #[must_use]
    pub const fn with_max_wait(mut self, limit: Duration) -> Self {
        self.max_wait = Some(limit);
        self
    }

    /// Construct a probe from the configured stability settings.
    #[must_use]
    pub const fn from_settings(settings: &StabilitySettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            threshold: settings.threshold,
            max_wait: settings.max_wait,
        }
    }

    /// Block until `path` has kept an unchanged size for the threshold
    /// window, vanished, or exceeded the optional wait cap.
    ///
    /// A threshold at or below one poll interval means a single settled read
    /// suffices.
    #[must_use]
    pub fn wait(&self, path: &Path) -> Stability {
        let mut last_size: Option<u64> = None;
        let mut unchanged = Duration::ZERO;
        let mut waited = Duration::ZERO;

        loop {
            let size = match fs::metadata(path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "file vanished while waiting for stability"
                    );
                    return Stability::Vanished;
                }
            };

            if last_size == Some(size) {
                unchanged += self.poll_interval;
            } else {
                last_size = Some(size);
                unchanged = Duration::ZERO;
            }

            if unchanged >= self.threshold {
                debug!(path = %path.display(), size, "file size is stable");
                return Stability::Stable;
            }

            if let Some(limit) = self.max_wait {
                if waited >= limit {
                    warn!(
                        path = %path.display(),
                        limit_secs = limit.as_secs(),
                        "stability wait exceeded the configured cap"
                    );
                    return Stability::TimedOut;
                }
            }

            waited += self.poll_interval;
            thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    type TestResult<T> = anyhow::Result<T>;

    const POLL: Duration = Duration::from_millis(5);

    #[test]
    fn zero_threshold_accepts_the_first_read() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settled.dat");
        File::create(&path)?.write_all(b"payload")?;

        let probe = StabilityProbe::new(POLL, Duration::ZERO);
        assert_eq!(probe.wait(&path), Stability::Stable);
        Ok(())
    }

    #[test]
    fn unchanged_size_becomes_stable_after_the_threshold() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("settled.dat");
        File::create(&path)?.write_all(b"payload")?;

        let probe = StabilityProbe::new(POLL, Duration::from_millis(20));
        let started = std::time::Instant::now();
        assert_eq!(probe.wait(&path), Stability::Stable);
        assert!(started.elapsed() >= Duration::from_millis(20));
        Ok(())
    }

    #[test]
    fn missing_file_vanishes_immediately() {
        let dir = TempDir::new().expect("tempdir");
        let probe = StabilityProbe::new(POLL, Duration::ZERO);
        assert_eq!(
            probe.wait(&dir.path().join("never-existed.dat")),
            Stability::Vanished
        );
    }

    #[test]
    fn deletion_mid_wait_reports_vanished() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("doomed.dat");
        File::create(&path)?.write_all(b"payload")?;

        let deleter = {
            let path = path.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(20));
                let _ = std::fs::remove_file(&path);
            })
        };

        let probe = StabilityProbe::new(POLL, Duration::from_millis(500));
        assert_eq!(probe.wait(&path), Stability::Vanished);
        deleter.join().expect("deleter thread");
        Ok(())
    }

    #[test]
    fn wait_cap_times_out_before_a_long_threshold() -> TestResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("slow.dat");
        File::create(&path)?.write_all(b"payload")?;

        let probe =
            StabilityProbe::new(POLL, Duration::from_secs(60)).with_max_wait(Duration::from_millis(30));
        assert_eq!(probe.wait(&path), Stability::TimedOut);
        Ok(())
    }
}

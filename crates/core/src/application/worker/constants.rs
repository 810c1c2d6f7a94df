// Named durations used by the tracker and long-poll loops (no magic values).
use std::time::Duration;

/// Sleep duration when the tracker's `uws` queue has nothing to consume.
pub const TRACKER_IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// Sleep duration after a tracker-loop error before retrying.
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Long-poll initial backoff (spec §4.4).
pub const LONG_POLL_INITIAL_BACKOFF: Duration = Duration::from_millis(100);

/// Long-poll backoff multiplier (spec §4.4).
pub const LONG_POLL_BACKOFF_MULTIPLIER: f64 = 1.5;

/// `job_completed`'s poll-for-result cadence (spec §4.5, `original_source`'s workers.py).
pub const RESULT_POLL_CADENCE: Duration = Duration::from_millis(500);

/// `job_completed`'s poll-for-result timeout (`JOB_RESULT_TIMEOUT` in `original_source`'s constants.py).
pub const RESULT_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Default long-poll cap when `wait` is negative or exceeds it (`wait_timeout`).
pub const DEFAULT_WAIT_TIMEOUT_SECS: i64 = 60;

/// Default `/sync` total wait.
pub const DEFAULT_SYNC_TIMEOUT_SECS: i64 = 60;

/// Default signed-URL lifetime (15 minutes).
pub const DEFAULT_URL_LIFETIME_SECS: i64 = 15 * 60;

/// Default scheduled-expiration sweep interval.
pub const DEFAULT_EXPIRE_JOBS_INTERVAL_SECS: u64 = 60;

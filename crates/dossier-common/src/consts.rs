use std::time::Duration;

/// Progress reported once a generator call is in flight.
pub const JOB_PROGRESS_STARTED: u8 = 25;
pub const JOB_PROGRESS_DONE: u8 = 100;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_POLL_MAX_ATTEMPTS: u32 = 300;

/// Pause between batch rows so the downstream API is not flooded.
pub const DEFAULT_ROW_DELAY: Duration = Duration::from_secs(1);

pub const JOB_TYPE_BATCH: &str = "batch";
pub const JOB_TYPE_BATCH_ROW: &str = "batch-row";

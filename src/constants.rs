use std::time::Duration;

pub(crate) const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);
pub(crate) const DEFAULT_CONCURRENCY: usize = 256;
pub(crate) const DEFAULT_PING_PROGRAM: &str = "ping";
pub(crate) const PING_COUNT: &str = "1";

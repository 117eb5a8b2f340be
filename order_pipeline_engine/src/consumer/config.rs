use std::time::Duration;

use crate::queue::MAX_BATCH_SIZE;

pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(20);
pub const DEFAULT_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Polling parameters for the consumer loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Upper bound on envelopes per receive call.
    pub max_messages: usize,
    /// Long-poll wait for each receive call.
    pub wait_time: Duration,
    /// Pause after a failed receive call.
    pub error_backoff: Duration,
    /// Envelopes of one batch processed at the same time. 1 processes a batch sequentially.
    pub concurrency: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: MAX_BATCH_SIZE,
            wait_time: DEFAULT_WAIT_TIME,
            error_backoff: DEFAULT_ERROR_BACKOFF,
            concurrency: 1,
        }
    }
}

impl ConsumerConfig {
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.clamp(1, MAX_BATCH_SIZE);
        self
    }

    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }

    pub fn with_error_backoff(mut self, error_backoff: Duration) -> Self {
        self.error_backoff = error_backoff;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

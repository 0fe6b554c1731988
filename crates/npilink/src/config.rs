use std::time::Duration;

/// Configuration for a co-processor link.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Attempts to dequeue a matching SRSP before giving up. Default: 100.
    pub srsp_retry_count: u32,
    /// Wait per attempt on the SRSP queue. Default: 50 ms.
    ///
    /// Together with the retry count this bounds the total wait for a
    /// synchronous response (default about 5 s).
    pub srsp_poll_interval: Duration,
    /// Capacity of the synchronous-response queue. Default: 30.
    pub srsp_queue_depth: usize,
    /// Capacity of the AREQ/event queue. Default: 50.
    pub event_queue_depth: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            srsp_retry_count: 100,
            srsp_poll_interval: Duration::from_millis(50),
            srsp_queue_depth: 30,
            event_queue_depth: 50,
        }
    }
}

impl LinkConfig {
    /// Upper bound on the time a synchronous request may block.
    pub fn srsp_budget(&self) -> Duration {
        self.srsp_poll_interval * self.srsp_retry_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget_is_five_seconds() {
        assert_eq!(LinkConfig::default().srsp_budget(), Duration::from_secs(5));
    }
}

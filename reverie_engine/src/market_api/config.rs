use std::time::Duration;

/// Rows per page of the vendor feed.
pub const POST_PAGE_SIZE: i64 = 10;
/// Rows per page of a notification feed.
pub const NOTIFICATION_PAGE_SIZE: i64 = 20;
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Runtime knobs shared by the engine APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on every individual storage call.
    pub store_timeout: Duration,
    pub post_page_size: i64,
    pub notification_page_size: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_timeout: DEFAULT_STORE_TIMEOUT,
            post_page_size: POST_PAGE_SIZE,
            notification_page_size: NOTIFICATION_PAGE_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }
}

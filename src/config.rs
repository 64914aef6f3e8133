// src/config.rs
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend root; `/api` is appended by the client.
    pub api_url: String,
    pub request_timeout: Duration,
    /// Upper bound on concurrent indicator fetches after a bulk scan.
    pub scan_concurrency: usize,
}

impl DashboardConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            scan_concurrency: DEFAULT_SCAN_CONCURRENCY,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_scan_concurrency(mut self, scan_concurrency: usize) -> Self {
        self.scan_concurrency = scan_concurrency.max(1);
        self
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        let api_url =
            std::env::var("BACKEND_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(api_url)
    }
}

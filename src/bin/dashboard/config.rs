// config.rs
use clap::Parser;
use signal_dashboard::config::{DEFAULT_API_URL, DEFAULT_SCAN_CONCURRENCY};
use signal_dashboard::DashboardConfig;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "dashboard")]
#[command(about = "Terminal dashboard for the stock signal backend")]
pub struct Args {
    /// Backend root URL; `/api` is appended to every request
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Seconds between automatic trade log and health refreshes (0 disables)
    #[arg(long, default_value_t = 30)]
    pub refresh_secs: u64,

    /// Concurrent indicator fetches after a bulk scan
    #[arg(long, default_value_t = DEFAULT_SCAN_CONCURRENCY)]
    pub scan_concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Directory for the rolling log file
    #[arg(long, default_value = "logs")]
    pub log_dir: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Args {
    pub fn dashboard_config(&self) -> DashboardConfig {
        DashboardConfig::new(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_secs.max(1)))
            .with_scan_concurrency(self.scan_concurrency)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.refresh_secs > 0).then(|| Duration::from_secs(self.refresh_secs))
    }
}

/// The terminal belongs to the UI, so logs only go to a daily rolling file.
pub fn setup_logging(log_dir: &str, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard");

    let default_level = if debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_target(true)
                .with_level(true)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_refresh_disables_polling() {
        let args = Args::try_parse_from(["dashboard", "--refresh-secs", "0"]).unwrap();
        assert!(args.refresh_interval().is_none());
    }

    #[test]
    fn test_config_from_args() {
        let args = Args::try_parse_from([
            "dashboard",
            "--api-url",
            "http://10.0.0.5:8001",
            "--scan-concurrency",
            "0",
            "--request-timeout-secs",
            "5",
        ])
        .unwrap();
        let config = args.dashboard_config();
        assert_eq!(config.api_url, "http://10.0.0.5:8001");
        assert_eq!(config.scan_concurrency, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(args.refresh_interval(), Some(Duration::from_secs(30)));
    }
}

// src/errors.rs
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid backend URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("A scan is already running")]
    ScanInProgress,

    #[error("No signal cached for {symbol}")]
    NoSignal { symbol: String },
}

impl DashboardError {
    /// Short text for a status line.
    pub fn summary(&self) -> String {
        match self {
            DashboardError::Http(e) if e.is_timeout() => "backend timed out".to_string(),
            DashboardError::Http(e) if e.is_connect() => "backend unreachable".to_string(),
            DashboardError::Http(_) => "network error".to_string(),
            DashboardError::Status { status, .. } => format!("backend error {}", status.as_u16()),
            DashboardError::Decode(_) => "unexpected response".to_string(),
            DashboardError::InvalidBaseUrl { url, .. } => format!("bad backend url {}", url),
            DashboardError::ScanInProgress => "scan already running".to_string(),
            DashboardError::NoSignal { symbol } => format!("no signal for {}", symbol),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_summary_uses_numeric_code() {
        let err = DashboardError::Status {
            status: StatusCode::NOT_FOUND,
            url: "http://localhost/api/indicators".to_string(),
        };
        assert_eq!(err.summary(), "backend error 404");
        assert!(err.to_string().contains("/api/indicators"));
    }

    #[test]
    fn local_rejections_summarize_without_a_backend() {
        assert_eq!(DashboardError::ScanInProgress.summary(), "scan already running");
        let err = DashboardError::NoSignal {
            symbol: "TCS".to_string(),
        };
        assert_eq!(err.summary(), "no signal for TCS");
    }
}

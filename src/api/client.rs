// src/api/client.rs - HTTP client for the signal backend

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use crate::config::DashboardConfig;
use crate::errors::{DashboardError, Result};
use crate::types::{
    AlertRequest, HealthResponse, IndicatorResponse, IndicatorSnapshot, ScanResponse, Signal,
    SignalRequest, SignalResponse, TradeLogEntry, TradeLogResponse, WatchlistAction,
    WatchlistEntry, WatchlistRequest, WatchlistResponse,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    api_root: Url,
}

impl ApiClient {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        let api_root = api_root(&config.api_url)?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, api_root })
    }

    pub fn base_url(&self) -> &str {
        self.api_root.as_str()
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_root
            .join(path)
            .map_err(|source| DashboardError::InvalidBaseUrl {
                url: format!("{}{}", self.api_root, path),
                source,
            })
    }

    pub async fn get_watchlist(&self) -> Result<Vec<WatchlistEntry>> {
        let url = self.endpoint("watchlist")?;
        let response: WatchlistResponse = self.send_json(self.client.get(url.clone()), &url).await?;
        Ok(response.watchlist)
    }

    pub async fn update_watchlist(&self, symbols: Vec<String>, action: WatchlistAction) -> Result<()> {
        let url = self.endpoint("watchlist")?;
        let body = WatchlistRequest { symbols, action };
        self.send(self.client.post(url.clone()).json(&body), &url).await?;
        Ok(())
    }

    pub async fn get_indicators(&self, symbol: &str) -> Result<IndicatorSnapshot> {
        let url = self.endpoint("indicators")?;
        let request = self.client.get(url.clone()).query(&[("symbol", symbol)]);
        let response: IndicatorResponse = self.send_json(request, &url).await?;
        Ok(response.into_snapshot(symbol))
    }

    pub async fn generate_signal(&self, symbol: &str) -> Result<Signal> {
        let url = self.endpoint("signal")?;
        let body = SignalRequest { symbol: symbol.to_string() };
        let response: SignalResponse = self.send_json(self.client.post(url.clone()).json(&body), &url).await?;
        Ok(response.into_signal(symbol))
    }

    pub async fn scan_all(&self) -> Result<ScanResponse> {
        let url = self.endpoint("scan-all")?;
        self.send_json(self.client.post(url.clone()), &url).await
    }

    pub async fn get_trade_log(&self) -> Result<Vec<TradeLogEntry>> {
        let url = self.endpoint("trade-log")?;
        let response: TradeLogResponse = self.send_json(self.client.get(url.clone()), &url).await?;
        Ok(response.trades)
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.endpoint("health")?;
        self.send_json(self.client.get(url.clone()), &url).await
    }

    pub async fn send_alert(&self, alert: &AlertRequest) -> Result<()> {
        let url = self.endpoint("alert")?;
        self.send(self.client.post(url.clone()).json(alert), &url).await?;
        Ok(())
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response> {
        debug!("[API] {}", url);
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!("[API] {} returned {}", url, status);
            return Err(DashboardError::Status {
                status,
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, url: &Url) -> Result<T> {
        let body = self.send(request, url).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!("[API] Could not decode response from {}: {}", url, e);
            DashboardError::Decode(e)
        })
    }
}

/// Normalises the configured backend root into `<root>/api/`.
fn api_root(base: &str) -> Result<Url> {
    let trimmed = base.trim().trim_end_matches('/');
    let invalid = |source| DashboardError::InvalidBaseUrl {
        url: base.to_string(),
        source,
    };
    let root = Url::parse(&format!("{}/", trimmed)).map_err(invalid)?;
    root.join("api/").map_err(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_appends_prefix() {
        let root = api_root("http://localhost:8000").unwrap();
        assert_eq!(root.as_str(), "http://localhost:8000/api/");

        let root = api_root("https://example.com/trading/").unwrap();
        assert_eq!(root.as_str(), "https://example.com/trading/api/");
        assert_eq!(
            root.join("scan-all").unwrap().as_str(),
            "https://example.com/trading/api/scan-all"
        );
    }

    #[test]
    fn test_api_root_rejects_garbage() {
        assert!(matches!(
            api_root("not a url"),
            Err(DashboardError::InvalidBaseUrl { .. })
        ));
    }
}

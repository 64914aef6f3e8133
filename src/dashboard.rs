// src/dashboard.rs - Dashboard operations against the signal backend
//
// Every operation fetches, normalizes into the shared store and returns what
// happened. Failures are logged here and returned; presentation is the
// caller's decision.

use futures::future::join_all;
use parking_lot::{RwLock, RwLockReadGuard};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::api::ApiClient;
use crate::config::DashboardConfig;
use crate::errors::{DashboardError, Result};
use crate::store::{Applied, FetchTicket, Panel, SignalReplacement, SymbolStore, WatchlistDiff};
use crate::types::{AlertRequest, HealthResponse, WatchlistAction};

#[derive(Debug, Default)]
pub struct IndicatorRefresh {
    pub stored: usize,
    pub discarded: usize,
    pub failed: Vec<(String, DashboardError)>,
}

#[derive(Debug)]
pub struct WatchlistReport {
    pub entries: usize,
    pub diff: WatchlistDiff,
    pub indicators: IndicatorRefresh,
}

#[derive(Debug)]
pub enum AddOutcome {
    /// Blank input; nothing was sent.
    Ignored,
    /// The backend accepted the symbol. `reload` is the follow-up watchlist fetch.
    Added {
        symbol: String,
        reload: Result<WatchlistReport>,
    },
}

#[derive(Debug)]
pub struct RemoveOutcome {
    pub symbol: String,
    pub purged: bool,
    pub reload: Result<WatchlistReport>,
}

#[derive(Debug)]
pub struct ScanSummary {
    /// Number of results the backend returned.
    pub results: usize,
    pub signals: SignalReplacement,
    pub indicators: IndicatorRefresh,
    pub trade_log_refreshed: bool,
}

/// Clears the scan busy flag however the scan ends, including cancellation.
struct ScanGuard {
    store: Arc<RwLock<SymbolStore>>,
}

impl ScanGuard {
    fn acquire(store: &Arc<RwLock<SymbolStore>>) -> Option<Self> {
        if store.write().begin_scan() {
            Some(Self {
                store: Arc::clone(store),
            })
        } else {
            None
        }
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        self.store.write().end_scan();
    }
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    api: ApiClient,
    store: Arc<RwLock<SymbolStore>>,
    scan_concurrency: usize,
}

impl Dashboard {
    pub fn new(config: &DashboardConfig) -> Result<Self> {
        Ok(Self {
            api: ApiClient::new(config)?,
            store: Arc::new(RwLock::new(SymbolStore::new())),
            scan_concurrency: config.scan_concurrency.max(1),
        })
    }

    /// Read access for rendering. Do not hold the guard across an `.await`.
    pub fn store(&self) -> RwLockReadGuard<'_, SymbolStore> {
        self.store.read()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    // --- Watchlist ---

    /// Replaces the watchlist, then fetches indicators for every entry, one
    /// request per symbol, all in flight at once.
    pub async fn load_watchlist(&self) -> Result<WatchlistReport> {
        self.store.write().begin_fetch(Panel::Watchlist);

        let entries = match self.api.get_watchlist().await {
            Ok(entries) => entries,
            Err(e) => {
                self.store.write().finish_fetch(Panel::Watchlist, false);
                error!("[WATCHLIST] Failed to load watchlist: {}", e);
                return Err(e);
            }
        };

        let (diff, tickets) = {
            let mut store = self.store.write();
            let diff = store.replace_watchlist(entries);
            store.finish_fetch(Panel::Watchlist, true);
            (diff, store.tickets())
        };
        let count = tickets.len();
        info!("[WATCHLIST] Loaded {} symbols", count);

        let indicators = self.fan_out_indicators(tickets, count).await;
        Ok(WatchlistReport {
            entries: count,
            diff,
            indicators,
        })
    }

    pub async fn add_symbol(&self, input: &str) -> Result<AddOutcome> {
        let symbol = input.trim().to_uppercase();
        if symbol.is_empty() {
            debug!("[WATCHLIST] Ignoring blank symbol");
            return Ok(AddOutcome::Ignored);
        }

        if let Err(e) = self
            .api
            .update_watchlist(vec![symbol.clone()], WatchlistAction::Add)
            .await
        {
            error!("[WATCHLIST] Failed to add {}: {}", symbol, e);
            return Err(e);
        }
        info!("[WATCHLIST] Added {}", symbol);

        let reload = self.load_watchlist().await;
        Ok(AddOutcome::Added { symbol, reload })
    }

    /// On success the symbol's indicators and signal are purged before the
    /// watchlist is reloaded; on failure nothing changes.
    pub async fn remove_symbol(&self, symbol: &str) -> Result<RemoveOutcome> {
        if let Err(e) = self
            .api
            .update_watchlist(vec![symbol.to_string()], WatchlistAction::Remove)
            .await
        {
            error!("[WATCHLIST] Failed to remove {}: {}", symbol, e);
            return Err(e);
        }

        let purged = self.store.write().invalidate(symbol);
        info!("[WATCHLIST] Removed {} (purged cached data: {})", symbol, purged);

        let reload = self.load_watchlist().await;
        Ok(RemoveOutcome {
            symbol: symbol.to_string(),
            purged,
            reload,
        })
    }

    // --- Indicators ---

    /// Symbols that are not on the watchlist are not fetched.
    pub async fn load_indicators(&self, symbol: &str) -> Result<Applied> {
        let ticket = self.store.read().ticket(symbol);
        let Some(ticket) = ticket else {
            debug!("[INDICATORS] {} is not on the watchlist", symbol);
            return Ok(Applied::Discarded);
        };
        self.fetch_indicators(&ticket).await
    }

    async fn fetch_indicators(&self, ticket: &FetchTicket) -> Result<Applied> {
        let snapshot = self.api.get_indicators(ticket.symbol()).await?;
        let applied = self.store.write().apply_indicators(ticket, snapshot);
        Ok(applied)
    }

    async fn fan_out_indicators(&self, tickets: Vec<FetchTicket>, limit: usize) -> IndicatorRefresh {
        let semaphore = Semaphore::new(limit.max(1));
        let semaphore = &semaphore;
        let fetches = tickets.into_iter().map(|ticket| async move {
            let _permit = semaphore.acquire().await.ok();
            let outcome = self.fetch_indicators(&ticket).await;
            (ticket, outcome)
        });

        let mut refresh = IndicatorRefresh::default();
        for (ticket, outcome) in join_all(fetches).await {
            match outcome {
                Ok(Applied::Stored) => refresh.stored += 1,
                Ok(Applied::Discarded) => refresh.discarded += 1,
                Err(e) => {
                    warn!("[INDICATORS] Failed for {}: {}", ticket.symbol(), e);
                    refresh.failed.push((ticket.symbol().to_string(), e));
                }
            }
        }
        refresh
    }

    // --- Signals ---

    pub async fn generate_signal(&self, symbol: &str) -> Result<Applied> {
        let ticket = self.store.read().ticket(symbol);
        let Some(ticket) = ticket else {
            debug!("[SIGNAL] {} is not on the watchlist", symbol);
            return Ok(Applied::Discarded);
        };

        let signal = match self.api.generate_signal(symbol).await {
            Ok(signal) => signal,
            Err(e) => {
                error!("[SIGNAL] Failed to generate signal for {}: {}", symbol, e);
                return Err(e);
            }
        };
        info!("[SIGNAL] {} -> {}", symbol, signal.signal);

        let applied = self.store.write().apply_signal(&ticket, signal);
        Ok(applied)
    }

    /// Bulk scan. Signals are replaced first, then indicators for the current
    /// watchlist are refreshed (bounded fan-out), then the trade log. Only the
    /// scan request itself can fail the operation.
    pub async fn scan_all(&self) -> Result<ScanSummary> {
        let _busy = ScanGuard::acquire(&self.store).ok_or(DashboardError::ScanInProgress)?;
        info!("[SCAN] Starting bulk scan");

        let tickets = self.store.read().tickets();
        let response = match self.api.scan_all().await {
            Ok(response) => response,
            Err(e) => {
                error!("[SCAN] Bulk scan failed: {}", e);
                return Err(e);
            }
        };
        if let Some(message) = &response.message {
            debug!("[SCAN] Backend says: {}", message);
        }

        let results = response.results.len();
        let signals = self.store.write().replace_signals(&tickets, response.results);

        let current = self.store.read().tickets();
        let indicators = self.fan_out_indicators(current, self.scan_concurrency).await;

        let trade_log_refreshed = match self.load_trade_log().await {
            Ok(_) => true,
            Err(e) => {
                warn!("[SCAN] Trade log refresh after scan failed: {}", e);
                false
            }
        };

        info!(
            "[SCAN] Complete: {} results, {} stored, {} indicator failures",
            results,
            signals.stored,
            indicators.failed.len()
        );
        Ok(ScanSummary {
            results,
            signals,
            indicators,
            trade_log_refreshed,
        })
    }

    // --- Trade log ---

    pub async fn load_trade_log(&self) -> Result<usize> {
        self.store.write().begin_fetch(Panel::TradeLog);

        match self.api.get_trade_log().await {
            Ok(trades) => {
                let count = trades.len();
                let mut store = self.store.write();
                store.replace_trade_log(trades);
                store.finish_fetch(Panel::TradeLog, true);
                debug!("[TRADE_LOG] Loaded {} trades", count);
                Ok(count)
            }
            Err(e) => {
                self.store.write().finish_fetch(Panel::TradeLog, false);
                error!("[TRADE_LOG] Failed to load trade log: {}", e);
                Err(e)
            }
        }
    }

    // --- Misc ---

    pub async fn check_health(&self) -> Result<HealthResponse> {
        self.api.health().await
    }

    /// Pushes the cached signal for `symbol` to the backend's alert channel.
    pub async fn push_alert(&self, symbol: &str) -> Result<()> {
        let alert = self.store.read().signal(symbol).map(AlertRequest::from);
        let alert = alert.ok_or_else(|| DashboardError::NoSignal {
            symbol: symbol.to_string(),
        })?;

        match self.api.send_alert(&alert).await {
            Ok(()) => {
                info!("[ALERT] Sent {} alert for {}", alert.signal, symbol);
                Ok(())
            }
            Err(e) => {
                error!("[ALERT] Failed to send alert for {}: {}", symbol, e);
                Err(e)
            }
        }
    }
}

// src/bin/dashboard/app.rs - App state, key handling and async result plumbing
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use signal_dashboard::dashboard::{AddOutcome, RemoveOutcome, ScanSummary, WatchlistReport};
use signal_dashboard::errors::Result;
use signal_dashboard::session::SessionGate;
use signal_dashboard::store::Applied;
use signal_dashboard::types::HealthResponse;
use signal_dashboard::Dashboard;

use crate::types::{AppPage, BlockingAlert, InputMode};

/// Results of spawned backend calls, delivered back to the UI loop.
#[derive(Debug)]
pub enum AppEvent {
    WatchlistLoaded(Result<WatchlistReport>),
    SymbolAdded(Result<AddOutcome>),
    SymbolRemoved(Result<RemoveOutcome>),
    IndicatorsLoaded { symbol: String, result: Result<Applied> },
    SignalGenerated { symbol: String, result: Result<Applied> },
    ScanFinished(Result<ScanSummary>),
    TradeLogLoaded(Result<usize>),
    HealthChecked(Result<HealthResponse>),
    AlertSent { symbol: String, result: Result<()> },
}

pub struct App {
    pub dashboard: Dashboard,
    pub session: SessionGate,
    pub current_page: AppPage,
    pub input_mode: InputMode,
    pub symbol_input: String,
    pub selected_symbol_index: Option<usize>,
    pub status_message: Option<String>,
    pub alert: Option<BlockingAlert>,
    pub backend_healthy: Option<bool>,
    pub refresh_interval: Option<Duration>,
    pub last_refresh: Instant,
    pub update_count: u64,
    pub should_quit: bool,
    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
}

impl App {
    pub fn new(dashboard: Dashboard, refresh_interval: Option<Duration>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            dashboard,
            session: SessionGate::new(),
            current_page: AppPage::Login,
            input_mode: InputMode::Normal,
            symbol_input: String::new(),
            selected_symbol_index: None,
            status_message: None,
            alert: None,
            backend_healthy: None,
            refresh_interval,
            last_refresh: Instant::now(),
            update_count: 0,
            should_quit: false,
            events_tx,
            events_rx,
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            // The receiver only goes away on shutdown.
            let _ = tx.send(task.await);
        });
    }

    // --- Session ---

    pub fn enter(&mut self) {
        let first_entry = !self.session.is_authenticated();
        self.session.enter();
        if self.current_page == AppPage::Login {
            self.current_page = AppPage::Watchlist;
        }
        if first_entry {
            self.load_watchlist();
            self.load_trade_log();
            self.check_health();
            self.last_refresh = Instant::now();
        }
    }

    // --- Navigation ---

    pub fn switch_page(&mut self, page: AppPage) {
        if page == AppPage::Login || !self.session.is_authenticated() {
            return;
        }
        self.current_page = page;
    }

    pub fn next_page(&mut self) {
        self.switch_page(self.current_page.next());
    }

    pub fn previous_page(&mut self) {
        self.switch_page(self.current_page.previous());
    }

    /// Row selection lives on the Watchlist page only.
    pub fn select_next(&mut self) {
        let len = self.dashboard.store().len();
        if self.current_page != AppPage::Watchlist || len == 0 {
            return;
        }
        self.selected_symbol_index = Some(match self.selected_symbol_index {
            Some(current) => (current + 1) % len,
            None => 0,
        });
    }

    pub fn select_previous(&mut self) {
        let len = self.dashboard.store().len();
        if self.current_page != AppPage::Watchlist || len == 0 {
            return;
        }
        self.selected_symbol_index = Some(match self.selected_symbol_index {
            Some(0) | None => len - 1,
            Some(current) => current - 1,
        });
    }

    /// Keeps the selection inside the current watchlist length.
    pub fn clamp_selection(&mut self) {
        let len = self.dashboard.store().len();
        self.selected_symbol_index = clamp(self.selected_symbol_index, len);
    }

    pub fn selected_symbol(&self) -> Option<String> {
        let index = self.selected_symbol_index?;
        self.dashboard.store().symbol_at(index).map(str::to_string)
    }

    // --- Symbol input ---

    pub fn begin_input(&mut self) {
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
    }

    /// Blank input is dropped without a request. The text stays in the box
    /// until the backend accepts it.
    pub fn submit_input(&mut self) {
        self.input_mode = InputMode::Normal;
        if self.symbol_input.trim().is_empty() {
            return;
        }
        let dashboard = self.dashboard.clone();
        let input = self.symbol_input.clone();
        self.status_message = Some(format!("Adding {}...", input.trim().to_uppercase()));
        self.spawn(async move { AppEvent::SymbolAdded(dashboard.add_symbol(&input).await) });
    }

    // --- Backend actions ---

    pub fn load_watchlist(&self) {
        let dashboard = self.dashboard.clone();
        self.spawn(async move { AppEvent::WatchlistLoaded(dashboard.load_watchlist().await) });
    }

    pub fn load_trade_log(&self) {
        let dashboard = self.dashboard.clone();
        self.spawn(async move { AppEvent::TradeLogLoaded(dashboard.load_trade_log().await) });
    }

    pub fn check_health(&self) {
        let dashboard = self.dashboard.clone();
        self.spawn(async move { AppEvent::HealthChecked(dashboard.check_health().await) });
    }

    pub fn remove_selected(&mut self) {
        let Some(symbol) = self.selected_symbol() else {
            self.status_message = Some("No symbol selected".to_string());
            return;
        };
        let dashboard = self.dashboard.clone();
        self.status_message = Some(format!("Removing {}...", symbol));
        self.spawn(async move { AppEvent::SymbolRemoved(dashboard.remove_symbol(&symbol).await) });
    }

    pub fn generate_selected(&mut self) {
        let Some(symbol) = self.selected_symbol() else {
            self.status_message = Some("No symbol selected".to_string());
            return;
        };
        let dashboard = self.dashboard.clone();
        self.status_message = Some(format!("Generating signal for {}...", symbol));
        self.spawn(async move {
            let result = dashboard.generate_signal(&symbol).await;
            AppEvent::SignalGenerated { symbol, result }
        });
    }

    pub fn refresh_selected_indicators(&mut self) {
        let Some(symbol) = self.selected_symbol() else {
            self.status_message = Some("No symbol selected".to_string());
            return;
        };
        let dashboard = self.dashboard.clone();
        self.spawn(async move {
            let result = dashboard.load_indicators(&symbol).await;
            AppEvent::IndicatorsLoaded { symbol, result }
        });
    }

    pub fn scan_all(&mut self) {
        if self.dashboard.store().is_scanning() {
            self.status_message = Some("Scan already running".to_string());
            return;
        }
        let dashboard = self.dashboard.clone();
        self.status_message = Some("Scanning all symbols...".to_string());
        self.spawn(async move { AppEvent::ScanFinished(dashboard.scan_all().await) });
    }

    /// Pushes the selected row's cached signal; rows without one send nothing.
    pub fn push_alert_selected(&mut self) {
        let Some(symbol) = self.selected_symbol() else {
            self.status_message = Some("No symbol selected".to_string());
            return;
        };
        if self.dashboard.store().signal(&symbol).is_none() {
            self.status_message = Some(format!("No signal for {}", symbol));
            return;
        }
        let dashboard = self.dashboard.clone();
        self.spawn(async move {
            let result = dashboard.push_alert(&symbol).await;
            AppEvent::AlertSent { symbol, result }
        });
    }

    pub fn refresh_current_page(&mut self) {
        match self.current_page {
            AppPage::Watchlist | AppPage::Signals => self.load_watchlist(),
            AppPage::TradeLog => self.load_trade_log(),
            AppPage::Login => {}
        }
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    // --- Event loop hooks ---

    pub fn on_tick(&mut self) {
        let Some(interval) = self.refresh_interval else {
            return;
        };
        if self.session.is_authenticated() && self.last_refresh.elapsed() >= interval {
            self.load_trade_log();
            self.check_health();
            self.last_refresh = Instant::now();
        }
    }

    /// Applies every result that has arrived since the last call.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
        self.clamp_selection();
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        debug!("[APP] {:?}", event);
        self.update_count += 1;
        match event {
            AppEvent::WatchlistLoaded(Ok(report)) => {
                self.status_message = Some(watchlist_status(&report));
            }
            AppEvent::WatchlistLoaded(Err(e)) => {
                self.status_message = Some(format!("Watchlist: {}", e.summary()));
            }
            AppEvent::SymbolAdded(Ok(AddOutcome::Ignored)) => {}
            AppEvent::SymbolAdded(Ok(AddOutcome::Added { symbol, reload })) => {
                self.symbol_input.clear();
                self.status_message = Some(match reload {
                    Ok(_) => format!("Added {}", symbol),
                    Err(e) => format!("Added {}, reload failed: {}", symbol, e.summary()),
                });
            }
            AppEvent::SymbolAdded(Err(e)) => {
                self.status_message = Some(format!("Could not add symbol: {}", e.summary()));
            }
            AppEvent::SymbolRemoved(Ok(outcome)) => {
                self.status_message = Some(match outcome.reload {
                    Ok(_) => format!("Removed {}", outcome.symbol),
                    Err(e) => format!("Removed {}, reload failed: {}", outcome.symbol, e.summary()),
                });
            }
            AppEvent::SymbolRemoved(Err(e)) => {
                self.status_message = Some(format!("Could not remove symbol: {}", e.summary()));
            }
            AppEvent::IndicatorsLoaded { symbol, result } => {
                if let Err(e) = result {
                    self.status_message = Some(format!("Indicators for {}: {}", symbol, e.summary()));
                }
            }
            AppEvent::SignalGenerated { symbol, result } => {
                self.status_message = Some(match result {
                    Ok(Applied::Stored) => {
                        let kind = self.dashboard.store().signal(&symbol).map(|s| s.signal);
                        match kind {
                            Some(kind) => format!("{}: {}", symbol, kind),
                            None => format!("{}: signal updated", symbol),
                        }
                    }
                    Ok(Applied::Discarded) => format!("{} left the watchlist", symbol),
                    Err(e) => format!("Signal for {}: {}", symbol, e.summary()),
                });
            }
            AppEvent::ScanFinished(Ok(summary)) => {
                info!("[APP] Scan finished with {} results", summary.results);
                self.status_message = None;
                self.alert = Some(BlockingAlert::info(
                    "Scan complete",
                    format!("Scan complete! Found {} signals.", summary.results),
                ));
            }
            AppEvent::ScanFinished(Err(e)) => {
                self.status_message = None;
                self.alert = Some(BlockingAlert::error(
                    "Scan failed",
                    format!("Scan failed: {}", e.summary()),
                ));
            }
            AppEvent::TradeLogLoaded(Ok(_)) => {}
            AppEvent::TradeLogLoaded(Err(e)) => {
                self.status_message = Some(format!("Trade log: {}", e.summary()));
            }
            AppEvent::HealthChecked(result) => {
                self.backend_healthy = Some(matches!(result, Ok(ref health) if health.is_healthy()));
            }
            AppEvent::AlertSent { symbol, result } => {
                self.status_message = Some(match result {
                    Ok(()) => format!("Alert sent for {}", symbol),
                    Err(e) => format!("Alert for {}: {}", symbol, e.summary()),
                });
            }
        }
    }

    // --- Keys ---

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        // A blocking alert swallows everything until it is dismissed.
        if self.alert.is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.dismiss_alert();
            }
            return;
        }

        if self.input_mode == InputMode::Editing {
            match key.code {
                KeyCode::Enter => self.submit_input(),
                KeyCode::Esc => self.cancel_input(),
                KeyCode::Backspace => {
                    self.symbol_input.pop();
                }
                KeyCode::Char(c) => self.symbol_input.push(c),
                _ => {}
            }
            return;
        }

        if self.current_page == AppPage::Login {
            match key.code {
                KeyCode::Enter => self.enter(),
                KeyCode::Char('q') => self.should_quit = true,
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::Right => self.next_page(),
            KeyCode::BackTab | KeyCode::Left => self.previous_page(),
            KeyCode::Char('1') => self.switch_page(AppPage::Watchlist),
            KeyCode::Char('2') => self.switch_page(AppPage::Signals),
            KeyCode::Char('3') => self.switch_page(AppPage::TradeLog),
            KeyCode::Char('r') => self.refresh_current_page(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            _ => self.handle_page_key(key.code),
        }
    }

    fn handle_page_key(&mut self, code: KeyCode) {
        match (self.current_page, code) {
            (AppPage::Watchlist, KeyCode::Char('a')) => self.begin_input(),
            (AppPage::Watchlist, KeyCode::Char('x') | KeyCode::Delete) => self.remove_selected(),
            (AppPage::Watchlist, KeyCode::Char('g')) => self.generate_selected(),
            (AppPage::Watchlist, KeyCode::Char('i')) => self.refresh_selected_indicators(),
            (AppPage::Watchlist, KeyCode::Char('s')) => self.scan_all(),
            (AppPage::Watchlist, KeyCode::Char('p')) => self.push_alert_selected(),
            _ => {}
        }
    }
}

fn clamp(selected: Option<usize>, len: usize) -> Option<usize> {
    match selected {
        _ if len == 0 => None,
        Some(index) if index >= len => Some(len - 1),
        other => other,
    }
}

fn watchlist_status(report: &WatchlistReport) -> String {
    let failed = report.indicators.failed.len();
    if failed == 0 {
        format!("Watchlist: {} symbols", report.entries)
    } else {
        format!(
            "Watchlist: {} symbols, indicators failed for {}",
            report.entries, failed
        )
    }
}

// src/store.rs - Normalized dashboard state keyed by symbol
//
// Indicator and signal data hang off the watchlist record for their symbol, so
// dropping a record drops everything derived from it. Every record carries a
// generation; per-symbol fetches hold a ticket for the generation they started
// under and their result is discarded if the record has since been removed or
// invalidated.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::types::{IndicatorSnapshot, Signal, TradeLogEntry, WatchlistEntry};

#[derive(Debug, Clone)]
pub struct SymbolRecord {
    pub entry: WatchlistEntry,
    pub indicators: Option<IndicatorSnapshot>,
    pub signal: Option<Signal>,
    generation: u64,
}

impl SymbolRecord {
    fn new(entry: WatchlistEntry, generation: u64) -> Self {
        Self {
            entry,
            indicators: None,
            signal: None,
            generation,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.entry.symbol
    }
}

/// Captured before a per-symbol request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    symbol: String,
    generation: u64,
}

impl FetchTicket {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Stored,
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Watchlist,
    TradeLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Populated,
}

/// Fetches are not serialized, so more than one can be in flight.
#[derive(Debug, Default, Clone, Copy)]
struct PanelStatus {
    in_flight: u32,
    loaded: bool,
}

impl PanelStatus {
    fn begin(&mut self) {
        self.in_flight += 1;
    }

    fn finish(&mut self, ok: bool) {
        self.in_flight = self.in_flight.saturating_sub(1);
        if ok {
            self.loaded = true;
        }
    }

    fn state(&self) -> FetchState {
        if self.in_flight > 0 {
            FetchState::Fetching
        } else if self.loaded {
            FetchState::Populated
        } else {
            FetchState::Idle
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WatchlistDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SignalReplacement {
    pub stored: usize,
    pub discarded: usize,
}

#[derive(Debug, Default)]
pub struct SymbolStore {
    order: Vec<String>,
    records: HashMap<String, SymbolRecord>,
    next_generation: u64,
    trade_log: Vec<TradeLogEntry>,
    scan_busy: bool,
    watchlist_status: PanelStatus,
    trade_log_status: PanelStatus,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    // --- Watchlist ---

    /// Replaces the watchlist wholesale. Records for symbols that survive keep
    /// their indicators and signal; records for symbols that vanished are dropped.
    pub fn replace_watchlist(&mut self, entries: Vec<WatchlistEntry>) -> WatchlistDiff {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut order = Vec::with_capacity(entries.len());
        let mut records = HashMap::with_capacity(entries.len());
        let mut added = Vec::new();

        for entry in entries {
            if !seen.insert(entry.symbol.clone()) {
                warn!("[STORE] Duplicate watchlist symbol {} ignored", entry.symbol);
                continue;
            }
            let symbol = entry.symbol.clone();
            let record = match self.records.remove(&symbol) {
                Some(mut existing) => {
                    existing.entry = entry;
                    existing
                }
                None => {
                    added.push(symbol.clone());
                    let generation = self.bump_generation();
                    SymbolRecord::new(entry, generation)
                }
            };
            order.push(symbol.clone());
            records.insert(symbol, record);
        }

        let removed: Vec<String> = self
            .order
            .iter()
            .filter(|symbol| !records.contains_key(*symbol))
            .cloned()
            .collect();

        self.order = order;
        self.records = records;

        if !added.is_empty() || !removed.is_empty() {
            debug!("[STORE] Watchlist +{:?} -{:?}", added, removed);
        }
        WatchlistDiff { added, removed }
    }

    /// Clears derived state for a symbol and retires every ticket issued for it.
    /// The watchlist entry itself stays until the next watchlist replacement.
    pub fn invalidate(&mut self, symbol: &str) -> bool {
        let generation = self.bump_generation();
        match self.records.get_mut(symbol) {
            Some(record) => {
                record.indicators = None;
                record.signal = None;
                record.generation = generation;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.records.contains_key(symbol)
    }

    /// Records in watchlist (fetch) order.
    pub fn entries(&self) -> impl Iterator<Item = &SymbolRecord> + '_ {
        self.order.iter().filter_map(move |symbol| self.records.get(symbol))
    }

    pub fn record(&self, symbol: &str) -> Option<&SymbolRecord> {
        self.records.get(symbol)
    }

    pub fn symbol_at(&self, index: usize) -> Option<&str> {
        self.order.get(index).map(String::as_str)
    }

    // --- Tickets ---

    pub fn ticket(&self, symbol: &str) -> Option<FetchTicket> {
        self.records.get(symbol).map(|record| FetchTicket {
            symbol: symbol.to_string(),
            generation: record.generation,
        })
    }

    pub fn tickets(&self) -> Vec<FetchTicket> {
        self.entries()
            .map(|record| FetchTicket {
                symbol: record.entry.symbol.clone(),
                generation: record.generation,
            })
            .collect()
    }

    fn current_record_mut(&mut self, ticket: &FetchTicket) -> Option<&mut SymbolRecord> {
        self.records
            .get_mut(&ticket.symbol)
            .filter(|record| record.generation == ticket.generation)
    }

    // --- Indicators ---

    pub fn apply_indicators(&mut self, ticket: &FetchTicket, snapshot: IndicatorSnapshot) -> Applied {
        match self.current_record_mut(ticket) {
            Some(record) => {
                record.indicators = Some(snapshot);
                Applied::Stored
            }
            None => {
                debug!("[STORE] Dropping stale indicators for {}", ticket.symbol);
                Applied::Discarded
            }
        }
    }

    pub fn indicators(&self, symbol: &str) -> Option<&IndicatorSnapshot> {
        self.records.get(symbol).and_then(|record| record.indicators.as_ref())
    }

    // --- Signals ---

    pub fn apply_signal(&mut self, ticket: &FetchTicket, signal: Signal) -> Applied {
        match self.current_record_mut(ticket) {
            Some(record) => {
                record.signal = Some(signal);
                Applied::Stored
            }
            None => {
                debug!("[STORE] Dropping stale signal for {}", ticket.symbol);
                Applied::Discarded
            }
        }
    }

    /// Replaces every signal with `results`. Only symbols whose ticket (taken
    /// when the scan started) is still current receive a signal; everything
    /// else ends up without one.
    pub fn replace_signals(&mut self, tickets: &[FetchTicket], results: Vec<Signal>) -> SignalReplacement {
        for record in self.records.values_mut() {
            record.signal = None;
        }

        let by_symbol: HashMap<&str, &FetchTicket> =
            tickets.iter().map(|ticket| (ticket.symbol(), ticket)).collect();

        let mut replacement = SignalReplacement::default();
        for signal in results {
            let applied = match by_symbol.get(signal.symbol.as_str()).copied() {
                Some(ticket) => self.apply_signal(ticket, signal),
                None => {
                    debug!("[STORE] Scan result for {} is not on the watchlist", signal.symbol);
                    Applied::Discarded
                }
            };
            match applied {
                Applied::Stored => replacement.stored += 1,
                Applied::Discarded => replacement.discarded += 1,
            }
        }
        replacement
    }

    pub fn signal(&self, symbol: &str) -> Option<&Signal> {
        self.records.get(symbol).and_then(|record| record.signal.as_ref())
    }

    /// Signals in watchlist order.
    pub fn signals(&self) -> Vec<&Signal> {
        self.entries().filter_map(|record| record.signal.as_ref()).collect()
    }

    // --- Trade log ---

    pub fn replace_trade_log(&mut self, trades: Vec<TradeLogEntry>) {
        self.trade_log = trades;
    }

    pub fn trade_log(&self) -> &[TradeLogEntry] {
        &self.trade_log
    }

    // --- Busy / fetch state ---

    /// Returns false when a scan is already running.
    pub fn begin_scan(&mut self) -> bool {
        if self.scan_busy {
            return false;
        }
        self.scan_busy = true;
        true
    }

    pub fn end_scan(&mut self) {
        self.scan_busy = false;
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_busy
    }

    pub fn begin_fetch(&mut self, panel: Panel) {
        self.panel_status_mut(panel).begin();
    }

    pub fn finish_fetch(&mut self, panel: Panel, ok: bool) {
        self.panel_status_mut(panel).finish(ok);
    }

    pub fn fetch_state(&self, panel: Panel) -> FetchState {
        match panel {
            Panel::Watchlist => self.watchlist_status.state(),
            Panel::TradeLog => self.trade_log_status.state(),
        }
    }

    fn panel_status_mut(&mut self, panel: Panel) -> &mut PanelStatus {
        match panel {
            Panel::Watchlist => &mut self.watchlist_status,
            Panel::TradeLog => &mut self.trade_log_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SignalKind;

    fn entry(symbol: &str) -> WatchlistEntry {
        WatchlistEntry {
            symbol: symbol.to_string(),
            instrument_token: format!("tok_{}", symbol),
        }
    }

    fn snapshot(symbol: &str, rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            symbol: symbol.to_string(),
            ltp: 100.0,
            rsi,
            vwap: 99.5,
            pivot: 98.0,
            bc: 97.5,
            tc: 98.5,
        }
    }

    fn signal(symbol: &str, kind: SignalKind) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            signal: kind,
            entry_price: 100.0,
            target: 101.0,
            stop_loss: 99.5,
            notes: String::new(),
        }
    }

    fn store_with(symbols: &[&str]) -> SymbolStore {
        let mut store = SymbolStore::new();
        store.replace_watchlist(symbols.iter().map(|s| entry(s)).collect());
        store
    }

    #[test]
    fn test_replace_watchlist_keeps_fetch_order_and_reports_diff() {
        let mut store = store_with(&["TCS", "INFY", "RELIANCE"]);
        let order: Vec<_> = store.entries().map(|r| r.symbol().to_string()).collect();
        assert_eq!(order, vec!["TCS", "INFY", "RELIANCE"]);

        let diff = store.replace_watchlist(vec![entry("INFY"), entry("HDFCBANK")]);
        assert_eq!(diff.added, vec!["HDFCBANK"]);
        assert_eq!(diff.removed, vec!["TCS", "RELIANCE"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_surviving_symbols_keep_derived_state() {
        let mut store = store_with(&["TCS", "INFY"]);
        let ticket = store.ticket("TCS").unwrap();
        store.apply_indicators(&ticket, snapshot("TCS", 42.0));

        store.replace_watchlist(vec![entry("TCS")]);
        assert_eq!(store.indicators("TCS").map(|s| s.rsi), Some(42.0));
        assert!(!store.contains("INFY"));
    }

    #[test]
    fn test_duplicate_symbols_collapse_to_first() {
        let mut store = SymbolStore::new();
        let mut second = entry("TCS");
        second.instrument_token = "other".to_string();
        store.replace_watchlist(vec![entry("TCS"), second]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.record("TCS").unwrap().entry.instrument_token, "tok_TCS");
    }

    #[test]
    fn test_invalidate_purges_derived_state() {
        let mut store = store_with(&["TCS"]);
        let ticket = store.ticket("TCS").unwrap();
        store.apply_indicators(&ticket, snapshot("TCS", 50.0));
        store.apply_signal(&ticket, signal("TCS", SignalKind::Buy));

        assert!(store.invalidate("TCS"));
        assert!(store.indicators("TCS").is_none());
        assert!(store.signal("TCS").is_none());
        assert!(store.contains("TCS"));
    }

    #[test]
    fn test_stale_ticket_cannot_resurrect_removed_symbol() {
        let mut store = store_with(&["TCS", "INFY"]);
        let in_flight = store.ticket("TCS").unwrap();

        store.invalidate("TCS");
        store.replace_watchlist(vec![entry("INFY")]);
        assert_eq!(
            store.apply_indicators(&in_flight, snapshot("TCS", 20.0)),
            Applied::Discarded
        );
        assert!(!store.contains("TCS"));

        // Re-adding the symbol does not revive the old ticket either.
        store.replace_watchlist(vec![entry("INFY"), entry("TCS")]);
        assert_eq!(
            store.apply_indicators(&in_flight, snapshot("TCS", 20.0)),
            Applied::Discarded
        );
        assert!(store.indicators("TCS").is_none());

        let fresh = store.ticket("TCS").unwrap();
        assert_eq!(store.apply_indicators(&fresh, snapshot("TCS", 21.0)), Applied::Stored);
    }

    #[test]
    fn test_replace_signals_discards_previous_and_unknown() {
        let mut store = store_with(&["TCS", "INFY", "RELIANCE"]);
        let infy = store.ticket("INFY").unwrap();
        store.apply_signal(&infy, signal("INFY", SignalKind::Sell));

        let tickets = store.tickets();
        let replacement = store.replace_signals(
            &tickets,
            vec![signal("TCS", SignalKind::Buy), signal("WIPRO", SignalKind::Hold)],
        );

        assert_eq!(replacement, SignalReplacement { stored: 1, discarded: 1 });
        let signals = store.signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].symbol, "TCS");
        assert!(store.signal("INFY").is_none());
    }

    #[test]
    fn test_scan_busy_flag_rejects_overlap() {
        let mut store = SymbolStore::new();
        assert!(store.begin_scan());
        assert!(!store.begin_scan());
        store.end_scan();
        assert!(!store.is_scanning());
        assert!(store.begin_scan());
    }

    #[test]
    fn test_fetch_state_transitions() {
        let mut store = SymbolStore::new();
        assert_eq!(store.fetch_state(Panel::TradeLog), FetchState::Idle);

        store.begin_fetch(Panel::TradeLog);
        assert_eq!(store.fetch_state(Panel::TradeLog), FetchState::Fetching);
        store.finish_fetch(Panel::TradeLog, false);
        assert_eq!(store.fetch_state(Panel::TradeLog), FetchState::Idle);

        store.begin_fetch(Panel::TradeLog);
        store.begin_fetch(Panel::TradeLog);
        store.finish_fetch(Panel::TradeLog, true);
        assert_eq!(store.fetch_state(Panel::TradeLog), FetchState::Fetching);
        store.finish_fetch(Panel::TradeLog, false);
        assert_eq!(store.fetch_state(Panel::TradeLog), FetchState::Populated);
        assert_eq!(store.fetch_state(Panel::Watchlist), FetchState::Idle);
    }
}

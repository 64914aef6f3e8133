// src/types.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// --- Domain ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub symbol: String,
    pub instrument_token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    pub symbol: String,
    pub ltp: f64,
    pub rsi: f64,
    pub vwap: f64,
    pub pivot: f64,
    pub bc: f64,
    pub tc: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalKind {
    Buy,
    Sell,
    Hold,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Buy => "BUY",
            SignalKind::Sell => "SELL",
            SignalKind::Hold => "HOLD",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Signal {
    pub symbol: String,
    pub signal: SignalKind,
    pub entry_price: f64,
    pub target: f64,
    pub stop_loss: f64,
    #[serde(default)]
    pub notes: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl<'de> Deserialize<'de> for TradeStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        match raw.trim().to_ascii_uppercase().as_str() {
            "OPEN" => Ok(TradeStatus::Open),
            "CLOSED" => Ok(TradeStatus::Closed),
            other => Err(D::Error::custom(format!("unknown trade status '{}'", other))),
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => f.write_str("OPEN"),
            TradeStatus::Closed => f.write_str("CLOSED"),
        }
    }
}

/// One row of the backend's trade log. Rows are read back from a spreadsheet,
/// so prices may arrive as strings.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct TradeLogEntry {
    pub timestamp: String,
    pub symbol: String,
    pub signal: SignalKind,
    #[serde(default, deserialize_with = "lenient_price")]
    pub entry_price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub target: Option<f64>,
    #[serde(default, deserialize_with = "lenient_price")]
    pub stop_loss: Option<f64>,
    pub status: TradeStatus,
}

impl TradeLogEntry {
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Timestamp formatted for the table, falling back to the raw text.
    pub fn display_time(&self) -> String {
        match self.parsed_timestamp() {
            Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.timestamp.clone(),
        }
    }
}

/// Presentation tone for an RSI reading. Bounds are strict: 30 and 70 are neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RsiTone {
    Oversold,
    Neutral,
    Overbought,
}

impl RsiTone {
    pub const OVERSOLD_BELOW: f64 = 30.0;
    pub const OVERBOUGHT_ABOVE: f64 = 70.0;

    pub fn classify(rsi: f64) -> Self {
        if rsi < Self::OVERSOLD_BELOW {
            RsiTone::Oversold
        } else if rsi > Self::OVERBOUGHT_ABOVE {
            RsiTone::Overbought
        } else {
            RsiTone::Neutral
        }
    }
}

// --- Wire: requests ---

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WatchlistAction {
    Add,
    Remove,
}

#[derive(Serialize, Debug, Clone)]
pub struct WatchlistRequest {
    pub symbols: Vec<String>,
    pub action: WatchlistAction,
}

#[derive(Serialize, Debug, Clone)]
pub struct SignalRequest {
    pub symbol: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub symbol: String,
    pub signal: SignalKind,
    pub price: f64,
    pub target: f64,
    pub stop_loss: f64,
    pub notes: String,
}

impl From<&Signal> for AlertRequest {
    fn from(signal: &Signal) -> Self {
        Self {
            symbol: signal.symbol.clone(),
            signal: signal.signal,
            price: signal.entry_price,
            target: signal.target,
            stop_loss: signal.stop_loss,
            notes: signal.notes.clone(),
        }
    }
}

// --- Wire: responses ---

#[derive(Deserialize, Debug)]
pub struct WatchlistResponse {
    pub watchlist: Vec<WatchlistEntry>,
}

#[derive(Deserialize, Debug)]
pub struct IndicatorResponse {
    pub ltp: f64,
    pub rsi: f64,
    pub vwap: f64,
    pub pivot: f64,
    pub bc: f64,
    pub tc: f64,
}

impl IndicatorResponse {
    pub fn into_snapshot(self, symbol: &str) -> IndicatorSnapshot {
        IndicatorSnapshot {
            symbol: symbol.to_string(),
            ltp: self.ltp,
            rsi: self.rsi,
            vwap: self.vwap,
            pivot: self.pivot,
            bc: self.bc,
            tc: self.tc,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct SignalResponse {
    pub signal: SignalKind,
    pub entry_price: f64,
    pub target: f64,
    pub stop_loss: f64,
    #[serde(default)]
    pub notes: String,
}

impl SignalResponse {
    pub fn into_signal(self, symbol: &str) -> Signal {
        Signal {
            symbol: symbol.to_string(),
            signal: self.signal,
            entry_price: self.entry_price,
            target: self.target,
            stop_loss: self.stop_loss,
            notes: self.notes,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct ScanResponse {
    #[serde(default)]
    pub results: Vec<Signal>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct TradeLogResponse {
    #[serde(default)]
    pub trades: Vec<TradeLogEntry>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Empty spreadsheet cells arrive as `""` and become `None`.
fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| D::Error::custom(format!("invalid number '{}': {}", s, e))),
    }
}

// tests/common/mod.rs
//
// In-process stand-in for the signal backend. Records every request so tests
// can assert on what the client actually sent.

#![allow(dead_code)]

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use signal_dashboard::{Dashboard, DashboardConfig};

#[derive(Default)]
pub struct MockState {
    pub watchlist: Vec<(String, String)>,
    pub requests: Vec<String>,
    pub watchlist_posts: Vec<Value>,
    pub alert_posts: Vec<Value>,
    /// Per-symbol indicator payloads; symbols without one get a neutral default.
    pub indicators: HashMap<String, Value>,
    pub scan_response: Value,
    /// Body returned from `/trade-log`; `None` means `{}`.
    pub trades: Option<Value>,
    /// Endpoint names ("watchlist", "scan-all", ...) that answer 500.
    pub failing: HashSet<&'static str>,
    /// Indicator requests for these symbols wait until notified.
    pub indicator_gates: HashMap<String, Arc<Notify>>,
    pub indicator_delay: Option<Duration>,
}

pub type Shared = Arc<Mutex<MockState>>;

pub struct MockBackend {
    pub url: String,
    pub state: Shared,
    pub indicators_in_flight: Arc<AtomicUsize>,
    pub max_indicators_in_flight: Arc<AtomicUsize>,
}

impl MockBackend {
    pub async fn start(state: MockState) -> Self {
        let shared: Shared = Arc::new(Mutex::new(state));
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        let app = Router::new()
            .route("/api/watchlist", get(get_watchlist).post(post_watchlist))
            .route("/api/indicators", get(get_indicators))
            .route("/api/signal", post(post_signal))
            .route("/api/scan-all", post(post_scan_all))
            .route("/api/trade-log", get(get_trade_log))
            .route("/api/health", get(get_health))
            .route("/api/alert", post(post_alert))
            .with_state(Ctx {
                state: shared.clone(),
                in_flight: in_flight.clone(),
                max_in_flight: max_in_flight.clone(),
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("http://{}", addr),
            state: shared,
            indicators_in_flight: in_flight,
            max_indicators_in_flight: max_in_flight,
        }
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(&DashboardConfig::new(self.url.clone())).unwrap()
    }

    pub fn dashboard_with_concurrency(&self, scan_concurrency: usize) -> Dashboard {
        let config = DashboardConfig::new(self.url.clone()).with_scan_concurrency(scan_concurrency);
        Dashboard::new(&config).unwrap()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, request: &str) -> usize {
        self.requests().iter().filter(|r| r.as_str() == request).count()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    pub fn set_failing(&self, endpoint: &'static str, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.failing.insert(endpoint);
        } else {
            state.failing.remove(endpoint);
        }
    }

    pub fn gate_indicators(&self, symbol: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .indicator_gates
            .insert(symbol.to_string(), gate.clone());
        gate
    }

    /// Polls until `request` has been seen at least once.
    pub async fn wait_for(&self, request: &str) {
        for _ in 0..200 {
            if self.count(request) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("request '{}' never arrived; saw {:?}", request, self.requests());
    }
}

pub fn state_with_watchlist(symbols: &[(&str, &str)]) -> MockState {
    MockState {
        watchlist: symbols
            .iter()
            .map(|(s, t)| (s.to_string(), t.to_string()))
            .collect(),
        scan_response: json!({ "message": "Scanned 0 symbols", "results": [] }),
        ..MockState::default()
    }
}

pub fn default_watchlist() -> MockState {
    state_with_watchlist(&[("RELIANCE", "2885"), ("TCS", "11536"), ("INFY", "1594")])
}

pub fn indicator_payload(rsi: f64) -> Value {
    json!({
        "symbol": "IGNORED",
        "ltp": 1500.25,
        "rsi": rsi,
        "vwap": 1498.10,
        "pivot": 1490.0,
        "bc": 1488.5,
        "tc": 1491.5,
        "timestamp": "2025-06-02T03:30:00Z"
    })
}

pub fn signal_payload(symbol: &str, signal: &str) -> Value {
    json!({
        "symbol": symbol,
        "signal": signal,
        "entry_price": 100.0,
        "target": 101.0,
        "stop_loss": 99.5,
        "notes": format!("{} setup", signal),
        "timestamp": "2025-06-02T03:30:00Z"
    })
}

#[derive(Clone)]
struct Ctx {
    state: Shared,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

type Reply = (StatusCode, Json<Value>);

fn failure() -> Reply {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "mock failure" })),
    )
}

fn ok(body: Value) -> Reply {
    (StatusCode::OK, Json(body))
}

fn record(ctx: &Ctx, endpoint: &str, request: String) -> bool {
    let mut state = ctx.state.lock().unwrap();
    state.requests.push(request);
    state.failing.contains(endpoint)
}

async fn get_watchlist(State(ctx): State<Ctx>) -> Reply {
    if record(&ctx, "watchlist", "GET /api/watchlist".to_string()) {
        return failure();
    }
    let state = ctx.state.lock().unwrap();
    let entries: Vec<Value> = state
        .watchlist
        .iter()
        .map(|(symbol, token)| json!({ "symbol": symbol, "instrument_token": token }))
        .collect();
    ok(json!({ "watchlist": entries }))
}

async fn post_watchlist(State(ctx): State<Ctx>, Json(body): Json<Value>) -> Reply {
    if record(&ctx, "watchlist-update", "POST /api/watchlist".to_string()) {
        return failure();
    }
    let mut state = ctx.state.lock().unwrap();
    state.watchlist_posts.push(body.clone());

    let symbols: Vec<String> = body["symbols"]
        .as_array()
        .map(|a| a.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    match body["action"].as_str() {
        Some("add") => {
            for symbol in symbols {
                if !state.watchlist.iter().any(|(s, _)| *s == symbol) {
                    let token = format!("dummy_{}", symbol);
                    state.watchlist.push((symbol, token));
                }
            }
        }
        Some("remove") => state.watchlist.retain(|(s, _)| !symbols.contains(s)),
        _ => {}
    }
    ok(json!({ "message": "Watchlist updated" }))
}

async fn get_indicators(
    State(ctx): State<Ctx>,
    Query(params): Query<HashMap<String, String>>,
) -> Reply {
    let symbol = params.get("symbol").cloned().unwrap_or_default();
    if record(&ctx, "indicators", format!("GET /api/indicators?symbol={}", symbol)) {
        return failure();
    }

    let (gate, delay, payload) = {
        let state = ctx.state.lock().unwrap();
        if !state.watchlist.iter().any(|(s, _)| *s == symbol) {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({ "detail": "Symbol not found in watchlist" })),
            );
        }
        (
            state.indicator_gates.get(&symbol).cloned(),
            state.indicator_delay,
            state
                .indicators
                .get(&symbol)
                .cloned()
                .unwrap_or_else(|| indicator_payload(50.0)),
        )
    };

    let now = ctx.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    ctx.max_in_flight.fetch_max(now, Ordering::SeqCst);
    if let Some(gate) = gate {
        gate.notified().await;
    }
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    ctx.in_flight.fetch_sub(1, Ordering::SeqCst);

    ok(payload)
}

async fn post_signal(State(ctx): State<Ctx>, Json(body): Json<Value>) -> Reply {
    let symbol = body["symbol"].as_str().unwrap_or_default().to_string();
    if record(&ctx, "signal", format!("POST /api/signal {}", symbol)) {
        return failure();
    }
    ok(signal_payload(&symbol, "SELL"))
}

async fn post_scan_all(State(ctx): State<Ctx>) -> Reply {
    if record(&ctx, "scan-all", "POST /api/scan-all".to_string()) {
        return failure();
    }
    let state = ctx.state.lock().unwrap();
    ok(state.scan_response.clone())
}

async fn get_trade_log(State(ctx): State<Ctx>) -> Reply {
    if record(&ctx, "trade-log", "GET /api/trade-log".to_string()) {
        return failure();
    }
    let state = ctx.state.lock().unwrap();
    ok(state.trades.clone().unwrap_or_else(|| json!({})))
}

async fn get_health(State(ctx): State<Ctx>) -> Reply {
    if record(&ctx, "health", "GET /api/health".to_string()) {
        return failure();
    }
    ok(json!({ "status": "healthy", "timestamp": "2025-06-02T03:30:00Z" }))
}

async fn post_alert(State(ctx): State<Ctx>, Json(body): Json<Value>) -> Reply {
    if record(&ctx, "alert", "POST /api/alert".to_string()) {
        return failure();
    }
    ctx.state.lock().unwrap().alert_posts.push(body);
    ok(json!({ "message": "Alert sent successfully" }))
}

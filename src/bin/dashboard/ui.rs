// src/bin/dashboard/ui.rs - Rendering for the login gate and dashboard tabs
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs, Wrap},
    Frame,
};

use signal_dashboard::store::{FetchState, Panel};
use signal_dashboard::types::RsiTone;

use crate::app::App;
use crate::types::{rsi_color, signal_color, status_color, AppPage, InputMode};

pub fn ui(f: &mut Frame, app: &App) {
    let size = f.size();
    if app.current_page == AppPage::Login {
        render_login(f, size);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + tabs
            Constraint::Min(5),    // Page body
            Constraint::Length(1), // Status line
            Constraint::Length(3), // Controls
        ])
        .split(size);

    render_header(f, app, chunks[0]);
    match app.current_page {
        AppPage::Watchlist => render_watchlist_page(f, app, chunks[1]),
        AppPage::Signals => render_signals_page(f, app, chunks[1]),
        AppPage::TradeLog => render_trade_log_page(f, app, chunks[1]),
        AppPage::Login => {}
    }
    render_status_line(f, app, chunks[2]);
    render_help(f, app, chunks[3]);

    if app.alert.is_some() {
        render_alert_popup(f, app, size);
    }
}

fn render_login(f: &mut Frame, area: Rect) {
    let popup = centered_rect(44, 9, area);
    f.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .title("📈 Stock Signal Dashboard")
        .title_alignment(Alignment::Center)
        .border_style(Style::default().fg(Color::Cyan));

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "Watchlist · Indicators · Signals · Trade Log",
            Style::default().fg(Color::Gray),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::White)),
            Span::styled(
                "Enter",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" to continue", Style::default().fg(Color::White)),
        ]),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::White)),
            Span::styled("'q'", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::styled(" to quit", Style::default().fg(Color::White)),
        ]),
    ];

    let login = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center);
    f.render_widget(login, popup);
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let header_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(44)])
        .split(area);

    let titles: Vec<Line> = AppPage::TABS
        .iter()
        .enumerate()
        .map(|(i, page)| Line::from(format!("{} {}", i + 1, page.title())))
        .collect();

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("📈 Stock Signal Dashboard")
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(app.current_page.tab_index().unwrap_or(0))
        .style(Style::default().fg(Color::Gray))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(tabs, header_chunks[0]);

    let (health_text, health_color) = match app.backend_healthy {
        Some(true) => ("🟢 API", Color::Green),
        Some(false) => ("🔴 API", Color::Red),
        None => ("⚪ API", Color::Gray),
    };
    let scanning = app.dashboard.store().is_scanning();

    let mut spans = vec![
        Span::styled(health_text, Style::default().fg(health_color)),
        Span::raw(" | "),
        Span::styled(
            format!("Updates: {}", app.update_count),
            Style::default().fg(Color::White),
        ),
    ];
    if scanning {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(
            "⏳ Scanning",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));
    }

    let status = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(app.dashboard.api().base_url().to_string())
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .alignment(Alignment::Center);
    f.render_widget(status, header_chunks[1]);
}

fn header_row(headers: &[&'static str]) -> Row<'static> {
    let cells = headers.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells).height(1).bottom_margin(1)
}

fn panel_title(base: &str, state: FetchState) -> String {
    match state {
        FetchState::Fetching => format!("{} (loading...)", base),
        FetchState::Idle | FetchState::Populated => base.to_string(),
    }
}

fn price_cell(value: Option<f64>) -> Cell<'static> {
    match value {
        Some(v) => Cell::from(format!("{:.2}", v)).style(Style::default().fg(Color::White)),
        None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
    }
}

fn render_watchlist_page(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let editing = app.input_mode == InputMode::Editing;
    let input = Paragraph::new(app.symbol_input.as_str())
        .style(if editing {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(if editing {
                    "➕ Add Symbol (Enter to add, Esc to cancel)"
                } else {
                    "➕ Add Symbol (press 'a')"
                })
                .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::Gray })),
        );
    f.render_widget(input, chunks[0]);
    if editing {
        let cursor_x = chunks[0].x + 1 + app.symbol_input.chars().count() as u16;
        f.set_cursor(cursor_x.min(chunks[0].right().saturating_sub(2)), chunks[0].y + 1);
    }

    let store = app.dashboard.store();
    let table_block = Block::default()
        .borders(Borders::ALL)
        .title(panel_title(
            &format!("📋 Watchlist ({})", store.len()),
            store.fetch_state(Panel::Watchlist),
        ))
        .border_style(Style::default().fg(Color::Green));

    if store.is_empty() {
        let empty = Paragraph::new("Watchlist is empty. Press 'a' to add a symbol.")
            .block(table_block)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(empty, chunks[1]);
        return;
    }

    let header = header_row(&[
        "Symbol", "Token", "LTP", "RSI", "VWAP", "Pivot", "BC", "TC", "Signal",
    ]);

    let rows: Vec<Row> = store
        .entries()
        .enumerate()
        .map(|(index, record)| {
            let ind = record.indicators.as_ref();
            let rsi_cell = match ind {
                Some(snapshot) => Cell::from(format!("{:.2}", snapshot.rsi)).style(
                    Style::default()
                        .fg(rsi_color(RsiTone::classify(snapshot.rsi)))
                        .add_modifier(Modifier::BOLD),
                ),
                None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
            };
            let signal_cell = match &record.signal {
                Some(signal) => Cell::from(signal.signal.as_str())
                    .style(Style::default().fg(signal_color(signal.signal))),
                None => Cell::from("-").style(Style::default().fg(Color::DarkGray)),
            };

            let row_style = if Some(index) == app.selected_symbol_index {
                Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            Row::new(vec![
                Cell::from(record.entry.symbol.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(record.entry.instrument_token.clone())
                    .style(Style::default().fg(Color::Gray)),
                price_cell(ind.map(|s| s.ltp)),
                rsi_cell,
                price_cell(ind.map(|s| s.vwap)),
                price_cell(ind.map(|s| s.pivot)),
                price_cell(ind.map(|s| s.bc)),
                price_cell(ind.map(|s| s.tc)),
                signal_cell,
            ])
            .style(row_style)
        })
        .collect();

    let widths = vec![
        Constraint::Length(12), // Symbol
        Constraint::Length(10), // Token
        Constraint::Length(10), // LTP
        Constraint::Length(7),  // RSI
        Constraint::Length(10), // VWAP
        Constraint::Length(10), // Pivot
        Constraint::Length(10), // BC
        Constraint::Length(10), // TC
        Constraint::Min(6),     // Signal
    ];

    let table = Table::new(rows)
        .header(header)
        .block(table_block)
        .widths(&widths);
    f.render_widget(table, chunks[1]);
}

fn render_signals_page(f: &mut Frame, app: &App, area: Rect) {
    let store = app.dashboard.store();
    let signals = store.signals();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("🎯 Signals ({})", signals.len()))
        .border_style(Style::default().fg(Color::Magenta));

    if signals.is_empty() {
        let empty = Paragraph::new(
            "No signals yet. Generate one from the watchlist ('g') or run a scan ('s').",
        )
        .block(block)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
        f.render_widget(empty, area);
        return;
    }

    let header = header_row(&["Symbol", "Signal", "Entry", "Target", "Stop Loss", "Notes"]);

    let rows: Vec<Row> = signals
        .iter()
        .map(|signal| {
            Row::new(vec![
                Cell::from(signal.symbol.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(signal.signal.as_str()).style(
                    Style::default()
                        .fg(signal_color(signal.signal))
                        .add_modifier(Modifier::BOLD),
                ),
                price_cell(Some(signal.entry_price)),
                price_cell(Some(signal.target)),
                price_cell(Some(signal.stop_loss)),
                Cell::from(signal.notes.clone()).style(Style::default().fg(Color::Gray)),
            ])
        })
        .collect();

    let widths = vec![
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Min(20),
    ];

    let table = Table::new(rows)
        .header(header)
        .block(block)
        .widths(&widths);
    f.render_widget(table, area);
}

fn render_trade_log_page(f: &mut Frame, app: &App, area: Rect) {
    let store = app.dashboard.store();
    let trades = store.trade_log();

    let block = Block::default()
        .borders(Borders::ALL)
        .title(panel_title(
            &format!("📒 Trade Log ({})", trades.len()),
            store.fetch_state(Panel::TradeLog),
        ))
        .border_style(Style::default().fg(Color::Blue));

    if trades.is_empty() {
        let empty = Paragraph::new("No trades logged yet. Press 'r' to refresh.")
            .block(block)
            .style(Style::default().fg(Color::Gray))
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let header = header_row(&[
        "Time", "Symbol", "Signal", "Entry", "Target", "Stop Loss", "Status",
    ]);

    // Fetch order, no sorting.
    let rows: Vec<Row> = trades
        .iter()
        .map(|trade| {
            Row::new(vec![
                Cell::from(trade.display_time()).style(Style::default().fg(Color::Gray)),
                Cell::from(trade.symbol.clone()).style(Style::default().fg(Color::Cyan)),
                Cell::from(trade.signal.as_str())
                    .style(Style::default().fg(signal_color(trade.signal))),
                price_cell(trade.entry_price),
                price_cell(trade.target),
                price_cell(trade.stop_loss),
                Cell::from(trade.status.to_string())
                    .style(Style::default().fg(status_color(trade.status))),
            ])
        })
        .collect();

    let widths = vec![
        Constraint::Length(20),
        Constraint::Length(12),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Min(7),
    ];

    let table = Table::new(rows)
        .header(header)
        .block(block)
        .widths(&widths);
    f.render_widget(table, area);
}

fn render_status_line(f: &mut Frame, app: &App, area: Rect) {
    let text = app.status_message.as_deref().unwrap_or("");
    let status = Paragraph::new(text).style(Style::default().fg(Color::Yellow));
    f.render_widget(status, area);
}

fn render_help(f: &mut Frame, app: &App, area: Rect) {
    let help_block = Block::default()
        .borders(Borders::ALL)
        .title("🔧 Controls")
        .border_style(Style::default().fg(Color::Gray));

    let help_text = match app.current_page {
        AppPage::Watchlist => {
            "'a' add | 'x' remove | 'g' signal | 'i' indicators | 's' scan | 'p' alert | ↑↓ select | 'r' refresh | Tab | 'q' quit"
        }
        AppPage::Signals => "Tab switch | 'q' quit",
        AppPage::TradeLog => "'r' refresh | Tab switch | 'q' quit",
        AppPage::Login => "Enter continue | 'q' quit",
    };

    let help = Paragraph::new(help_text)
        .block(help_block)
        .style(Style::default().fg(Color::Gray))
        .alignment(Alignment::Center);
    f.render_widget(help, area);
}

fn render_alert_popup(f: &mut Frame, app: &App, area: Rect) {
    let Some(alert) = &app.alert else {
        return;
    };
    let popup_area = centered_rect(50, 7, area);
    f.render_widget(Clear, popup_area);

    let color = if alert.is_error { Color::Red } else { Color::Green };
    let popup_block = Block::default()
        .borders(Borders::ALL)
        .title(alert.title.as_str())
        .title_alignment(Alignment::Center)
        .border_style(Style::default().fg(color).add_modifier(Modifier::BOLD));

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(alert.message.as_str(), Style::default().fg(Color::White))),
        Line::from(""),
        Line::from(vec![
            Span::styled("Press ", Style::default().fg(Color::White)),
            Span::styled(
                "Enter",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" to dismiss", Style::default().fg(Color::White)),
        ]),
    ];

    let popup = Paragraph::new(lines)
        .block(popup_block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(popup, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockingAlert;
    use ratatui::{backend::TestBackend, Terminal};
    use signal_dashboard::{Dashboard, DashboardConfig};

    fn test_app() -> App {
        let dashboard = Dashboard::new(&DashboardConfig::new("http://127.0.0.1:9")).unwrap();
        App::new(dashboard, None)
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[test]
    fn test_login_screen_prompts_for_enter() {
        let app = test_app();
        let screen = render(&app);
        assert!(screen.contains("Press Enter to continue"));
    }

    #[test]
    fn test_empty_trade_log_shows_empty_state() {
        let mut app = test_app();
        app.session.enter();
        app.current_page = AppPage::TradeLog;
        let screen = render(&app);
        assert!(screen.contains("No trades logged yet"));
    }

    #[test]
    fn test_empty_signals_shows_empty_state() {
        let mut app = test_app();
        app.session.enter();
        app.current_page = AppPage::Signals;
        let screen = render(&app);
        assert!(screen.contains("No signals yet"));
    }

    #[test]
    fn test_alert_popup_is_drawn() {
        let mut app = test_app();
        app.session.enter();
        app.current_page = AppPage::Watchlist;
        app.alert = Some(BlockingAlert::info("Scan complete", "Scan complete! Found 3 signals."));
        let screen = render(&app);
        assert!(screen.contains("Found 3 signals."));
    }

    #[test]
    fn test_signals_help_lists_no_actions() {
        let mut app = test_app();
        app.session.enter();
        app.current_page = AppPage::Signals;
        let screen = render(&app);
        assert!(screen.contains("Tab switch | 'q' quit"));
        assert!(!screen.contains("push alert"));
    }

    #[test]
    fn test_centered_rect_fits_small_area() {
        let rect = centered_rect(50, 7, Rect::new(0, 0, 20, 5));
        assert_eq!(rect, Rect::new(0, 0, 20, 5));
    }
}

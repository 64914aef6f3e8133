// src/bin/dashboard/types.rs - Type definitions for the dashboard
use ratatui::style::Color;
use signal_dashboard::types::{RsiTone, SignalKind, TradeStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPage {
    Login,
    Watchlist,
    Signals,
    TradeLog,
}

impl AppPage {
    pub const TABS: [AppPage; 3] = [AppPage::Watchlist, AppPage::Signals, AppPage::TradeLog];

    pub fn title(&self) -> &'static str {
        match self {
            AppPage::Login => "Login",
            AppPage::Watchlist => "Watchlist",
            AppPage::Signals => "Signals",
            AppPage::TradeLog => "Trade Log",
        }
    }

    pub fn tab_index(&self) -> Option<usize> {
        Self::TABS.iter().position(|page| page == self)
    }

    pub fn next(&self) -> AppPage {
        match self.tab_index() {
            Some(i) => Self::TABS[(i + 1) % Self::TABS.len()],
            None => *self,
        }
    }

    pub fn previous(&self) -> AppPage {
        match self.tab_index() {
            Some(i) => Self::TABS[(i + Self::TABS.len() - 1) % Self::TABS.len()],
            None => *self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Modal popup; keys other than Enter/Esc are ignored while it is open.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingAlert {
    pub title: String,
    pub message: String,
    pub is_error: bool,
}

impl BlockingAlert {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            is_error: false,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            is_error: true,
        }
    }
}

pub fn rsi_color(tone: RsiTone) -> Color {
    match tone {
        RsiTone::Oversold => Color::Green,
        RsiTone::Overbought => Color::Red,
        RsiTone::Neutral => Color::White,
    }
}

pub fn signal_color(kind: SignalKind) -> Color {
    match kind {
        SignalKind::Buy => Color::Green,
        SignalKind::Sell => Color::Red,
        SignalKind::Hold => Color::Yellow,
    }
}

pub fn status_color(status: TradeStatus) -> Color {
    match status {
        TradeStatus::Open => Color::Cyan,
        TradeStatus::Closed => Color::DarkGray,
    }
}

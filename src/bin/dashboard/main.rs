// src/bin/dashboard/main.rs - Dashboard entry point
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tokio::time::Duration;
use tracing::{error, info};

mod app;
mod config;
mod types;
mod ui;

use app::App;
use config::{setup_logging, Args};
use signal_dashboard::Dashboard;
use ui::ui;

async fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, mut app: App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        app.drain_events();
        terminal.draw(|f| ui(f, &app))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }

        app.on_tick();
        // Let spawned requests make progress between frames.
        tokio::task::yield_now().await;
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let args = Args::parse();
    if let Err(e) = setup_logging(&args.log_dir, args.debug) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let config = args.dashboard_config();
    info!("🚀 Starting dashboard against {}", config.api_url);
    let dashboard = Dashboard::new(&config)?;
    let app = App::new(dashboard, args.refresh_interval());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Dashboard exited with error: {}", err);
        println!("{:?}", err)
    }

    Ok(())
}

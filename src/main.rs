mod api;
mod app;
mod config;
mod error;
mod logging;
mod models;
mod session;
mod store;
#[cfg(test)]
mod test_support;
mod ui;

use crate::api::ApiClient;
use crate::app::App;
use crate::config::Config;
use crate::models::ListFilter;
use crate::store::ListStore;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Fails before the terminal is taken over, so the message stays visible
    let config = Config::load()?;
    let _log_guard = logging::init(&config.log_file)?;
    info!(url = %config.instance_url, "starting todolist-tui");

    let client = ApiClient::new(&config)?;
    let filter = if config.hide_finished {
        ListFilter::unfinished()
    } else {
        ListFilter::default()
    };
    let mut app = App::new(client, ListStore::new(filter));
    // A failed first load is shown on the status line
    let _ = app.refresh().await;

    // Setup terminal UI
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    terminal.hide_cursor()?;

    let res = ui::run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(error = %err, "terminal loop failed");
        eprintln!("Error: {:?}", err);
    }

    info!("exiting");
    Ok(())
}

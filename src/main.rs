mod app;
mod ui;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use ratatui::layout::Rect;
use ratatui::DefaultTerminal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use quartier_map::config::OverlayConfig;
use quartier_map::data;
use quartier_map::district::District;
use quartier_map::map::TerminalMap;
use quartier_map::overlay::MarkerOverlay;

#[derive(Parser, Debug)]
#[command(name = "quartier-map")]
#[command(about = "District price map with hover popups and search")]
#[command(version)]
struct Cli {
    /// District records: JSON array, `{"data": [...]}` or GeoJSON points
    districts: PathBuf,
    /// GeoJSON outlines drawn under the markers
    #[arg(long)]
    basemap: Option<PathBuf>,
    /// TOML file overriding overlay defaults
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write logs here (`RUST_LOG` sets the filter); off when omitted
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Logs go to a file only: the terminal belongs to the UI
fn init_logging(path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    if let Some(path) = &cli.log_file {
        init_logging(path)?;
    }

    let config = match &cli.config {
        Some(path) => OverlayConfig::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    let districts: Arc<[District]> = data::load_districts(&cli.districts)
        .with_context(|| format!("loading districts from {}", cli.districts.display()))?
        .into();

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &cli, config, districts);

    // Disable mouse capture and restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn run(terminal: &mut DefaultTerminal, cli: &Cli, config: OverlayConfig, districts: Arc<[District]>) -> Result<()> {
    let size = terminal.size()?;
    let screen = Rect::new(0, 0, size.width, size.height);
    let map_area = ui::layout(screen, false).map_inner;

    let mut overlay = MarkerOverlay::new(config);
    overlay.start_loading();
    overlay.set_districts(districts);

    let map = TerminalMap::load(cli.basemap.as_deref(), map_area.width, map_area.height);
    if let Some(report) = overlay.finish_loading(map) {
        info!(mounted = report.mounted, skipped = report.skipped, "markers mounted");
    }

    let mut app = App::new(overlay);
    app.set_screen(screen);
    let start = Instant::now();
    app.fit_all(start);

    loop {
        let size = terminal.size()?;
        app.set_screen(Rect::new(0, 0, size.width, size.height));
        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            let now = Instant::now();
            match event::read()? {
                // Only handle key press events (not release)
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key, now),
                Event::Mouse(mouse) => app.handle_mouse(mouse, now),
                _ => {}
            }
        }

        app.tick(Instant::now());

        if app.should_quit {
            break;
        }
    }

    app.overlay.dispose();
    Ok(())
}

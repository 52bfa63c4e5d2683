//! Love Simulator TUI application.
//!
//! A terminal dating simulation: pick a scenario, answer the character's
//! lines and try to win their heart.
//!
//! # Headless Mode
//!
//! Run with `--headless` for a text-based interface suitable for automated testing:
//!
//! ```bash
//! cargo run -p lovesim -- --headless --scenario teacher
//! ```

mod app;
mod events;
mod headless;
mod ui;

use crossterm::{
    event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use lovesim_core::{ConfigError, GameConfig, GameEngine, GameRules, SaveStore, ScenarioBackend};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs::{self, OpenOptions};
use std::io::{self, stdout};
use std::sync::Mutex;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use app::{App, PendingAction};
use events::{handle_event, EventResult};
use ui::render::render;

const LOG_FILE: &str = "lovesim.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let config = match config_from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let headless = args.iter().any(|a| a == "--headless");
    init_tracing(&config, headless);

    let engine = GameEngine::from_config(&config)?;

    // Check for --headless mode
    if headless {
        let options = headless::parse_options_from_args(&args);
        return headless::run_headless(engine, options)
            .await
            .map_err(|e| e.into());
    }

    let mut app = App::new(engine).await;
    if args.iter().any(|a| a == "--continue") {
        app.continue_saved();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run app
    let result = run_app(&mut terminal, app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    if let Err(e) = result {
        eprintln!("Error: {e}");
    }

    Ok(())
}

/// Environment configuration with command line overrides applied.
fn config_from_args(args: &[String]) -> Result<GameConfig, ConfigError> {
    let mut config = GameConfig::from_env()?;

    let mut i = 0;
    while i < args.len() {
        match (args[i].as_str(), args.get(i + 1)) {
            ("--api", Some(url)) => {
                config = config.with_api_url(url.clone());
                i += 1;
            }
            ("--save-dir", Some(dir)) => {
                config = config.with_save_dir(dir.clone());
                i += 1;
            }
            ("--rules", Some(path)) => {
                config = config.with_rules(GameRules::from_file(path)?);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }

    Ok(config)
}

/// Headless mode logs to stderr. The TUI owns the terminal, so it logs to a
/// file in the save directory instead.
fn init_tracing(config: &GameConfig, headless: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(io::stderr)
            .compact()
            .init();
        return;
    }

    let log_file = fs::create_dir_all(&config.save_dir).and_then(|()| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(config.save_dir.join(LOG_FILE))
    });
    match log_file {
        Ok(file) => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(e) => eprintln!("Warning: logging disabled: {e}"),
    }
}

async fn run_app<T, B, S>(terminal: &mut Terminal<T>, mut app: App<B, S>) -> io::Result<()>
where
    T: ratatui::backend::Backend,
    B: ScenarioBackend,
    S: SaveStore,
{
    // Replace the built-in list with the server's, unless a resume is already queued
    app.request(PendingAction::LoadScenarios);

    loop {
        // Render
        terminal.draw(|f| render(f, &app))?;

        // Process any pending engine work; the frame above shows it as busy
        if app.is_busy() {
            app.run_pending().await;
            continue;
        }

        // Poll for events with timeout for animations
        if event::poll(Duration::from_millis(100))? {
            let ev = event::read()?;
            match handle_event(&mut app, ev) {
                EventResult::Quit => return Ok(()),
                EventResult::NeedsRedraw | EventResult::Continue => {}
            }
        } else {
            // Tick animations
            app.tick();
        }
    }
}

fn print_help() {
    println!("Love Simulator - a terminal dating simulation");
    println!();
    println!("USAGE:");
    println!("  lovesim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help            Show this help message");
    println!("  --headless            Run in headless mode (text-only, no TUI)");
    println!("  --continue            Continue the saved game if there is one");
    println!("  --api <URL>           Game server URL (env: LOVESIM_API_URL)");
    println!("  --save-dir <DIR>      Where saves and statistics live (env: LOVESIM_SAVE_DIR)");
    println!("  --rules <FILE>        JSON file overriding thresholds and scene ids (env: LOVESIM_RULES)");
    println!();
    println!("HEADLESS OPTIONS (only with --headless):");
    println!("  --scenario <ID>       Scenario to play (default: female-friend)");
    println!();
    println!("SCENARIOS:");
    println!("  female-friend, male-friend, teacher");
    println!();
    println!("EXAMPLES:");
    println!("  lovesim                                  # Interactive TUI mode");
    println!("  lovesim --continue                       # Pick up where you left off");
    println!("  lovesim --headless --scenario teacher");
    println!("  lovesim --api http://localhost:8000 --save-dir ~/.lovesim");
}

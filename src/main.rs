use clap::Parser;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use thermostat_panel::Panel;
use thermostat_panel::command::{CommandSink, HttpCommandSink};
use thermostat_panel::config::{self, Config};
use thermostat_panel::simulation::SimulatedBackend;
use thermostat_panel::source::{HttpValueSource, ValueSource};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;

/// Headless thermostat control panel.
///
/// Type `<group> <option>` (e.g. `mode Heat`) or a bare option id (`Up`)
/// on stdin to press a button.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Backend base URL serving the value files and command endpoint
    #[arg(long, env = "PANEL_BASE_URL")]
    base_url: Option<String>,

    /// Time between refresh cycles in milliseconds
    #[arg(long, env = "PANEL_INTERVAL_MS")]
    interval_ms: Option<u64>,

    /// Age in milliseconds after which backend data is flagged stale
    #[arg(long, env = "PANEL_STALE_THRESHOLD_MS")]
    stale_threshold_ms: Option<i64>,

    /// Run against the built-in simulated backend instead of HTTP
    #[arg(long)]
    simulate: bool,

    /// Skip reading the initial button colours from the backend
    #[arg(long)]
    no_preseed: bool,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    dump_config: bool,
}

impl Args {
    fn apply(&self, config: &mut Config) {
        if let Some(url) = &self.base_url {
            config.backend.base_url = url.clone();
        }
        if let Some(ms) = self.interval_ms {
            config.sync.interval_ms = ms;
        }
        if let Some(ms) = self.stale_threshold_ms {
            config.sync.stale_threshold_ms = ms;
        }
        if self.no_preseed {
            config.sync.preseed_colors = false;
        }
    }
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    init_logger();

    let args = Args::parse();
    let mut config = Config::from_env();
    args.apply(&mut config);

    if args.dump_config {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize configuration: {}", e),
        }
        return;
    }

    info!("Starting thermostat panel");
    info!("  Backend: {}", config.backend.base_url);
    info!("  Refresh interval: {} ms", config.sync.interval_ms);
    info!("  Stale threshold: {} ms", config.sync.stale_threshold_ms);

    let mut sim_task = None;
    let source: Arc<dyn ValueSource>;
    let sink: Arc<dyn CommandSink>;
    if args.simulate {
        info!("  Using simulated backend");
        let backend = Arc::new(SimulatedBackend::new());
        sim_task = Some(backend.clone().run_clock(Duration::from_secs(5)));
        source = backend.source();
        sink = backend;
    } else {
        // One connection pool for reads and commands
        let http = reqwest::Client::new();
        source = Arc::new(HttpValueSource::with_client(http.clone(), &config.backend));
        sink = Arc::new(HttpCommandSink::with_client(http, &config.backend));
    }

    let mut panel = match Panel::new(&config, source, sink) {
        Ok(panel) => panel,
        Err(e) => {
            error!("Failed to build panel: {}", e);
            std::process::exit(1);
        }
    };

    if config.sync.preseed_colors {
        panel.preseed().await;
    }
    if let Err(e) = panel.start() {
        error!("Failed to start refresh: {}", e);
        std::process::exit(1);
    }

    let mut changes = panel.board().subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    info!("Thermostat panel is running");
    info!("  - Type e.g. 'mode Heat' or 'Up' to press a button");
    info!("  - Press Ctrl+C to exit");

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                // Coalesce bursts from one refresh cycle into a single redraw
                tokio::time::sleep(Duration::from_millis(50)).await;
                changes.borrow_and_update();
                println!("{}", panel.render());
            }
            line = lines.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) if line.trim().is_empty() => {}
                    Ok(Some(line)) => {
                        if let Err(e) = panel.press_input(&line) {
                            warn!("Ignoring '{}': {}", line.trim(), e);
                        }
                    }
                    Ok(None) => stdin_open = false,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        stdin_open = false;
                    }
                }
            }
            result = signal::ctrl_c() => {
                match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                break;
            }
        }
    }

    panel.stop();
    if let Some(task) = sim_task {
        task.abort();
    }

    info!("Thermostat panel stopped");
}

//! Probe binary for the backend's value sources.
//!
//! Usage:
//!   cargo run --bin source-probe -- --base-url http://thermostat.local
//!
//! Reads every catalog value source and every button colour source once and
//! prints what came back, then evaluates staleness of the last-update value.

use clap::Parser;
use log::{info, warn};
use thermostat_panel::config::{self, Config};
use thermostat_panel::controls::catalog::thermostat_groups;
use thermostat_panel::fields;
use thermostat_panel::source::{HttpValueSource, ValueSource};
use thermostat_panel::staleness;

#[derive(Parser, Debug)]
#[command(about = "Read each thermostat value source once")]
struct Args {
    /// Backend base URL serving the value files
    #[arg(long, env = "PANEL_BASE_URL")]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut config = Config::from_env();
    if let Some(url) = args.base_url {
        config.backend.base_url = url;
    }

    let source = HttpValueSource::new(&config.backend);
    info!("Probing value sources under {}", source.url_for(""));

    let mut keys: Vec<String> = fields::catalog()
        .iter()
        .map(|f| f.source_key.to_string())
        .collect();
    keys.extend(
        thermostat_groups()
            .into_iter()
            .flat_map(|g| g.options)
            .filter_map(|o| o.preseed_key),
    );

    let mut failures = 0;
    let mut last_update = None;
    for key in &keys {
        match source.read(key).await {
            Ok(value) => {
                println!("{:<20} {:?}", key, value.trim_end());
                if key == "lastupdate.txt" {
                    last_update = Some(value);
                }
            }
            Err(e) => {
                warn!("{:<20} failed: {}", key, e);
                failures += 1;
            }
        }
    }

    let now_ms = chrono::Utc::now().timestamp_millis();
    let freshness = staleness::evaluate(
        last_update.as_deref(),
        now_ms,
        config.sync.stale_threshold_ms,
    );
    info!(
        "{} of {} source(s) readable; backend data is {}",
        keys.len() - failures,
        keys.len(),
        freshness
    );
}

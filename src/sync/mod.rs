//! Display synchronizer: the read path.
//!
//! Every tick issues one independent read per bound field and then
//! re-applies the staleness colour from the last-update value already cached.
//! A failed or hung read never delays other fields or later ticks.

mod task;

pub use task::ScheduledTask;

use crate::config::Config;
use crate::display::{Color, DisplayBoard, ElementId};
use crate::error::Result;
use crate::fields::{self, BoundField, FieldRegistry};
use crate::source::ValueSource;
use crate::staleness::{self, Freshness};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Wall clock in Unix milliseconds.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(|| chrono::Utc::now().timestamp_millis())
}

#[derive(Clone)]
pub struct SyncSettings {
    pub interval: Duration,
    pub stale_threshold_ms: i64,
    pub normal: Color,
    pub alert: Color,
    /// Wall clock the staleness check compares against
    pub clock: Clock,
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            interval: config.sync.interval(),
            stale_threshold_ms: config.sync.stale_threshold_ms,
            normal: Color::new(config.colors.normal.as_str()),
            alert: Color::new(config.colors.alert.as_str()),
            clock: system_clock(),
        }
    }
}

/// Last successfully read value of a field and the tick that issued the read.
struct Cached {
    value: String,
    tick: u64,
}

struct Shared {
    board: Arc<DisplayBoard>,
    source: Arc<dyn ValueSource>,
    fields: Vec<BoundField>,
    last_update_field: String,
    stale_targets: Vec<ElementId>,
    threshold_ms: i64,
    normal: Color,
    alert: Color,
    clock: Clock,
    cache: Mutex<HashMap<String, Cached>>,
    freshness: Mutex<Option<Freshness>>,
    /// Ticks issued so far, across restarts
    ticks: AtomicU64,
}

impl Shared {
    fn tick(self: &Arc<Self>) {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
        for field in &self.fields {
            let shared = self.clone();
            let field = field.clone();
            tokio::spawn(async move {
                match shared.source.read(field.source_key()).await {
                    Ok(value) => shared.apply(&field, value, tick),
                    Err(e) => debug!("[Sync] read of {} failed: {}", field.source_key(), e),
                }
            });
        }

        self.evaluate_staleness();
    }

    /// Store a read result unless a read from a later tick already landed.
    fn apply(&self, field: &BoundField, value: String, tick: u64) {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.get(field.name())
            && cached.tick > tick
        {
            debug!(
                "[Sync] dropping late read of {} from tick {}",
                field.source_key(),
                tick
            );
            return;
        }
        self.board.set_text(field.target(), value.clone());
        cache.insert(field.name().to_string(), Cached { value, tick });
    }

    fn evaluate_staleness(&self) {
        let last_update = self
            .cache
            .lock()
            .get(&self.last_update_field)
            .map(|c| c.value.clone());
        let freshness = staleness::evaluate(
            last_update.as_deref(),
            (self.clock)(),
            self.threshold_ms,
        );

        let color = match freshness {
            Freshness::Fresh => &self.normal,
            Freshness::Stale => &self.alert,
        };
        self.board.update(|frame| {
            for &target in &self.stale_targets {
                frame.set_foreground(target, color);
            }
        });

        let previous = self.freshness.lock().replace(freshness);
        if previous != Some(freshness) {
            match freshness {
                Freshness::Stale => warn!(
                    "[Sync] backend data is stale (last update: {})",
                    last_update.as_deref().map(str::trim).unwrap_or("never")
                ),
                Freshness::Fresh => info!("[Sync] backend data is fresh"),
            }
        }
    }
}

/// Drives the repeating refresh cycle. Owns at most one running task.
pub struct DisplaySynchronizer {
    shared: Arc<Shared>,
    interval: Duration,
    task: Option<ScheduledTask>,
}

impl DisplaySynchronizer {
    pub fn new(
        board: Arc<DisplayBoard>,
        source: Arc<dyn ValueSource>,
        registry: &FieldRegistry,
        settings: SyncSettings,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                board,
                source,
                fields: registry.iter().cloned().collect(),
                last_update_field: fields::LAST_UPDATE.to_string(),
                stale_targets: registry.staleness_targets(),
                threshold_ms: settings.stale_threshold_ms,
                normal: settings.normal,
                alert: settings.alert,
                clock: settings.clock,
                cache: Mutex::new(HashMap::new()),
                freshness: Mutex::new(None),
                ticks: AtomicU64::new(0),
            }),
            interval: settings.interval,
            task: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start refreshing every `interval`, first cycle immediately.
    ///
    /// A running cycle is stopped and replaced. A zero interval is rejected
    /// and leaves the synchronizer stopped.
    pub fn start(&mut self, interval: Duration) -> Result<()> {
        self.stop();

        let shared = self.shared.clone();
        let task = ScheduledTask::spawn("refresh", interval, move || shared.tick())?;
        info!(
            "[Sync] refreshing {} field(s) every {} ms",
            self.shared.fields.len(),
            interval.as_millis()
        );
        self.interval = interval;
        self.task = Some(task);
        Ok(())
    }

    /// Stop the cycle. Reads already in flight may still land.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.cancel();
            info!("[Sync] refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .as_ref()
            .is_some_and(|t| !t.is_cancelled() && !t.is_finished())
    }

    /// Last successfully read value of a field.
    pub fn last_known(&self, field: &str) -> Option<String> {
        self.shared.cache.lock().get(field).map(|c| c.value.clone())
    }

    /// Result of the most recent staleness evaluation.
    pub fn freshness(&self) -> Option<Freshness> {
        *self.shared.freshness.lock()
    }
}

impl Drop for DisplaySynchronizer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PanelError;
    use crate::source::MemoryValueSource;
    use std::sync::atomic::AtomicI64;
    use tokio::time::sleep;

    const TS: &str = "2024-01-01T00:00:00Z";
    const TS_MS: i64 = 1_704_067_200_000;
    const SECOND: Duration = Duration::from_secs(1);

    struct Fixture {
        board: Arc<DisplayBoard>,
        registry: FieldRegistry,
        source: Arc<MemoryValueSource>,
        now: Arc<AtomicI64>,
        sync: DisplaySynchronizer,
    }

    fn fixture() -> Fixture {
        let board = Arc::new(DisplayBoard::new());
        let registry = FieldRegistry::bind_all(&board, fields::catalog()).unwrap();
        let source = Arc::new(MemoryValueSource::with_values(
            fields::catalog()
                .iter()
                .map(|f| (f.source_key, format!("{}-v1", f.name))),
        ));
        source.set("lastupdate.txt", TS);

        let now = Arc::new(AtomicI64::new(TS_MS + 30_000));
        let clock_now = now.clone();
        let settings = SyncSettings {
            interval: SECOND,
            stale_threshold_ms: 60_000,
            normal: Color::new("silver"),
            alert: Color::new("red"),
            clock: Arc::new(move || clock_now.load(Ordering::SeqCst)),
        };
        let sync = DisplaySynchronizer::new(board.clone(), source.clone(), &registry, settings);

        Fixture {
            board,
            registry,
            source,
            now,
            sync,
        }
    }

    impl Fixture {
        fn text(&self, field: &str) -> String {
            self.board
                .text(self.registry.get(field).unwrap().target())
        }

        fn foreground(&self, field: &str) -> Option<Color> {
            self.board
                .element(self.registry.get(field).unwrap().target())
                .foreground
        }
    }

    /// Let the current tick's reads run without reaching the next tick.
    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_fills_every_field_verbatim() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;

        assert_eq!(f.text(fields::STATUS), "status-v1");
        assert_eq!(f.text(fields::BEDROOM_TEMP), "bedroom_temp-v1");
        assert_eq!(f.text(fields::LAST_UPDATE), TS);
        assert!(f.sync.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_changes_appear_on_next_tick() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;

        f.source.set("mode.txt", "Heat");
        settle().await;
        assert_eq!(f.text(fields::MODE), "mode-v1");

        sleep(SECOND).await;
        assert_eq!(f.text(fields::MODE), "Heat");
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_keeps_previous_value() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;
        assert_eq!(f.text(fields::SETPOINT), "setpoint-v1");

        f.source.set("temp.txt", "72");
        f.source.set_failing("temp.txt", true);
        f.source.set("fan.txt", "On");
        sleep(SECOND).await;
        assert_eq!(f.text(fields::SETPOINT), "setpoint-v1");
        assert_eq!(f.text(fields::FAN), "On");

        // Recovered silently on a later tick
        f.source.set_failing("temp.txt", false);
        sleep(SECOND).await;
        assert_eq!(f.text(fields::SETPOINT), "72");
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_read_does_not_block_other_fields_or_ticks() {
        let mut f = fixture();
        f.source.set_hanging("curstat.txt", true);
        f.sync.start(SECOND).unwrap();
        settle().await;

        assert_eq!(f.text(fields::STATUS), "");
        assert_eq!(f.text(fields::NURSERY_TEMP), "nursery_temp-v1");

        f.source.set("nurserytemp.txt", "68.2");
        sleep(SECOND).await;
        assert_eq!(f.text(fields::NURSERY_TEMP), "68.2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;
        let reads = f.source.read_count();

        f.sync.stop();
        f.sync.stop();
        assert!(!f.sync.is_running());

        f.source.set("fan.txt", "Auto");
        sleep(SECOND * 5).await;
        assert_eq!(f.source.read_count(), reads);
        assert_eq!(f.text(fields::FAN), "fan-v1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_rejected_and_stays_stopped() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;

        let result = f.sync.start(Duration::ZERO);
        assert!(matches!(result, Err(PanelError::InvalidConfig(_))));
        assert!(!f.sync.is_running());
        assert_eq!(f.sync.interval(), SECOND);

        let reads = f.source.read_count();
        sleep(SECOND * 3).await;
        assert_eq!(f.source.read_count(), reads);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resumes_refresh() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;
        f.sync.stop();

        f.source.set("fan.txt", "Auto");
        f.sync.start(SECOND * 2).unwrap();
        settle().await;
        assert_eq!(f.text(fields::FAN), "Auto");
        assert_eq!(f.sync.interval(), SECOND * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_scenario() {
        let mut f = fixture();
        f.sync.start(SECOND).unwrap();
        settle().await;

        // Nothing was cached when the first cycle evaluated
        assert_eq!(f.foreground(fields::STATUS), Some(Color::new("red")));
        assert_eq!(f.sync.freshness(), Some(Freshness::Stale));

        sleep(SECOND).await;
        assert_eq!(f.sync.last_known(fields::LAST_UPDATE).as_deref(), Some(TS));
        assert_eq!(f.sync.freshness(), Some(Freshness::Fresh));
        assert_eq!(f.foreground(fields::STATUS), Some(Color::new("silver")));
        assert_eq!(f.foreground(fields::LAST_UPDATE), Some(Color::new("silver")));
        // Settings are not staleness-tracked
        assert_eq!(f.foreground(fields::SETPOINT), None);

        f.now.store(TS_MS + 120_000, Ordering::SeqCst);
        sleep(SECOND).await;
        assert_eq!(f.sync.freshness(), Some(Freshness::Stale));
        assert_eq!(f.foreground(fields::BEDROOM_TEMP), Some(Color::new("red")));

        // A new timestamp heals it
        f.source.set("lastupdate.txt", "2024-01-01T00:01:50Z");
        sleep(SECOND).await;
        sleep(SECOND).await;
        assert_eq!(f.sync.freshness(), Some(Freshness::Fresh));
        assert_eq!(f.foreground(fields::BEDROOM_TEMP), Some(Color::new("silver")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_staleness_colour_is_reapplied_every_tick() {
        let mut f = fixture();
        f.source.set("lastupdate.txt", "garbage");
        f.sync.start(SECOND).unwrap();
        sleep(SECOND + Duration::from_millis(10)).await;

        let status = f.registry.get(fields::STATUS).unwrap().target();
        f.board
            .update(|frame| frame.set_foreground(status, &Color::new("silver")));

        sleep(SECOND).await;
        assert_eq!(f.foreground(fields::STATUS), Some(Color::new("red")));
    }

    #[tokio::test]
    async fn test_late_read_from_older_tick_is_dropped() {
        let f = fixture();
        let field = f.registry.get(fields::MODE).unwrap().clone();

        f.sync.shared.apply(&field, "Cool".to_string(), 5);
        f.sync.shared.apply(&field, "Heat".to_string(), 4);
        assert_eq!(f.text(fields::MODE), "Cool");
        assert_eq!(f.sync.last_known(fields::MODE).as_deref(), Some("Cool"));
    }
}

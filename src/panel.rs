//! The assembled control panel.
//!
//! Lifecycle: [`Panel::new`] registers every element once, [`Panel::preseed`]
//! optionally reads initial button colours, [`Panel::start`] begins the read
//! path and [`Panel::press`] drives the write path. Dropping the panel stops
//! the refresh cycle.

use crate::command::{Command, CommandDispatcher, CommandSink};
use crate::config::Config;
use crate::controls::catalog::{self, thermostat_groups};
use crate::controls::{ButtonGroupModel, ControlGroup};
use crate::display::{Color, DisplayBoard, Layout, Slot, Snapshot};
use crate::error::Result;
use crate::fields::{self, FieldRegistry};
use crate::source::ValueSource;
use crate::staleness::Freshness;
use crate::sync::{Clock, DisplaySynchronizer, SyncSettings, system_clock};
use log::{debug, info};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub struct Panel {
    board: Arc<DisplayBoard>,
    fields: FieldRegistry,
    model: ButtonGroupModel,
    dispatcher: CommandDispatcher,
    sync: DisplaySynchronizer,
    source: Arc<dyn ValueSource>,
    layout: Layout,
}

impl Panel {
    /// Build the thermostat panel over the given transports.
    pub fn new(
        config: &Config,
        source: Arc<dyn ValueSource>,
        sink: Arc<dyn CommandSink>,
    ) -> Result<Self> {
        Self::with_clock(config, source, sink, system_clock())
    }

    /// Build the panel with the wall clock the staleness check compares against.
    pub fn with_clock(
        config: &Config,
        source: Arc<dyn ValueSource>,
        sink: Arc<dyn CommandSink>,
        clock: Clock,
    ) -> Result<Self> {
        config.validate()?;

        let board = Arc::new(DisplayBoard::new());
        let fields = FieldRegistry::bind_all(&board, fields::catalog())?;

        let groups = thermostat_groups()
            .iter()
            .map(|spec| ControlGroup::bind(spec, &board, &fields))
            .collect::<Result<Vec<_>>>()?;
        let model = ButtonGroupModel::new(
            board.clone(),
            groups,
            Color::new(config.colors.button.as_str()),
        )?;

        let sync = DisplaySynchronizer::new(
            board.clone(),
            source.clone(),
            &fields,
            SyncSettings {
                clock,
                ..SyncSettings::from_config(config)
            },
        );
        let layout = thermostat_layout(&fields, &model)?;

        Ok(Self {
            board,
            fields,
            model,
            dispatcher: CommandDispatcher::new(sink),
            sync,
            source,
            layout,
        })
    }

    /// Read server-side button colours once.
    ///
    /// A failed or empty read leaves that button in the unselected colour.
    pub async fn preseed(&self) {
        for group in self.model.groups() {
            for option in group.options() {
                let Some(key) = option.preseed_key() else {
                    continue;
                };
                match self.source.read(key).await {
                    Ok(text) if !text.trim().is_empty() => {
                        let color = Color::new(text.trim());
                        debug!("[Panel] preseed {}.{} = {}", group.name(), option.id(), color);
                        if let Err(e) = self.model.preseed(group.name(), option.id(), color) {
                            debug!("[Panel] preseed failed: {}", e);
                        }
                    }
                    Ok(_) => debug!("[Panel] preseed {} is empty", key),
                    Err(e) => debug!("[Panel] preseed {} unavailable: {}", key, e),
                }
            }
        }
    }

    /// Start the refresh cycle at the configured interval.
    pub fn start(&mut self) -> Result<()> {
        let interval = self.sync.interval();
        self.sync.start(interval)
    }

    pub fn stop(&mut self) {
        self.sync.stop();
    }

    pub fn is_running(&self) -> bool {
        self.sync.is_running()
    }

    /// Select an option and send its command.
    ///
    /// The board reflects the selection before this returns; the command is
    /// delivered in the background.
    pub fn press(&self, group: &str, option: &str) -> Result<JoinHandle<()>> {
        let option = self.model.select(group, option)?;
        let command = Command::from(option);
        info!("[Panel] pressed {}", command);
        Ok(self.dispatcher.dispatch(command))
    }

    /// Press by option id alone, e.g. `Heat`.
    pub fn press_id(&self, option: &str) -> Result<JoinHandle<()>> {
        let group = self.model.find_option(option)?.group().to_string();
        self.press(&group, option)
    }

    /// Press from user input: either `<group> <option>` or a bare option id.
    pub fn press_input(&self, input: &str) -> Result<JoinHandle<()>> {
        match Command::parse(input) {
            Some(command) => self.press(&command.group, &command.option),
            None => self.press_id(input.trim()),
        }
    }

    pub fn board(&self) -> &Arc<DisplayBoard> {
        &self.board
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn model(&self) -> &ButtonGroupModel {
        &self.model
    }

    pub fn freshness(&self) -> Option<Freshness> {
        self.sync.freshness()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.board.snapshot()
    }

    pub fn render(&self) -> String {
        self.layout.render(&self.board.snapshot())
    }
}

/// Text layout mirroring the thermostat page.
fn thermostat_layout(fields: &FieldRegistry, model: &ButtonGroupModel) -> Result<Layout> {
    let target = |name: &str| fields.get(name).map(|f| f.target());
    let slot = |label: &'static str, name: &str| {
        target(name).map(|element| Slot { label, element })
    };

    Ok(Layout::new()
        .heading("Thermostat")
        .values(
            vec![slot("Status: ", fields::STATUS)?, slot(" ", fields::AVERAGE_TEMP)?],
            "",
        )
        .value("Bedroom: ", target(fields::BEDROOM_TEMP)?)
        .value("Nursery: ", target(fields::NURSERY_TEMP)?)
        .value("Family room: ", target(fields::FAMILY_ROOM_TEMP)?)
        .value("Basement: ", target(fields::BASEMENT_TEMP)?)
        .value("Closet: ", target(fields::CLOSET_TEMP)?)
        .heading("Settings")
        .value("Temperature: ", target(fields::SETPOINT)?)
        .buttons(model.group(catalog::TEMP)?.buttons())
        .value("Mode: ", target(fields::MODE)?)
        .buttons(model.group(catalog::MODE)?.buttons())
        .value("Fan: ", target(fields::FAN)?)
        .buttons(model.group(catalog::FAN)?.buttons())
        .heading("Statistics")
        .values(
            vec![
                slot("Duty Cycle: ", fields::HOUR_DUTY_CYCLE)?,
                slot(" (hour) ", fields::DAY_DUTY_CYCLE)?,
            ],
            " (day)",
        )
        .value("Last Update: ", target(fields::LAST_UPDATE)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::RecordingSink;
    use crate::error::PanelError;
    use crate::simulation::SimulatedBackend;
    use crate::source::MemoryValueSource;
    use std::time::Duration;
    use tokio::time::sleep;

    const TS: &str = "2024-01-01T00:00:00Z";
    const TS_MS: i64 = 1_704_067_200_000;

    fn backend_values() -> Vec<(&'static str, &'static str)> {
        vec![
            ("curstat.txt", "idle"),
            ("averagetemp.txt", "71.0"),
            ("bedroomtemp.txt", "71.4"),
            ("nurserytemp.txt", "71.8"),
            ("familyroomtemp.txt", "70.7"),
            ("basementtemp.txt", "68.5"),
            ("closettemp.txt", "72.1"),
            ("temp.txt", "70"),
            ("mode.txt", "Cool"),
            ("fan.txt", "Auto"),
            ("hourdutycycle.txt", "25%"),
            ("daydutycycle.txt", "31%"),
            ("lastupdate.txt", TS),
        ]
    }

    fn panel() -> (Panel, Arc<MemoryValueSource>, Arc<RecordingSink>) {
        let source = Arc::new(MemoryValueSource::with_values(backend_values()));
        let sink = Arc::new(RecordingSink::default());
        let panel = Panel::with_clock(
            &Config::default(),
            source.clone(),
            sink.clone(),
            Arc::new(|| TS_MS + 30_000),
        )
        .unwrap();
        (panel, source, sink)
    }

    fn background(panel: &Panel, group: &str, option: &str) -> Option<Color> {
        let button = panel.model().option(group, option).unwrap().button();
        panel.board().element(button).background
    }

    fn text(panel: &Panel, field: &str) -> String {
        panel
            .board()
            .text(panel.fields().get(field).unwrap().target())
    }

    #[tokio::test]
    async fn test_select_heat_scenario() {
        let (panel, _source, sink) = panel();
        panel.press("mode", "Heat").unwrap().await.unwrap();

        assert_eq!(background(&panel, "mode", "Heat"), Some(Color::new("orange")));
        assert_eq!(background(&panel, "mode", "Cool"), Some(Color::new("silver")));
        assert_eq!(text(&panel, fields::MODE), "Heat");
        assert_eq!(sink.sent(), vec![Command::new("mode", "Heat")]);
    }

    #[tokio::test]
    async fn test_board_updates_before_command_completes() {
        let (panel, _source, sink) = panel();
        let handle = panel.press_id("On").unwrap();
        // Local state is already updated; delivery has not run yet
        assert_eq!(text(&panel, fields::FAN), "On");
        assert_eq!(background(&panel, "fan", "On"), Some(Color::new("lime")));
        handle.await.unwrap();
        assert_eq!(sink.sent(), vec![Command::new("fan", "On")]);
    }

    #[tokio::test]
    async fn test_failed_command_does_not_roll_back() {
        let (panel, _source, sink) = panel();
        sink.set_reject(true);
        panel.press_input("mode Cool").unwrap().await.unwrap();
        assert_eq!(background(&panel, "mode", "Cool"), Some(Color::new("aqua")));
        assert_eq!(text(&panel, fields::MODE), "Cool");
        assert_eq!(panel.model().selected("mode").as_deref(), Some("Cool"));
    }

    #[tokio::test]
    async fn test_press_input_forms() {
        let (panel, _source, sink) = panel();
        panel.press_input("Heat").unwrap().await.unwrap();
        panel.press_input("fan Auto\n").unwrap().await.unwrap();
        assert!(panel.press_input("mode Dry").is_err());
        assert!(panel.press_input("Dry").is_err());
        assert_eq!(
            sink.sent(),
            vec![Command::new("mode", "Heat"), Command::new("fan", "Auto")]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_overrides_optimistic_state() {
        let (mut panel, _source, _sink) = panel();
        panel.start().unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(text(&panel, fields::MODE), "Cool");

        panel.press("mode", "Heat").unwrap().await.unwrap();
        assert_eq!(text(&panel, fields::MODE), "Heat");

        // The backend never applied it, so the next refresh shows its value
        sleep(Duration::from_secs(1)).await;
        assert_eq!(text(&panel, fields::MODE), "Cool");
        panel.stop();
        assert!(!panel.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_builds_on_refreshed_setpoint() {
        let (mut panel, _source, sink) = panel();
        panel.start().unwrap();
        sleep(Duration::from_millis(10)).await;

        for _ in 0..3 {
            panel.press("temp", "Up").unwrap().await.unwrap();
        }
        panel.press("temp", "Down").unwrap().await.unwrap();
        assert_eq!(text(&panel, fields::SETPOINT), "72");
        assert_eq!(sink.sent().len(), 4);
        assert_eq!(sink.sent()[3].payload(), "temp Down");
    }

    #[tokio::test]
    async fn test_preseed_reads_server_colours_once() {
        let (panel, source, _sink) = panel();
        source.set("cool_color.txt", "aqua\n");
        source.set("heat_color.txt", "silver");
        source.set_failing("auto_color.txt", true);
        source.set("on_color.txt", "");

        panel.preseed().await;

        assert_eq!(background(&panel, "mode", "Cool"), Some(Color::new("aqua")));
        assert_eq!(background(&panel, "mode", "Heat"), Some(Color::new("silver")));
        assert_eq!(background(&panel, "fan", "Auto"), Some(Color::new("silver")));
        assert_eq!(background(&panel, "fan", "On"), Some(Color::new("silver")));
        assert_eq!(panel.model().selected("mode").as_deref(), Some("Cool"));
        assert_eq!(panel.model().selected("fan"), None);
    }

    #[tokio::test]
    async fn test_preseed_with_two_selected_colours_keeps_the_later() {
        let (panel, source, _sink) = panel();
        source.set("cool_color.txt", "aqua");
        source.set("heat_color.txt", "orange");
        source.set("auto_color.txt", "lime");
        source.set("on_color.txt", "lime");

        panel.preseed().await;

        assert_eq!(background(&panel, "mode", "Cool"), Some(Color::new("silver")));
        assert_eq!(background(&panel, "mode", "Heat"), Some(Color::new("orange")));
        assert_eq!(panel.model().selected("mode").as_deref(), Some("Heat"));
        assert_eq!(background(&panel, "fan", "Auto"), Some(Color::new("silver")));
        assert_eq!(background(&panel, "fan", "On"), Some(Color::new("lime")));
        assert_eq!(panel.model().selected("fan").as_deref(), Some("On"));
    }

    #[test]
    fn test_zero_interval_config_is_rejected() {
        let mut config = Config::default();
        config.sync.interval_ms = 0;
        let source = Arc::new(MemoryValueSource::with_values(backend_values()));
        let sink = Arc::new(RecordingSink::default());
        assert!(matches!(
            Panel::new(&config, source, sink),
            Err(PanelError::InvalidConfig(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_after_refresh() {
        let (mut panel, _source, _sink) = panel();
        panel.start().unwrap();
        sleep(Duration::from_millis(1010)).await;

        let rendered = panel.render();
        assert!(rendered.contains("Status: idle <silver> 71.0 <silver>\n"));
        assert!(rendered.contains("Bedroom: 71.4 <silver>\n"));
        assert!(rendered.contains("Temperature: 70\n"));
        assert!(rendered.contains("[Down (silver)] [Up (silver)]\n"));
        assert!(rendered.contains("Duty Cycle: 25% (hour) 31% (day)\n"));
        assert!(rendered.contains(&format!("Last Update: {} <silver>\n", TS)));
        assert_eq!(panel.freshness(), Some(Freshness::Fresh));
    }

    #[tokio::test(start_paused = true)]
    async fn test_against_simulated_backend() {
        let backend = Arc::new(SimulatedBackend::new());
        let mut panel = Panel::new(&Config::default(), backend.source(), backend.clone()).unwrap();
        panel.preseed().await;
        assert_eq!(panel.model().selected("mode").as_deref(), Some("Cool"));

        panel.start().unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(text(&panel, fields::SETPOINT), "70");

        panel.press("temp", "Up").unwrap().await.unwrap();
        assert_eq!(text(&panel, fields::SETPOINT), "71");
        panel.press("mode", "Heat").unwrap().await.unwrap();

        sleep(Duration::from_secs(1)).await;
        // The backend agreed, so the refresh keeps the optimistic values
        assert_eq!(text(&panel, fields::SETPOINT), "71");
        assert_eq!(text(&panel, fields::MODE), "Heat");
    }
}

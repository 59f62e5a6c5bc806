//! Simulated thermostat backend for development without hardware.
//!
//! Stands in for the external executor: it owns the value cells the panel
//! polls and applies the commands the panel posts. A clock task drifts room
//! temperatures, runs a simple hysteresis controller and refreshes the
//! last-update timestamp.

use crate::command::{Command, CommandSink};
use crate::error::{PanelError, Result};
use crate::source::MemoryValueSource;
use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use log::{debug, info};
use parking_lot::Mutex;
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;

/// Degrees beyond the setpoint before the equipment switches.
const MARGIN: f64 = 0.5;
const AMBIENT: f64 = 74.0;
const ROOMS: [(&str, f64); 5] = [
    ("bedroomtemp.txt", 0.4),
    ("nurserytemp.txt", 0.8),
    ("familyroomtemp.txt", -0.3),
    ("basementtemp.txt", -2.5),
    ("closettemp.txt", 1.1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Cool,
    Heat,
    Off,
}

struct SimState {
    mode: Mode,
    setpoint: i64,
    /// Base temperature the rooms are offset from
    base: f64,
    running: bool,
    /// Whether the equipment ran on each recent tick, newest last
    history: VecDeque<bool>,
}

pub struct SimulatedBackend {
    source: Arc<MemoryValueSource>,
    state: Mutex<SimState>,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        let backend = Self {
            source: Arc::new(MemoryValueSource::new()),
            state: Mutex::new(SimState {
                mode: Mode::Cool,
                setpoint: 70,
                base: 71.0,
                running: false,
                history: VecDeque::new(),
            }),
        };
        backend.source.set("fan.txt", "Auto");
        backend.source.set("auto_color.txt", "lime");
        backend.source.set("on_color.txt", "silver");
        backend.publish(Utc::now().timestamp_millis(), Duration::from_secs(5));
        backend
    }

    /// The cells the panel reads.
    pub fn source(&self) -> Arc<MemoryValueSource> {
        self.source.clone()
    }

    /// Apply one command the way the executor would.
    pub fn apply(&self, command: &Command) -> Result<()> {
        let rejected = || PanelError::CommandRejected { status: 400 };
        match (command.group.as_str(), command.option.as_str()) {
            ("mode", option) => {
                let mode = match option {
                    "Cool" => Mode::Cool,
                    "Heat" => Mode::Heat,
                    "Off" => Mode::Off,
                    _ => return Err(rejected()),
                };
                self.state.lock().mode = mode;
            }
            ("fan", option @ ("Auto" | "On")) => {
                self.source.set("fan.txt", option);
                let (auto, on) = if option == "Auto" {
                    ("lime", "silver")
                } else {
                    ("silver", "lime")
                };
                self.source.set("auto_color.txt", auto);
                self.source.set("on_color.txt", on);
            }
            ("temp", "Up") => self.state.lock().setpoint += 1,
            ("temp", "Down") => self.state.lock().setpoint -= 1,
            _ => return Err(rejected()),
        }
        info!("[Sim] applied command {:?}", command.payload());
        self.publish_settings();
        Ok(())
    }

    /// Advance the simulation by one period ending at `now_ms`.
    pub fn step(&self, now_ms: i64, period: Duration) {
        {
            let mut rng = rand::thread_rng();
            let mut state = self.state.lock();
            let setpoint = state.setpoint as f64;

            state.running = match state.mode {
                Mode::Off => false,
                Mode::Cool if state.running => state.base > setpoint - MARGIN,
                Mode::Cool => state.base >= setpoint + MARGIN,
                Mode::Heat if state.running => state.base < setpoint + MARGIN,
                Mode::Heat => state.base <= setpoint - MARGIN,
            };

            let drive = match (state.running, state.mode) {
                (true, Mode::Cool) => -0.2,
                (true, Mode::Heat) => 0.2,
                _ => (AMBIENT - state.base) * 0.01,
            };
            state.base += drive + rng.gen_range(-0.05..0.05);

            let running = state.running;
            state.history.push_back(running);
            let day_len = window(Duration::from_secs(86_400), period);
            while state.history.len() > day_len {
                state.history.pop_front();
            }
        }
        self.publish(now_ms, period);
    }

    /// Spawn a task that steps the simulation every `period`.
    pub fn run_clock(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                self.step(Utc::now().timestamp_millis(), period);
                debug!(
                    "[Sim] status={:?}",
                    self.source.get("curstat.txt").unwrap_or_default()
                );
            }
        })
    }

    fn publish_settings(&self) {
        let state = self.state.lock();
        let mode = match state.mode {
            Mode::Cool => "Cool",
            Mode::Heat => "Heat",
            Mode::Off => "Off",
        };
        self.source.set("mode.txt", mode);
        self.source.set("temp.txt", state.setpoint.to_string());
        self.source.set(
            "cool_color.txt",
            if state.mode == Mode::Cool { "aqua" } else { "silver" },
        );
        self.source.set(
            "heat_color.txt",
            if state.mode == Mode::Heat { "orange" } else { "silver" },
        );
    }

    fn publish(&self, now_ms: i64, period: Duration) {
        self.publish_settings();

        let state = self.state.lock();
        let status = match (state.mode, state.running) {
            (Mode::Off, _) => "off",
            (Mode::Cool, true) => "cooling",
            (Mode::Heat, true) => "heating",
            _ => "idle",
        };
        self.source.set("curstat.txt", status);
        self.source
            .set("averagetemp.txt", format!("{:.1}", state.base));
        for (key, offset) in ROOMS {
            self.source.set(key, format!("{:.1}", state.base + offset));
        }

        let hour_len = window(Duration::from_secs(3600), period);
        self.source.set(
            "hourdutycycle.txt",
            format!("{}%", duty_percent(state.history.iter().rev().take(hour_len))),
        );
        self.source.set(
            "daydutycycle.txt",
            format!("{}%", duty_percent(state.history.iter())),
        );

        if let Some(now) = Utc.timestamp_millis_opt(now_ms).single() {
            self.source.set(
                "lastupdate.txt",
                now.to_rfc3339_opts(SecondsFormat::Secs, true),
            );
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandSink for SimulatedBackend {
    async fn send(&self, command: &Command) -> Result<()> {
        self.apply(command)
    }
}

/// Number of periods covering `span`.
fn window(span: Duration, period: Duration) -> usize {
    let period_ms = period.as_millis().max(1);
    (span.as_millis() / period_ms).max(1) as usize
}

fn duty_percent<'a>(samples: impl Iterator<Item = &'a bool>) -> u32 {
    let (on, total) = samples.fold((0u32, 0u32), |(on, total), &s| (on + s as u32, total + 1));
    if total == 0 {
        0
    } else {
        (on * 100 + total / 2) / total
    }
}

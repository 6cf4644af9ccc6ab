//! Timer settings.
//!
//! Persisted through the same [`StorageManager`] as the history, under
//! their own schema. [`SettingsStore::set`] validates before anything is
//! written.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::error::{Result, ValidationError};
use crate::page::PageHost;
use crate::storage::{Backend, Schema, StorageManager};

pub const SETTINGS_VERSION: u32 = 1;

const MAX_DURATION_MINUTES: i64 = 999;
const MAX_BPM: u32 = 1000;

/// Countdown window size: `"fullscreen"` or `[width, height]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Resolution {
    Size([u32; 2]),
    Named(String),
}

impl Resolution {
    pub fn fullscreen() -> Self {
        Resolution::Named("fullscreen".into())
    }

    fn is_valid(&self) -> bool {
        match self {
            Resolution::Size([w, h]) => *w > 0 && *h > 0,
            Resolution::Named(name) => name == "fullscreen",
        }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Size([500, 500])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    /// `tab`, `window`, or `None` for no countdown page.
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_true")]
    pub autoclose: bool,
    #[serde(default)]
    pub resolution: Resolution,
}

impl Default for Countdown {
    fn default() -> Self {
        Self {
            host: None,
            autoclose: true,
            resolution: Resolution::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metronome {
    #[serde(default)]
    pub files: Vec<String>,
    pub bpm: u32,
}

/// Background sound played while a phase runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerSound {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metronome: Option<Metronome>,
    /// `white-noise`, `pink-noise` or `brown-noise`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub procedural: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notifications {
    #[serde(default = "default_true")]
    pub desktop: bool,
    #[serde(default = "default_true")]
    pub tab: bool,
    #[serde(default)]
    pub sound: Option<String>,
}

impl Default for Notifications {
    fn default() -> Self {
        Self {
            desktop: true,
            tab: true,
            sound: None,
        }
    }
}

/// One timer phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase {
    /// Minutes.
    pub duration: i64,
    #[serde(default)]
    pub timer_sound: Option<TimerSound>,
    #[serde(default)]
    pub countdown: Countdown,
    #[serde(default)]
    pub notifications: Notifications,
}

impl Phase {
    pub fn with_duration(duration: i64) -> Self {
        Self {
            duration,
            timer_sound: None,
            countdown: Countdown::default(),
            notifications: Notifications::default(),
        }
    }

    fn validate(&self, name: &str) -> std::result::Result<(), ValidationError> {
        if !(1..=MAX_DURATION_MINUTES).contains(&self.duration) {
            return Err(invalid(
                format!("{name}.duration"),
                format!("must be between 1 and {MAX_DURATION_MINUTES} minutes"),
            ));
        }

        if let Some(metronome) = self.timer_sound.as_ref().and_then(|s| s.metronome.as_ref()) {
            if !(1..=MAX_BPM).contains(&metronome.bpm) {
                return Err(invalid(
                    format!("{name}.timerSound.metronome.bpm"),
                    format!("must be between 1 and {MAX_BPM}"),
                ));
            }
        }

        if let Some(host) = &self.countdown.host {
            if host.parse::<PageHost>()? == PageHost::Window
                && !self.countdown.resolution.is_valid()
            {
                return Err(invalid(
                    format!("{name}.countdown.resolution"),
                    "must be \"fullscreen\" or [width, height]".into(),
                ));
            }
        }

        Ok(())
    }
}

/// Long break phase, taken every `interval` focus phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongBreak {
    #[serde(flatten)]
    pub phase: Phase,
    pub interval: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Autostart {
    /// Daily start time, `H:MM`.
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub focus: Phase,
    pub short_break: Phase,
    pub long_break: LongBreak,
    #[serde(default)]
    pub autostart: Autostart,
    pub version: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            focus: Phase::with_duration(25),
            short_break: Phase::with_duration(5),
            long_break: LongBreak {
                phase: Phase::with_duration(15),
                interval: 4,
            },
            autostart: Autostart::default(),
            version: SETTINGS_VERSION,
        }
    }
}

impl Settings {
    /// Check every phase and the autostart time.
    ///
    /// # Errors
    /// `InvalidHost` for an unknown countdown host, `InvalidValue` for
    /// anything else out of range.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.focus.validate("focus")?;
        self.short_break.validate("shortBreak")?;
        self.long_break.phase.validate("longBreak")?;

        if let Some(time) = &self.autostart.time {
            if !is_clock_time(time) {
                return Err(invalid(
                    "autostart.time".into(),
                    format!("'{time}' is not of the form H:MM"),
                ));
            }
        }

        Ok(())
    }
}

/// `digits:digits`.
fn is_clock_time(value: &str) -> bool {
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    matches!(value.split_once(':'), Some((h, m)) if all_digits(h) && all_digits(m))
}

fn invalid(field: String, message: String) -> ValidationError {
    ValidationError::InvalidValue { field, message }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsSchema;

impl Schema for SettingsSchema {
    fn name(&self) -> &'static str {
        "settings"
    }

    fn version(&self) -> u32 {
        SETTINGS_VERSION
    }

    fn default_payload(&self) -> Value {
        // Serializing plain structs cannot fail.
        serde_json::to_value(Settings::default()).unwrap_or(Value::Null)
    }
}

pub struct SettingsStore {
    storage: StorageManager<SettingsSchema>,
}

impl SettingsStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            storage: StorageManager::new(SettingsSchema, backend),
        }
    }

    pub async fn get(&self) -> Result<Settings> {
        let payload = self.storage.get().await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// Validate and persist `settings`. Nothing is written if validation
    /// fails.
    pub async fn set(&self, settings: &Settings) -> Result<()> {
        settings.validate()?;
        self.storage.set(serde_json::to_value(settings)?).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Value> {
        self.storage.subscribe()
    }
}

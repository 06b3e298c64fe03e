//! User settings and data file locations

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Local};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::alarm::AlarmThresholds;
use crate::alert::{AlertPolicy, DEFAULT_COOLDOWN_MINUTES};
use crate::error::GlucoseError;
use crate::history::DEFAULT_CAPACITY;
use crate::units::GlucoseUnit;

const APP_DIR: &str = "glucowatch";

/// Longest accepted cooldown or snooze: one week
pub const MAX_MINUTES: i64 = 7 * 24 * 60;

/// Persistent user settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub thresholds: AlarmThresholds,
    pub cooldown_minutes: i64,
    pub alerts_enabled: bool,
    pub snooze_until: Option<DateTime<Local>>,
    pub poll_interval_secs: u64,
    pub history_capacity: usize,
    pub unit: GlucoseUnit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            thresholds: AlarmThresholds::default(),
            cooldown_minutes: DEFAULT_COOLDOWN_MINUTES,
            alerts_enabled: true,
            snooze_until: None,
            poll_interval_secs: 60,
            history_capacity: DEFAULT_CAPACITY,
            unit: GlucoseUnit::MgDl,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlucoseError> {
        let contents = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            warn!("Could not load settings from {}: {}. Using defaults.", path.display(), e);
            Self::default()
        })
    }

    /// Save settings as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GlucoseError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values no host can run with. Threshold ordering is deliberately
    /// not checked here; classification copes with any ordering.
    pub fn validate(&self) -> Result<(), GlucoseError> {
        let t = &self.thresholds;
        if [t.urgent_low, t.low, t.high, t.urgent_high].iter().any(|v| !v.is_finite()) {
            return Err(GlucoseError::Config("thresholds must be finite".to_string()));
        }
        if !(0..=MAX_MINUTES).contains(&self.cooldown_minutes) {
            return Err(GlucoseError::Config(format!(
                "cooldown_minutes must be between 0 and {}",
                MAX_MINUTES
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(GlucoseError::Config("poll_interval_secs must be positive".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(GlucoseError::Config("history_capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Alerting switches for the debouncer. A cooldown that `validate` would
    /// reject falls back to the default.
    pub fn alert_policy(&self) -> AlertPolicy {
        let cooldown = Some(self.cooldown_minutes)
            .filter(|m| (0..=MAX_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .unwrap_or_else(|| {
                warn!(
                    "Cooldown of {} minutes out of range, using {}",
                    self.cooldown_minutes, DEFAULT_COOLDOWN_MINUTES
                );
                Duration::minutes(DEFAULT_COOLDOWN_MINUTES)
            });
        AlertPolicy {
            enabled: self.alerts_enabled,
            cooldown,
            snooze_until: self.snooze_until,
        }
    }

    /// Snooze all alerts for `minutes` from `now`; zero clears the snooze
    pub fn snooze_for(&mut self, minutes: i64, now: DateTime<Local>) -> Result<(), GlucoseError> {
        if minutes == 0 {
            self.snooze_until = None;
            return Ok(());
        }
        let until = Some(minutes)
            .filter(|m| (1..=MAX_MINUTES).contains(m))
            .and_then(Duration::try_minutes)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| {
                GlucoseError::InvalidArgument(format!(
                    "snooze must be between 0 and {} minutes, got {}",
                    MAX_MINUTES, minutes
                ))
            })?;
        self.snooze_until = Some(until);
        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }
}

/// The single settings holder shared by every view of a session.
///
/// Cloning shares the same settings. Readers take a snapshot per cycle so a
/// change made elsewhere applies from the next classification on.
#[derive(Debug, Clone, Default)]
pub struct SharedSettings {
    inner: Arc<Mutex<Settings>>,
}

impl SharedSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
        }
    }

    pub fn snapshot(&self) -> Settings {
        self.lock().clone()
    }

    /// Modify the settings under the lock
    pub fn update<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Settings) -> R,
    {
        f(&mut self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Get the OS-specific data directory for glucowatch
pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Create the data directory if needed
pub fn ensure_data_dir() -> std::io::Result<PathBuf> {
    let dir = get_data_dir();
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

pub fn settings_file_path() -> PathBuf {
    get_data_dir().join("settings.json")
}

pub fn default_database_path() -> PathBuf {
    get_data_dir().join("readings.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("glucowatch-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("settings.json");
        let mut settings = Settings::default();
        settings.thresholds = AlarmThresholds::new(60.0, 80.0, 200.0, 280.0);
        settings.unit = GlucoseUnit::MmolL;
        settings.snooze_for(30, Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()).unwrap();
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let path = temp_path("partial.json");
        fs::write(&path, r#"{"cooldown_minutes": 10}"#).unwrap();
        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.cooldown_minutes, 10);
        assert_eq!(loaded.thresholds, AlarmThresholds::default());
        assert!(loaded.alerts_enabled);
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let path = temp_path("broken.json");
        fs::write(&path, r#"{"poll_interval_secs": 0}"#).unwrap();
        assert!(matches!(Settings::load(&path), Err(GlucoseError::Config(_))));
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        assert_eq!(Settings::load_or_default(temp_path("missing.json")), Settings::default());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_snooze_zero_clears() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut settings = Settings::default();
        settings.snooze_for(15, now).unwrap();
        assert_eq!(settings.snooze_until, Some(now + Duration::minutes(15)));
        assert_eq!(settings.alert_policy().snooze_until, settings.snooze_until);
        settings.snooze_for(0, now).unwrap();
        assert_eq!(settings.snooze_until, None);
    }

    #[test]
    fn test_out_of_range_cooldown_is_rejected() {
        let mut settings = Settings::default();
        settings.cooldown_minutes = 1_000_000_000_000_000;
        assert!(matches!(settings.validate(), Err(GlucoseError::Config(_))));
        // an unvalidated value must not bring the cycle down
        assert_eq!(settings.alert_policy().cooldown, Duration::minutes(DEFAULT_COOLDOWN_MINUTES));

        settings.cooldown_minutes = MAX_MINUTES;
        assert!(settings.validate().is_ok());
        assert_eq!(settings.alert_policy().cooldown, Duration::minutes(MAX_MINUTES));

        settings.cooldown_minutes = -1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_huge_settings_file_cooldown_falls_back() {
        let path = temp_path("huge-cooldown.json");
        fs::write(&path, r#"{"cooldown_minutes": 1000000000000000}"#).unwrap();
        assert!(Settings::load(&path).is_err());
        assert_eq!(Settings::load_or_default(&path), Settings::default());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_snooze_out_of_range_is_an_error() {
        let now = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut settings = Settings::default();
        settings.snooze_for(10, now).unwrap();

        let result = settings.snooze_for(1_000_000_000_000_000, now);
        assert!(matches!(result, Err(GlucoseError::InvalidArgument(_))));
        assert!(settings.snooze_for(-5, now).is_err());
        // a rejected snooze leaves the previous one in place
        assert_eq!(settings.snooze_until, Some(now + Duration::minutes(10)));

        settings.snooze_for(MAX_MINUTES, now).unwrap();
        assert_eq!(settings.snooze_until, Some(now + Duration::minutes(MAX_MINUTES)));
    }

    #[test]
    fn test_shared_settings_are_shared() {
        let shared = SharedSettings::default();
        let other_view = shared.clone();
        other_view.update(|s| s.thresholds.high = 200.0);
        assert_eq!(shared.snapshot().thresholds.high, 200.0);
    }
}

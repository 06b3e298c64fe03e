//! Alert debouncing
//!
//! Two things happen on every classified reading and they are kept apart:
//!
//! - The **active level** follows the latest classification with no delay.
//!   It drives continuous indicators such as a flashing overlay and clears
//!   the moment a reading comes back in range.
//! - The **discrete alert** (a sound) fires through an [`AlertSink`] at most
//!   once per cooldown per category, and only while alerts are enabled and
//!   not snoozed.
//!
//! Time is always passed in. Cooldown and snooze are comparisons against the
//! caller's `now`, never timers.

use std::collections::HashMap;
use std::io::Write;

use chrono::{DateTime, Duration, Local};
use log::{debug, info, warn};
use serde::Serialize;

use crate::alarm::AlarmCategory;
use crate::error::AlertError;

/// Default minimum time between two alerts of the same category
pub const DEFAULT_COOLDOWN_MINUTES: i64 = 5;

/// Receiver of discrete alerts, typically a sound player
pub trait AlertSink {
    fn fire_alert(&mut self, category: AlarmCategory) -> Result<(), AlertError>;
}

/// Rings the terminal bell on stderr
#[derive(Debug, Default)]
pub struct TerminalBell;

impl AlertSink for TerminalBell {
    fn fire_alert(&mut self, category: AlarmCategory) -> Result<(), AlertError> {
        let mut stderr = std::io::stderr();
        write!(stderr, "\x07")?;
        stderr.flush()?;
        info!("Alert sounded for {}", category);
        Ok(())
    }
}

/// Records alerts in the log only
#[derive(Debug, Default)]
pub struct LogSink;

impl AlertSink for LogSink {
    fn fire_alert(&mut self, category: AlarmCategory) -> Result<(), AlertError> {
        warn!("ALERT: {}", category.status());
        Ok(())
    }
}

/// Alerting switches, re-read on every evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertPolicy {
    pub enabled: bool,
    pub cooldown: Duration,
    /// All categories stay silent while `now` is before this instant
    pub snooze_until: Option<DateTime<Local>>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            cooldown: Duration::minutes(DEFAULT_COOLDOWN_MINUTES),
            snooze_until: None,
        }
    }
}

/// What [`AlertDebouncer::evaluate`] did with a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AlertDecision {
    /// Reading in range, nothing active
    Normal,
    /// Sink was called. `delivered` is false when it reported an error.
    Fired { category: AlarmCategory, delivered: bool },
    /// Same category fired less than a cooldown ago
    CoolingDown { category: AlarmCategory, remaining_secs: i64 },
    Snoozed { category: AlarmCategory },
    Disabled { category: AlarmCategory },
}

/// Per-category cooldown tracking plus the current active level
#[derive(Debug, Default, Clone)]
pub struct AlertDebouncer {
    last_fired: HashMap<AlarmCategory, DateTime<Local>>,
    active: Option<AlarmCategory>,
}

impl AlertDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Category currently driving continuous indicators
    pub fn active(&self) -> Option<AlarmCategory> {
        self.active
    }

    pub fn is_flashing(&self) -> bool {
        self.active.is_some()
    }

    pub fn last_fired(&self, category: AlarmCategory) -> Option<DateTime<Local>> {
        self.last_fired.get(&category).copied()
    }

    /// Forget all fire history and the active level
    pub fn reset(&mut self) {
        self.last_fired.clear();
        self.active = None;
    }

    /// Apply one classification.
    ///
    /// The active level is updated unconditionally. The sink is called at
    /// most once; its failure is logged and never retried, and the fire
    /// still counts toward the cooldown.
    pub fn evaluate(
        &mut self,
        category: Option<AlarmCategory>,
        now: DateTime<Local>,
        policy: &AlertPolicy,
        sink: &mut dyn AlertSink,
    ) -> AlertDecision {
        if self.active != category {
            debug!(
                "Active alarm level {:?} -> {:?}",
                self.active.map(AlarmCategory::name),
                category.map(AlarmCategory::name)
            );
        }
        self.active = category;

        let Some(category) = category else {
            return AlertDecision::Normal;
        };

        if !policy.enabled {
            debug!("Alerts disabled, {} not sounded", category);
            return AlertDecision::Disabled { category };
        }

        if let Some(until) = policy.snooze_until {
            if now < until {
                debug!("Snoozed until {}, {} not sounded", until.format("%H:%M"), category);
                return AlertDecision::Snoozed { category };
            }
        }

        if let Some(&last) = self.last_fired.get(&category) {
            let elapsed = now - last;
            if elapsed < policy.cooldown {
                let remaining = policy.cooldown - elapsed;
                debug!("{} cooling down, {}s left", category, remaining.num_seconds());
                return AlertDecision::CoolingDown {
                    category,
                    remaining_secs: remaining.num_seconds(),
                };
            }
        }

        self.last_fired.insert(category, now);
        let delivered = match sink.fire_alert(category) {
            Ok(()) => true,
            Err(e) => {
                warn!("Alert for {} failed: {}", category, e);
                false
            }
        };
        AlertDecision::Fired { category, delivered }
    }
}

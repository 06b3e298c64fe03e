//! One fetch-classify-display cycle
//!
//! [`Monitor`] owns the session state (history window and alert debouncer)
//! and is driven from a single scheduling context. Hosts with several views
//! keep one monitor and hand the other views the [`CycleReport`] it returns.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use log::{debug, info};
use serde::Serialize;

use crate::alarm::{classify, AlarmCategory};
use crate::alert::{AlertDebouncer, AlertDecision, AlertSink};
use crate::config::{Settings, SharedSettings};
use crate::display::{GlucoseBand, GlucoseColor};
use crate::error::GlucoseError;
use crate::history::{HistoryWindow, SignificantChangeFilter};
use crate::reading::{parse_entries, Direction, Reading};
use crate::trend::{Trend, TrendAnalyzer, NO_DATA};

/// Where readings come from. A failed fetch is an error value, not an event.
pub trait ReadingSource {
    fn fetch(&mut self, now: DateTime<Local>) -> Result<Vec<Reading>, GlucoseError>;
}

/// A Nightscout `entries.json` document on disk, re-read on every fetch
#[derive(Debug, Clone)]
pub struct EntriesFile {
    path: PathBuf,
}

impl EntriesFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ReadingSource for EntriesFile {
    fn fetch(&mut self, now: DateTime<Local>) -> Result<Vec<Reading>, GlucoseError> {
        let json = fs::read_to_string(&self.path)?;
        parse_entries(&json, now)
    }
}

/// Everything the display needs after one cycle
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub at: DateTime<Local>,
    pub new_readings: usize,
    pub latest_value: Option<f64>,
    pub latest_display: String,
    pub latest_time: Option<DateTime<Local>>,
    pub delta: Option<f64>,
    pub direction: Direction,
    pub arrow: &'static str,
    pub band: Option<GlucoseBand>,
    pub color: Option<GlucoseColor>,
    pub stale: bool,
    pub values: String,
    pub changes: String,
    pub times: String,
    pub trend: Trend,
    pub trend_description: &'static str,
    pub category: Option<AlarmCategory>,
    pub flashing: bool,
    pub alert: AlertDecision,
}

impl CycleReport {
    /// One-line overlay text, e.g. `142 mg/dL ↗ +6  Rising  [HIGH]`
    pub fn status_line(&self, settings: &Settings) -> String {
        let Some(value) = self.latest_value else {
            return NO_DATA.to_string();
        };
        let mut line = format!("{} {}", settings.unit.format(value), self.arrow);
        if let Some(delta) = self.delta {
            line.push(' ');
            line.push_str(&settings.unit.format_delta(delta));
        }
        line.push_str("  ");
        line.push_str(self.trend_description);
        if let Some(category) = self.category {
            line.push_str(&format!("  [{}]", category.status()));
        }
        if self.stale {
            line.push_str("  (stale)");
        }
        line
    }
}

/// Session state for one monitored profile
pub struct Monitor<S: AlertSink> {
    window: HistoryWindow,
    debouncer: AlertDebouncer,
    settings: SharedSettings,
    sink: S,
    filter: Option<SignificantChangeFilter>,
}

impl<S: AlertSink> Monitor<S> {
    pub fn new(settings: SharedSettings, sink: S) -> Self {
        let capacity = settings.snapshot().history_capacity;
        Self {
            window: HistoryWindow::new(capacity),
            debouncer: AlertDebouncer::new(),
            settings,
            sink,
            filter: None,
        }
    }

    /// Only admit readings that pass `filter`
    pub fn with_filter(mut self, filter: SignificantChangeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Start from previously archived readings
    pub fn seed(&mut self, readings: Vec<Reading>) {
        info!("Seeding history with {} readings", readings.len());
        self.window.load(readings);
    }

    pub fn window(&self) -> &HistoryWindow {
        &self.window
    }

    pub fn debouncer(&self) -> &AlertDebouncer {
        &self.debouncer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Drop all history and alert state, e.g. on profile switch
    pub fn clear(&mut self) {
        self.window.clear();
        self.debouncer.reset();
    }

    /// Add a fetched batch to the window. Returns how many readings were new.
    ///
    /// The batch is put in measurement order first (servers answer newest
    /// first). Readings already held are skipped, and once the window is full
    /// so is anything at or before its oldest reading, which overlapping
    /// fetches would otherwise cycle back in.
    pub fn ingest(&mut self, mut readings: Vec<Reading>) -> usize {
        readings.sort_by_key(|r| r.timestamp());
        let mut added = 0;
        for reading in readings {
            if self.window.count() >= self.window.capacity() {
                let oldest = self.window.iter().map(|r| r.timestamp()).min();
                if oldest.is_some_and(|t| reading.timestamp() <= t) {
                    continue;
                }
            }
            if let Some(filter) = &self.filter {
                if !filter.admits(self.window.latest(), &reading) {
                    debug!("Filtered insignificant reading {:.0}", reading.value());
                    continue;
                }
            }
            if self.window.insert_new(reading) {
                added += 1;
            }
        }
        added
    }

    /// Fetch from `source` and run a cycle on the result
    pub fn poll(
        &mut self,
        source: &mut dyn ReadingSource,
        now: DateTime<Local>,
    ) -> Result<CycleReport, GlucoseError> {
        let readings = source.fetch(now)?;
        Ok(self.run_cycle(readings, now))
    }

    /// Ingest `readings`, then classify the latest reading and debounce.
    ///
    /// Settings are re-read on every call.
    pub fn run_cycle(&mut self, readings: Vec<Reading>, now: DateTime<Local>) -> CycleReport {
        let settings = self.settings.snapshot();
        if settings.history_capacity != self.window.capacity() {
            self.window.set_capacity(settings.history_capacity);
        }

        let new_readings = self.ingest(readings);
        if new_readings > 0 {
            info!("Ingested {} new readings ({} in window)", new_readings, self.window.count());
        }

        let latest = self.window.latest().cloned();
        let category = latest
            .as_ref()
            .and_then(|r| classify(r.value(), &settings.thresholds));
        let alert = self
            .debouncer
            .evaluate(category, now, &settings.alert_policy(), &mut self.sink);

        let analyzer = TrendAnalyzer::from_window(&self.window);
        let trend = analyzer.trend();
        let direction = latest.as_ref().map(Reading::direction).unwrap_or_default();
        let band = latest.as_ref().map(|r| GlucoseBand::of(r.value()));

        CycleReport {
            at: now,
            new_readings,
            latest_value: latest.as_ref().map(Reading::value),
            latest_display: latest
                .as_ref()
                .map(|r| settings.unit.format(r.value()))
                .unwrap_or_else(|| NO_DATA.to_string()),
            latest_time: latest.as_ref().map(Reading::timestamp),
            delta: analyzer.latest_delta(),
            direction,
            arrow: direction.arrow(),
            band,
            color: band.map(GlucoseBand::color),
            stale: latest.as_ref().is_some_and(|r| r.is_stale_at(now)),
            values: analyzer.values_display_in(settings.unit),
            changes: analyzer.changes_display_in(settings.unit),
            times: analyzer.times_display(),
            trend,
            trend_description: trend.label(),
            category,
            flashing: self.debouncer.is_flashing(),
            alert,
        }
    }
}

//! Glucose readings and the Nightscout entry format they arrive in

use chrono::{DateTime, Duration, FixedOffset, Local, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::GlucoseError;
use crate::units::GlucoseUnit;

/// A reading older than this when ingested is flagged stale
pub const STALE_AFTER_MINUTES: i64 = 15;

/// Coarse rate-of-change reported by the CGM alongside a reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    DoubleUp,
    SingleUp,
    FortyFiveUp,
    Flat,
    FortyFiveDown,
    SingleDown,
    DoubleDown,
    #[default]
    Unknown,
}

impl Direction {
    /// Parse a Nightscout direction tag, ignoring case.
    /// Tags outside the seven arrows ("NONE", "NOT COMPUTABLE", ...) are `Unknown`.
    pub fn parse(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "doubleup" => Direction::DoubleUp,
            "singleup" => Direction::SingleUp,
            "fortyfiveup" => Direction::FortyFiveUp,
            "flat" => Direction::Flat,
            "fortyfivedown" => Direction::FortyFiveDown,
            "singledown" => Direction::SingleDown,
            "doubledown" => Direction::DoubleDown,
            _ => Direction::Unknown,
        }
    }

    /// Canonical Nightscout tag
    pub fn name(self) -> &'static str {
        match self {
            Direction::DoubleUp => "DoubleUp",
            Direction::SingleUp => "SingleUp",
            Direction::FortyFiveUp => "FortyFiveUp",
            Direction::Flat => "Flat",
            Direction::FortyFiveDown => "FortyFiveDown",
            Direction::SingleDown => "SingleDown",
            Direction::DoubleDown => "DoubleDown",
            Direction::Unknown => "Unknown",
        }
    }
}

/// A single point-in-time glucose observation.
///
/// Fields are private: once a reading has been handed to the history window
/// it cannot change. The `with_*` methods consume the reading and return a
/// new one, so they are only usable while the producer still owns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    value: f64,
    delta: Option<f64>,
    direction: Direction,
    timestamp: DateTime<Local>,
    units: GlucoseUnit,
    stale: bool,
}

impl Reading {
    /// Create a reading of `value` mg/dL measured at `timestamp`
    pub fn new(value: f64, timestamp: DateTime<Local>) -> Self {
        Self {
            value,
            delta: None,
            direction: Direction::Unknown,
            timestamp,
            units: GlucoseUnit::MgDl,
            stale: false,
        }
    }

    pub fn with_direction(self, direction: Direction) -> Self {
        Self { direction, ..self }
    }

    /// Attach the change reported by the data source
    pub fn with_delta(self, delta: Option<f64>) -> Self {
        Self { delta, ..self }
    }

    pub fn with_units(self, units: GlucoseUnit) -> Self {
        Self { units, ..self }
    }

    /// Derive the stale flag against the ingestion time
    pub fn checked_at(self, now: DateTime<Local>) -> Self {
        let stale = now - self.timestamp > Duration::minutes(STALE_AFTER_MINUTES);
        Self { stale, ..self }
    }

    /// Glucose value in mg/dL
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Change reported by the source, if it sent one
    pub fn delta(&self) -> Option<f64> {
        self.delta
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn units(&self) -> GlucoseUnit {
        self.units
    }

    /// Stale as flagged at ingestion
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Stale as of `now`; a reading ages out even if it arrived fresh
    pub fn is_stale_at(&self, now: DateTime<Local>) -> bool {
        self.stale || now - self.timestamp > Duration::minutes(STALE_AFTER_MINUTES)
    }

    /// Milliseconds since the Unix epoch, the Nightscout `date` field
    pub fn epoch_millis(&self) -> i64 {
        self.timestamp.timestamp_millis()
    }
}

/// One element of a Nightscout `/api/v1/entries.json` response
#[derive(Debug, Clone, Deserialize)]
pub struct NightscoutEntry {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub sgv: Option<f64>,
    /// Epoch milliseconds
    #[serde(default)]
    pub date: Option<i64>,
    #[serde(rename = "dateString", default)]
    pub date_string: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub delta: Option<f64>,
    /// Older uploaders send the change under this name instead
    #[serde(default, alias = "bgDelta")]
    pub bgdelta: Option<f64>,
    #[serde(default)]
    pub units: Option<String>,
}

impl NightscoutEntry {
    /// Sensor glucose entries; calibrations and meter checks are skipped
    pub fn is_sgv(&self) -> bool {
        self.kind.as_deref().map_or(true, |k| k.eq_ignore_ascii_case("sgv"))
    }

    fn timestamp(&self) -> Option<DateTime<Local>> {
        if let Some(ms) = self.date {
            return DateTime::<Utc>::from_timestamp_millis(ms).map(|t| t.with_timezone(&Local));
        }
        self.date_string
            .as_deref()
            .and_then(|s| DateTime::<FixedOffset>::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Local))
    }

    /// Convert into a reading, rejecting values the engine must never see
    pub fn to_reading(&self, now: DateTime<Local>) -> Result<Reading, GlucoseError> {
        let value = self
            .sgv
            .ok_or_else(|| GlucoseError::InvalidReading("entry has no sgv".to_string()))?;
        if !value.is_finite() || value < 0.0 {
            return Err(GlucoseError::InvalidReading(format!("sgv {} out of range", value)));
        }
        let timestamp = self
            .timestamp()
            .ok_or_else(|| GlucoseError::InvalidReading("entry has no usable date".to_string()))?;
        let direction = self
            .direction
            .as_deref()
            .map(Direction::parse)
            .unwrap_or_default();
        let units = self
            .units
            .as_deref()
            .map(GlucoseUnit::from_tag)
            .unwrap_or_default();

        Ok(Reading::new(value, timestamp)
            .with_direction(direction)
            .with_delta(self.delta.or(self.bgdelta).filter(|d| d.is_finite()))
            .with_units(units)
            .checked_at(now))
    }
}

/// Parse an entries document into readings, in the order the server sent them.
///
/// Malformed entries are logged and dropped; only a document that is not a
/// JSON array of entries is an error.
pub fn parse_entries(json: &str, now: DateTime<Local>) -> Result<Vec<Reading>, GlucoseError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    let mut readings = Vec::with_capacity(values.len());
    for value in values {
        let entry: NightscoutEntry = match serde_json::from_value(value) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping malformed entry: {}", e);
                continue;
            }
        };
        if !entry.is_sgv() {
            continue;
        }
        match entry.to_reading(now) {
            Ok(reading) => readings.push(reading),
            Err(e) => warn!("Skipping entry: {}", e),
        }
    }
    Ok(readings)
}

//! SQLite archive of received readings
//!
//! Lets a new session start with a populated history window instead of
//! waiting for the window to refill from live fetches.

use chrono::{DateTime, Local, Utc};
use log::warn;
use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::GlucoseError;
use crate::reading::{Direction, Reading};
use crate::units::GlucoseUnit;

/// SQLite database of readings keyed by measurement time
pub struct Storage {
    conn: Connection,
}

impl Storage {
    /// Create or open a database at the given path (`:memory:` for a scratch one)
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, GlucoseError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY,
                epoch INTEGER NOT NULL UNIQUE,
                timestamp TEXT NOT NULL,
                sgv REAL NOT NULL,
                delta REAL,
                direction TEXT NOT NULL,
                units TEXT NOT NULL,
                imported_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_readings_epoch
                ON readings(epoch);"
        )?;

        Ok(Self { conn })
    }

    /// Insert a reading, ignoring duplicates based on epoch timestamp.
    /// Returns whether a row was added.
    pub fn insert_reading(&self, reading: &Reading) -> Result<bool, GlucoseError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO readings (epoch, timestamp, sgv, delta, direction, units)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                reading.epoch_millis(),
                reading.timestamp().to_rfc3339(),
                reading.value(),
                reading.delta(),
                reading.direction().name(),
                reading.units().label(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Bulk import readings, returns count of new entries
    pub fn import_readings(&self, readings: &[Reading]) -> Result<usize, GlucoseError> {
        let mut count = 0;
        for reading in readings {
            if self.insert_reading(reading)? {
                count += 1;
            }
        }
        Ok(count)
    }

    /// The newest `limit` readings, oldest first.
    ///
    /// Stale flags are recomputed against `now`, since the archive only keeps
    /// what was measured.
    pub fn recent(&self, limit: usize, now: DateTime<Local>) -> Result<Vec<Reading>, GlucoseError> {
        let mut stmt = self.conn.prepare(
            "SELECT epoch, sgv, delta, direction, units FROM (
                SELECT epoch, sgv, delta, direction, units
                FROM readings ORDER BY epoch DESC LIMIT ?1
             ) ORDER BY epoch"
        )?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut readings = Vec::with_capacity(rows.len());
        for (epoch, sgv, delta, direction, units) in rows {
            let Some(timestamp) = DateTime::<Utc>::from_timestamp_millis(epoch) else {
                warn!("Skipping archived reading with bad epoch {}", epoch);
                continue;
            };
            readings.push(
                Reading::new(sgv, timestamp.with_timezone(&Local))
                    .with_delta(delta)
                    .with_direction(Direction::parse(&direction))
                    .with_units(GlucoseUnit::from_tag(&units))
                    .checked_at(now),
            );
        }
        Ok(readings)
    }

    /// Get total reading count
    pub fn count(&self) -> Result<i64, GlucoseError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM readings", [], |row| row.get(0))?)
    }
}

//! Glucose history and alerting engine for a Nightscout desktop overlay.
//!
//! Readings flow through a bounded [`history::HistoryWindow`], are summarised
//! by [`trend::TrendAnalyzer`], classified with [`alarm::classify`] and turned
//! into at most one alert per cooldown by [`alert::AlertDebouncer`].
//! [`monitor::Monitor`] runs that pipeline once per polling cycle.

pub mod alarm;
pub mod alert;
pub mod config;
pub mod display;
pub mod error;
pub mod history;
pub mod monitor;
pub mod reading;
pub mod storage;
pub mod trend;
pub mod units;

pub use alarm::{classify, AlarmCategory, AlarmThresholds};
pub use alert::{AlertDebouncer, AlertDecision, AlertPolicy, AlertSink};
pub use display::{arrow_of, color_of, GlucoseBand, GlucoseColor};
pub use error::{AlertError, GlucoseError};
pub use history::{HistoryWindow, SignificantChangeFilter};
pub use monitor::{CycleReport, EntriesFile, Monitor, ReadingSource};
pub use reading::{Direction, Reading};
pub use trend::{Trend, TrendAnalyzer};

//! Alarm thresholds and classification

use std::fmt;

use serde::{Deserialize, Serialize};

/// Four alarm boundaries in mg/dL.
///
/// Expected to satisfy `urgent_low < low < high < urgent_high`, but nothing
/// enforces it: a set that violates the ordering still classifies
/// deterministically (see [`classify`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlarmThresholds {
    pub urgent_low: f64,
    pub low: f64,
    pub high: f64,
    pub urgent_high: f64,
}

impl Default for AlarmThresholds {
    /// ADA 2024 consensus targets
    fn default() -> Self {
        Self {
            urgent_low: 54.0,
            low: 70.0,
            high: 180.0,
            urgent_high: 250.0,
        }
    }
}

impl AlarmThresholds {
    pub fn new(urgent_low: f64, low: f64, high: f64, urgent_high: f64) -> Self {
        Self { urgent_low, low, high, urgent_high }
    }

    /// Whether the boundaries are strictly increasing
    pub fn is_ordered(&self) -> bool {
        self.urgent_low < self.low && self.low < self.high && self.high < self.urgent_high
    }

    pub fn format_range(&self) -> String {
        format!(
            "{:.0} / {:.0} / {:.0} / {:.0} mg/dL",
            self.urgent_low, self.low, self.high, self.urgent_high
        )
    }
}

/// Out-of-range category of a reading. In range is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AlarmCategory {
    UrgentLow,
    Low,
    High,
    UrgentHigh,
}

impl AlarmCategory {
    pub const ALL: [AlarmCategory; 4] = [
        AlarmCategory::UrgentLow,
        AlarmCategory::Low,
        AlarmCategory::High,
        AlarmCategory::UrgentHigh,
    ];

    /// Canonical name
    pub fn name(self) -> &'static str {
        match self {
            AlarmCategory::UrgentLow => "UrgentLow",
            AlarmCategory::Low => "Low",
            AlarmCategory::High => "High",
            AlarmCategory::UrgentHigh => "UrgentHigh",
        }
    }

    /// Short status text for the overlay
    pub fn status(self) -> &'static str {
        match self {
            AlarmCategory::UrgentLow => "URGENT LOW",
            AlarmCategory::Low => "LOW",
            AlarmCategory::High => "HIGH",
            AlarmCategory::UrgentHigh => "URGENT HIGH",
        }
    }

    pub fn is_urgent(self) -> bool {
        matches!(self, AlarmCategory::UrgentLow | AlarmCategory::UrgentHigh)
    }
}

impl fmt::Display for AlarmCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a mg/dL value against `thresholds`.
///
/// High-side checks run first and every boundary is inclusive, so a value
/// equal to `low` or `high` already alarms. When the thresholds overlap the
/// high side wins. Do not reorder these checks.
pub fn classify(value: f64, thresholds: &AlarmThresholds) -> Option<AlarmCategory> {
    if value >= thresholds.urgent_high {
        Some(AlarmCategory::UrgentHigh)
    } else if value >= thresholds.high {
        Some(AlarmCategory::High)
    } else if value <= thresholds.urgent_low {
        Some(AlarmCategory::UrgentLow)
    } else if value <= thresholds.low {
        Some(AlarmCategory::Low)
    } else {
        None
    }
}

//! Deltas, trend description and display strings derived from recent readings

use serde::Serialize;

use crate::history::HistoryWindow;
use crate::reading::Reading;
use crate::units::{GlucoseUnit, MGDL_PER_MMOL};

/// How many readings / changes the display strings cover
pub const DISPLAY_COUNT: usize = 5;

/// Changes averaged for the trend description
pub const TREND_SAMPLE: usize = 3;

/// Shown in place of any display string while there is nothing to show
pub const NO_DATA: &str = "No data yet";

/// Qualitative trend over the last few changes.
///
/// Cutoffs are absolute mg/dL per reading, not per minute: the same glucose
/// slope reads differently at other polling intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    RisingRapidly,
    Rising,
    RisingSlowly,
    Stable,
    FallingSlowly,
    Falling,
    FallingRapidly,
    InsufficientData,
}

impl Trend {
    /// Bucket a mean change into one of the seven bands
    pub fn from_mean(mean: f64) -> Self {
        if mean > 10.0 {
            Trend::RisingRapidly
        } else if mean > 5.0 {
            Trend::Rising
        } else if mean > 1.0 {
            Trend::RisingSlowly
        } else if mean >= -1.0 {
            Trend::Stable
        } else if mean >= -5.0 {
            Trend::FallingSlowly
        } else if mean >= -10.0 {
            Trend::Falling
        } else {
            Trend::FallingRapidly
        }
    }

    /// Trend of a change sequence; needs at least three changes
    pub fn from_changes(changes: &[f64]) -> Self {
        if changes.len() < TREND_SAMPLE {
            return Trend::InsufficientData;
        }
        let recent = &changes[changes.len() - TREND_SAMPLE..];
        Self::from_mean(recent.iter().sum::<f64>() / TREND_SAMPLE as f64)
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::RisingRapidly => "Rising rapidly",
            Trend::Rising => "Rising",
            Trend::RisingSlowly => "Rising slowly",
            Trend::Stable => "Stable",
            Trend::FallingSlowly => "Falling slowly",
            Trend::Falling => "Falling",
            Trend::FallingRapidly => "Falling rapidly",
            Trend::InsufficientData => "Insufficient data",
        }
    }
}

/// Read-only analysis over an ordered run of readings, oldest first
#[derive(Debug, Clone)]
pub struct TrendAnalyzer<'a> {
    readings: Vec<&'a Reading>,
}

impl<'a> TrendAnalyzer<'a> {
    pub fn new<I>(readings: I) -> Self
    where
        I: IntoIterator<Item = &'a Reading>,
    {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn from_window(window: &'a HistoryWindow) -> Self {
        Self::new(window.iter())
    }

    /// Pairwise value differences, keeping only the last five
    pub fn changes(&self) -> Vec<f64> {
        let all: Vec<f64> = self
            .readings
            .windows(2)
            .map(|pair| pair[1].value() - pair[0].value())
            .collect();
        let skip = all.len().saturating_sub(DISPLAY_COUNT);
        all[skip..].to_vec()
    }

    pub fn trend(&self) -> Trend {
        Trend::from_changes(&self.changes())
    }

    pub fn trend_description(&self) -> &'static str {
        self.trend().label()
    }

    /// Change of the latest reading.
    ///
    /// The source-reported delta wins; the local difference to the previous
    /// reading is only used when the source sent none.
    pub fn latest_delta(&self) -> Option<f64> {
        let latest = self.readings.last()?;
        latest.delta().or_else(|| {
            let n = self.readings.len();
            (n >= 2).then(|| latest.value() - self.readings[n - 2].value())
        })
    }

    /// Last five values in mg/dL, e.g. `"98, 104, 112"`
    pub fn values_display(&self) -> String {
        self.values_display_in(GlucoseUnit::MgDl)
    }

    /// Last five values in `unit`, e.g. `"5.4, 5.8, 6.2"` for mmol/L
    pub fn values_display_in(&self, unit: GlucoseUnit) -> String {
        join_or_placeholder(self.recent().map(|r| unit.format_value(r.value())))
    }

    /// Last five changes in mg/dL, e.g. `"+6, +8, -3"`
    pub fn changes_display(&self) -> String {
        self.changes_display_in(GlucoseUnit::MgDl)
    }

    pub fn changes_display_in(&self, unit: GlucoseUnit) -> String {
        join_or_placeholder(self.changes().into_iter().map(|c| format_change(c, unit)))
    }

    /// Measurement times of the last five readings, e.g. `"09:05, 09:10"`
    pub fn times_display(&self) -> String {
        join_or_placeholder(self.recent().map(|r| r.timestamp().format("%H:%M").to_string()))
    }

    fn recent(&self) -> impl Iterator<Item = &&'a Reading> + '_ {
        let skip = self.readings.len().saturating_sub(DISPLAY_COUNT);
        self.readings.iter().skip(skip)
    }
}

/// Signed, at the unit's precision; a change that rounds to zero has no sign
fn format_change(change: f64, unit: GlucoseUnit) -> String {
    match unit {
        GlucoseUnit::MgDl => {
            let rounded = change.round();
            if rounded == 0.0 {
                "0".to_string()
            } else {
                format!("{:+.0}", rounded)
            }
        }
        GlucoseUnit::MmolL => {
            let rounded = (change / MGDL_PER_MMOL * 10.0).round() / 10.0;
            if rounded == 0.0 {
                "0.0".to_string()
            } else {
                format!("{:+.1}", rounded)
            }
        }
    }
}

fn join_or_placeholder<I: Iterator<Item = String>>(parts: I) -> String {
    let parts: Vec<String> = parts.collect();
    if parts.is_empty() {
        NO_DATA.to_string()
    } else {
        parts.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};

    fn series(values: &[f64]) -> Vec<Reading> {
        let start = Local.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| Reading::new(v, start + Duration::minutes(5 * i as i64)))
            .collect()
    }

    #[test]
    fn test_changes_of_short_series_are_empty() {
        assert!(TrendAnalyzer::new(&series(&[])).changes().is_empty());
        assert!(TrendAnalyzer::new(&series(&[120.0])).changes().is_empty());
    }

    #[test]
    fn test_changes_pairwise() {
        let readings = series(&[100.0, 105.0, 95.0, 95.0, 110.0, 120.0]);
        let analyzer = TrendAnalyzer::new(&readings);
        assert_eq!(analyzer.changes(), vec![5.0, -10.0, 0.0, 15.0, 10.0]);
    }

    #[test]
    fn test_changes_truncated_to_last_five() {
        let readings = series(&[100.0, 101.0, 103.0, 106.0, 110.0, 115.0, 121.0, 128.0]);
        let analyzer = TrendAnalyzer::new(&readings);
        assert_eq!(analyzer.changes(), vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_trend_bands() {
        assert_eq!(Trend::from_mean(10.5), Trend::RisingRapidly);
        assert_eq!(Trend::from_mean(10.0), Trend::Rising);
        assert_eq!(Trend::from_mean(6.0), Trend::Rising);
        assert_eq!(Trend::from_mean(5.0), Trend::RisingSlowly);
        assert_eq!(Trend::from_mean(1.0), Trend::Stable);
        assert_eq!(Trend::from_mean(-1.0), Trend::Stable);
        assert_eq!(Trend::from_mean(-5.0), Trend::FallingSlowly);
        assert_eq!(Trend::from_mean(-10.0), Trend::Falling);
        assert_eq!(Trend::from_mean(-11.0), Trend::FallingRapidly);
    }

    #[test]
    fn test_trend_description_from_readings() {
        let rising = series(&[100.0, 106.0, 112.0, 118.0]);
        assert_eq!(TrendAnalyzer::new(&rising).trend_description(), "Rising");

        let falling = series(&[200.0, 189.0, 178.0, 167.0]);
        assert_eq!(TrendAnalyzer::new(&falling).trend_description(), "Falling rapidly");

        let short = series(&[100.0, 120.0, 140.0]);
        assert_eq!(TrendAnalyzer::new(&short).trend_description(), "Insufficient data");
    }

    #[test]
    fn test_trend_uses_only_last_three_changes() {
        // early drop is outside the sample
        let readings = series(&[200.0, 100.0, 100.0, 101.0, 101.0]);
        assert_eq!(TrendAnalyzer::new(&readings).trend(), Trend::Stable);
    }

    #[test]
    fn test_display_strings() {
        let readings = series(&[98.0, 104.4, 112.0, 109.0, 109.2, 115.0]);
        let analyzer = TrendAnalyzer::new(&readings);
        assert_eq!(analyzer.values_display(), "104, 112, 109, 109, 115");
        assert_eq!(analyzer.changes_display(), "+6, +8, -3, 0, +6");
        assert_eq!(analyzer.times_display(), "09:05, 09:10, 09:15, 09:20, 09:25");
    }

    #[test]
    fn test_display_strings_in_mmol() {
        let readings = series(&[90.0, 99.0, 117.0, 117.5, 108.0]);
        let analyzer = TrendAnalyzer::new(&readings);
        assert_eq!(analyzer.values_display_in(GlucoseUnit::MmolL), "5.0, 5.5, 6.5, 6.5, 6.0");
        assert_eq!(analyzer.changes_display_in(GlucoseUnit::MmolL), "+0.5, +1.0, 0.0, -0.5");
        assert_eq!(analyzer.values_display_in(GlucoseUnit::MgDl), analyzer.values_display());
    }

    #[test]
    fn test_display_placeholders() {
        let empty: Vec<Reading> = Vec::new();
        let analyzer = TrendAnalyzer::new(&empty);
        assert_eq!(analyzer.values_display(), NO_DATA);
        assert_eq!(analyzer.changes_display(), NO_DATA);
        assert_eq!(analyzer.times_display(), NO_DATA);
        assert_eq!(analyzer.latest_delta(), None);
    }

    #[test]
    fn test_latest_delta_prefers_source_value() {
        let mut readings = series(&[100.0, 108.0]);
        assert_eq!(TrendAnalyzer::new(&readings).latest_delta(), Some(8.0));

        let last = readings.pop().unwrap().with_delta(Some(3.5));
        readings.push(last);
        assert_eq!(TrendAnalyzer::new(&readings).latest_delta(), Some(3.5));

        let single = series(&[100.0]);
        assert_eq!(TrendAnalyzer::new(&single).latest_delta(), None);
    }

    #[test]
    fn test_trend_appears_with_fourth_reading() {
        let mut window = HistoryWindow::new(10);
        for reading in series(&[90.0, 95.0, 100.0]) {
            window.insert(reading);
        }
        assert_eq!(TrendAnalyzer::from_window(&window).trend(), Trend::InsufficientData);

        let fourth = series(&[90.0, 95.0, 100.0, 110.0]).pop().unwrap();
        window.insert(fourth);
        let analyzer = TrendAnalyzer::from_window(&window);
        assert_eq!(analyzer.changes(), vec![5.0, 5.0, 10.0]);
        assert_eq!(analyzer.trend_description(), "Rising");
    }
}

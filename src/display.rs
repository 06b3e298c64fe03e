//! Color and arrow mapping for the overlay readout

use serde::Serialize;

use crate::reading::Direction;

/// Display band of a glucose value (mg/dL).
///
/// The two extremes share a color but are distinct bands: a low is never
/// confused with a high anywhere before the final paint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlucoseBand {
    Low,        // < 70
    LowNormal,  // 70 to < 80
    Normal,     // 80 to 180
    HighNormal, // > 180 to 250
    High,       // > 250
}

impl GlucoseBand {
    pub fn of(value: f64) -> Self {
        if value < 70.0 {
            GlucoseBand::Low
        } else if value < 80.0 {
            GlucoseBand::LowNormal
        } else if value <= 180.0 {
            GlucoseBand::Normal
        } else if value <= 250.0 {
            GlucoseBand::HighNormal
        } else {
            GlucoseBand::High
        }
    }

    pub fn color(self) -> GlucoseColor {
        match self {
            GlucoseBand::Low => GlucoseColor::Red,
            GlucoseBand::LowNormal => GlucoseColor::Orange,
            GlucoseBand::Normal => GlucoseColor::Lime,
            GlucoseBand::HighNormal => GlucoseColor::Yellow,
            GlucoseBand::High => GlucoseColor::Red,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GlucoseColor {
    Red,
    Orange,
    Lime,
    Yellow,
}

impl GlucoseColor {
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            GlucoseColor::Red => (255, 0, 0),
            GlucoseColor::Orange => (255, 165, 0),
            GlucoseColor::Lime => (0, 255, 0),
            GlucoseColor::Yellow => (255, 255, 0),
        }
    }

    /// `#RRGGBB`
    pub fn hex(self) -> String {
        let (r, g, b) = self.rgb();
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

pub fn color_of(value: f64) -> GlucoseColor {
    GlucoseBand::of(value).color()
}

impl Direction {
    /// Arrow glyph, `?` when unknown
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::DoubleUp => "⇈",
            Direction::SingleUp => "↑",
            Direction::FortyFiveUp => "↗",
            Direction::Flat => "→",
            Direction::FortyFiveDown => "↘",
            Direction::SingleDown => "↓",
            Direction::DoubleDown => "⇊",
            Direction::Unknown => "?",
        }
    }
}

/// Arrow glyph for a direction name, matched without regard to case
pub fn arrow_of(direction: &str) -> &'static str {
    Direction::parse(direction).arrow()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges() {
        assert_eq!(GlucoseBand::of(69.9), GlucoseBand::Low);
        assert_eq!(GlucoseBand::of(70.0), GlucoseBand::LowNormal);
        assert_eq!(GlucoseBand::of(79.9), GlucoseBand::LowNormal);
        assert_eq!(GlucoseBand::of(80.0), GlucoseBand::Normal);
        assert_eq!(GlucoseBand::of(180.0), GlucoseBand::Normal);
        assert_eq!(GlucoseBand::of(180.1), GlucoseBand::HighNormal);
        assert_eq!(GlucoseBand::of(250.0), GlucoseBand::HighNormal);
        assert_eq!(GlucoseBand::of(250.1), GlucoseBand::High);
    }

    #[test]
    fn test_extremes_share_color_not_band() {
        assert_eq!(color_of(40.0), GlucoseColor::Red);
        assert_eq!(color_of(400.0), GlucoseColor::Red);
        assert_ne!(GlucoseBand::of(40.0), GlucoseBand::of(400.0));
        assert_eq!(color_of(75.0), GlucoseColor::Orange);
        assert_eq!(color_of(120.0), GlucoseColor::Lime);
        assert_eq!(color_of(200.0), GlucoseColor::Yellow);
    }

    #[test]
    fn test_color_is_pure() {
        let palette = [
            GlucoseColor::Red,
            GlucoseColor::Orange,
            GlucoseColor::Lime,
            GlucoseColor::Yellow,
        ];
        // sweep up then down; no hysteresis
        let up: Vec<GlucoseColor> = (0..=400).map(|v| color_of(v as f64)).collect();
        let down: Vec<GlucoseColor> = (0..=400).rev().map(|v| color_of(v as f64)).collect();
        for (v, color) in up.iter().enumerate() {
            assert!(palette.contains(color));
            assert_eq!(*color, down[400 - v]);
        }
    }

    #[test]
    fn test_arrows() {
        assert_eq!(arrow_of("SingleUp"), "↑");
        assert_eq!(arrow_of("flat"), "→");
        assert_eq!(arrow_of("DOUBLEUP"), "⇈");
        assert_eq!(arrow_of("FortyFiveDown"), "↘");
        assert_eq!(arrow_of("garbage"), "?");
        assert_eq!(arrow_of("NOT COMPUTABLE"), "?");
        assert_eq!(GlucoseColor::Orange.hex(), "#FFA500");
    }
}

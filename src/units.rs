//! Glucose unit types and formatting
//!
//! Every numeric comparison in the engine runs on mg/dL, the storage unit
//! Nightscout reports `sgv` in. mmol/L exists only for display: a reading's
//! unit tag says how the user wants to see it, never how it is compared.

use serde::{Deserialize, Serialize};

/// mg/dL per mmol/L for glucose (molar mass 180.16 g/mol)
pub const MGDL_PER_MMOL: f64 = 18.0182;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.0} mg/dL", self.0)
    }

    /// Format just the value without unit suffix
    pub fn format_value(self) -> String {
        format!("{:.0}", self.0)
    }

    pub fn unit_label() -> &'static str {
        "mg/dL"
    }
}

impl MmolL {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.1} mmol/L", self.0)
    }

    /// Format just the value without unit suffix
    pub fn format_value(self) -> String {
        format!("{:.1}", self.0)
    }

    pub fn unit_label() -> &'static str {
        "mmol/L"
    }
}

impl From<MgDl> for MmolL {
    fn from(value: MgDl) -> Self {
        MmolL(value.0 / MGDL_PER_MMOL)
    }
}

impl From<MmolL> for MgDl {
    fn from(value: MmolL) -> Self {
        MgDl(value.0 * MGDL_PER_MMOL)
    }
}

/// User's preferred display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL", alias = "mg/dl")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L", alias = "mmol")]
    MmolL,
}

impl GlucoseUnit {
    /// Parse a Nightscout unit tag; anything unrecognised is mg/dL
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mmol" | "mmol/l" => GlucoseUnit::MmolL,
            _ => GlucoseUnit::MgDl,
        }
    }

    /// Format a canonical mg/dL value in this unit
    pub fn format(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => MgDl(mg_dl).format(),
            GlucoseUnit::MmolL => MmolL::from(MgDl(mg_dl)).format(),
        }
    }

    /// Format a canonical mg/dL value in this unit without suffix
    pub fn format_value(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => MgDl(mg_dl).format_value(),
            GlucoseUnit::MmolL => MmolL::from(MgDl(mg_dl)).format_value(),
        }
    }

    /// Format a signed mg/dL change in this unit
    pub fn format_delta(self, delta_mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => format!("{:+.0}", delta_mg_dl),
            GlucoseUnit::MmolL => format!("{:+.1}", delta_mg_dl / MGDL_PER_MMOL),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => MgDl::unit_label(),
            GlucoseUnit::MmolL => MmolL::unit_label(),
        }
    }
}

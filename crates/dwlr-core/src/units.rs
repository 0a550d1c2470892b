//! Unit handling for barometric pressure
//!
//! DWLR feeds report pressure either as a water column (mH2O) or in
//! hectopascal. Values are never mixed silently; anything that compares or
//! averages pressures across sources converts through this module first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hectopascal per meter of water column (conventional, 4 °C)
pub const HPA_PER_METRE_H2O: f64 = 98.0665;

/// Standard atmosphere at sea level in hectopascal
pub const STANDARD_ATMOSPHERE_HPA: f64 = 1013.25;

/// Unit conversion error
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum UnitError {
    #[error("Unknown pressure unit: {0}")]
    UnknownPressureUnit(String),
}

/// Unit a pressure value is expressed in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PressureUnit {
    #[serde(rename = "mH2O")]
    MetresH2O,
    #[serde(rename = "hPa")]
    Hectopascal,
}

impl PressureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureUnit::MetresH2O => "mH2O",
            PressureUnit::Hectopascal => "hPa",
        }
    }

    /// Convert a value in this unit to hectopascal
    pub fn to_hpa(&self, value: f64) -> f64 {
        convert_pressure(value, *self, PressureUnit::Hectopascal)
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for PressureUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mh2o" | "m h2o" | "mwc" => Ok(PressureUnit::MetresH2O),
            "hpa" | "mbar" | "mb" => Ok(PressureUnit::Hectopascal),
            _ => Err(UnitError::UnknownPressureUnit(s.to_string())),
        }
    }
}

/// Convert a pressure value between units
pub fn convert_pressure(value: f64, from: PressureUnit, to: PressureUnit) -> f64 {
    match (from, to) {
        (PressureUnit::MetresH2O, PressureUnit::Hectopascal) => value * HPA_PER_METRE_H2O,
        (PressureUnit::Hectopascal, PressureUnit::MetresH2O) => value / HPA_PER_METRE_H2O,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pressure_conversion() {
        // 10 m of water column is roughly one atmosphere
        let hpa = convert_pressure(10.0, PressureUnit::MetresH2O, PressureUnit::Hectopascal);
        assert!((hpa - 980.665).abs() < 0.001);

        let back = convert_pressure(hpa, PressureUnit::Hectopascal, PressureUnit::MetresH2O);
        assert!((back - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_same_unit_conversion() {
        let result = convert_pressure(
            1013.25,
            PressureUnit::Hectopascal,
            PressureUnit::Hectopascal,
        );
        assert_eq!(result, 1013.25);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("mH2O".parse::<PressureUnit>(), Ok(PressureUnit::MetresH2O));
        assert_eq!(" hPa ".parse::<PressureUnit>(), Ok(PressureUnit::Hectopascal));
        assert_eq!(
            "psi".parse::<PressureUnit>(),
            Err(UnitError::UnknownPressureUnit("psi".to_string()))
        );
    }

    #[test]
    fn test_unit_serde_symbols() {
        assert_eq!(
            serde_json::to_string(&PressureUnit::MetresH2O).unwrap(),
            "\"mH2O\""
        );
        let unit: PressureUnit = serde_json::from_str("\"hPa\"").unwrap();
        assert_eq!(unit, PressureUnit::Hectopascal);
    }
}

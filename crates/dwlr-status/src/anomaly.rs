//! Per-reading anomaly detection

use dwlr_core::{AnomalySeverity, Reading};
use serde::Serialize;

use crate::{AnomalyDetectionPolicy, BatteryStatus};

/// What an anomaly flag is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    CriticalBattery,
    LowBattery,
    ExtremeTemperature,
    HighTemperature,
    CriticalWaterLevel,
    LowWaterLevel,
    ExtremePressure,
    InvalidReading,
}

impl AnomalyKind {
    /// Human-readable reason shown on dashboards
    pub fn label(&self) -> &'static str {
        match self {
            AnomalyKind::CriticalBattery => "Critical Battery",
            AnomalyKind::LowBattery => "Low Battery",
            AnomalyKind::ExtremeTemperature => "Extreme Temperature",
            AnomalyKind::HighTemperature => "High Temperature",
            AnomalyKind::CriticalWaterLevel => "Critical Water Level",
            AnomalyKind::LowWaterLevel => "Low Water Level",
            AnomalyKind::ExtremePressure => "Extreme Pressure",
            AnomalyKind::InvalidReading => "Invalid Reading",
        }
    }

    pub fn severity(&self) -> AnomalySeverity {
        match self {
            AnomalyKind::LowBattery | AnomalyKind::HighTemperature => AnomalySeverity::Medium,
            AnomalyKind::LowWaterLevel => AnomalySeverity::High,
            AnomalyKind::CriticalBattery
            | AnomalyKind::ExtremeTemperature
            | AnomalyKind::CriticalWaterLevel
            | AnomalyKind::ExtremePressure
            | AnomalyKind::InvalidReading => AnomalySeverity::Critical,
        }
    }
}

/// A raised anomaly flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub severity: AnomalySeverity,
    pub label: &'static str,
}

impl From<AnomalyKind> for Anomaly {
    fn from(kind: AnomalyKind) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            label: kind.label(),
        }
    }
}

/// Anomaly evaluation of one reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingAssessment {
    pub anomalies: Vec<Anomaly>,
    pub severity: AnomalySeverity,
    pub battery_status: BatteryStatus,
    /// Flagged by the source or by at least one computed check
    pub is_anomaly: bool,
}

impl ReadingAssessment {
    pub fn reasons(&self) -> Vec<&'static str> {
        self.anomalies.iter().map(|a| a.label).collect()
    }
}

impl AnomalyDetectionPolicy {
    /// Evaluate every check against a single reading.
    ///
    /// Flags accumulate. A critical flag always sets the overall severity to
    /// critical; medium and high flags only raise it while it is still low.
    pub fn assess(&self, reading: &Reading) -> ReadingAssessment {
        let mut anomalies: Vec<Anomaly> = Vec::new();
        let mut severity = AnomalySeverity::Low;
        let mut raise = |kind: AnomalyKind| {
            let flag = Anomaly::from(kind);
            if flag.severity == AnomalySeverity::Critical || severity == AnomalySeverity::Low {
                severity = flag.severity;
            }
            anomalies.push(flag);
        };

        let battery = reading.battery_v;
        if battery < self.battery_critical_v {
            raise(AnomalyKind::CriticalBattery);
        } else if battery < self.battery_warning_v {
            raise(AnomalyKind::LowBattery);
        }

        let temperature = reading.temperature_c;
        if temperature > self.temperature_extreme_c || temperature < self.temperature_min_c {
            raise(AnomalyKind::ExtremeTemperature);
        } else if temperature > self.temperature_max_c {
            raise(AnomalyKind::HighTemperature);
        }

        let level = reading.water_level_m;
        if level < self.level_critical_m {
            raise(AnomalyKind::CriticalWaterLevel);
        } else if level < self.level_warning_m {
            raise(AnomalyKind::LowWaterLevel);
        }

        let deviation = (reading.pressure_hpa() - self.pressure_reference_hpa).abs();
        if deviation > self.pressure_extreme_delta_hpa {
            raise(AnomalyKind::ExtremePressure);
        }

        // NaN fails every comparison above
        if !reading.is_finite() {
            raise(AnomalyKind::InvalidReading);
        }

        let is_anomaly = reading.reported_anomaly || !anomalies.is_empty();
        ReadingAssessment {
            anomalies,
            severity,
            battery_status: self.battery_status(battery),
            is_anomaly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dwlr_core::PressureUnit;

    fn reading(level: f64, battery: f64, temperature: f64, pressure_hpa: f64) -> Reading {
        Reading {
            timestamp: Utc.with_ymd_and_hms(2025, 9, 21, 8, 0, 0).unwrap(),
            water_level_m: level,
            battery_v: battery,
            temperature_c: temperature,
            pressure: pressure_hpa,
            pressure_unit: PressureUnit::Hectopascal,
            reported_anomaly: false,
        }
    }

    fn kinds(assessment: &ReadingAssessment) -> Vec<AnomalyKind> {
        assessment.anomalies.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_nominal_reading_has_no_flags() {
        let assessment = AnomalyDetectionPolicy::default().assess(&reading(-2.0, 3.8, 25.0, 1010.0));
        assert!(assessment.anomalies.is_empty());
        assert_eq!(assessment.severity, AnomalySeverity::Low);
        assert_eq!(assessment.battery_status, BatteryStatus::Good);
        assert!(!assessment.is_anomaly);
    }

    #[test]
    fn test_flags_accumulate() {
        let policy = AnomalyDetectionPolicy::default();
        let assessment = policy.assess(&reading(-12.0, 3.1, 42.0, 1100.0));
        assert_eq!(
            kinds(&assessment),
            vec![
                AnomalyKind::CriticalBattery,
                AnomalyKind::ExtremeTemperature,
                AnomalyKind::CriticalWaterLevel,
                AnomalyKind::ExtremePressure,
            ]
        );
        assert_eq!(assessment.severity, AnomalySeverity::Critical);
        assert_eq!(
            assessment.reasons(),
            vec![
                "Critical Battery",
                "Extreme Temperature",
                "Critical Water Level",
                "Extreme Pressure"
            ]
        );
    }

    #[test]
    fn test_warning_bands() {
        let policy = AnomalyDetectionPolicy::default();
        assert_eq!(
            kinds(&policy.assess(&reading(-2.0, 3.3, 25.0, 1013.0))),
            vec![AnomalyKind::LowBattery]
        );
        assert_eq!(
            kinds(&policy.assess(&reading(-2.0, 3.8, 36.0, 1013.0))),
            vec![AnomalyKind::HighTemperature]
        );
        assert_eq!(
            kinds(&policy.assess(&reading(-2.0, 3.8, 14.0, 1013.0))),
            vec![AnomalyKind::ExtremeTemperature]
        );
        let low_water = policy.assess(&reading(-6.0, 3.8, 25.0, 1013.0));
        assert_eq!(kinds(&low_water), vec![AnomalyKind::LowWaterLevel]);
        assert_eq!(low_water.severity, AnomalySeverity::High);
    }

    #[test]
    fn test_medium_flag_is_not_raised_by_later_high_flag() {
        let assessment = AnomalyDetectionPolicy::default().assess(&reading(-6.0, 3.3, 25.0, 1013.0));
        assert_eq!(
            kinds(&assessment),
            vec![AnomalyKind::LowBattery, AnomalyKind::LowWaterLevel]
        );
        assert_eq!(assessment.severity, AnomalySeverity::Medium);
    }

    #[test]
    fn test_pressure_in_metres_of_water_is_converted() {
        let policy = AnomalyDetectionPolicy::default();
        let mut r = reading(-2.0, 3.8, 25.0, 10.33);
        r.pressure_unit = PressureUnit::MetresH2O;
        assert!(policy.assess(&r).anomalies.is_empty());

        r.pressure = 9.5;
        assert_eq!(kinds(&policy.assess(&r)), vec![AnomalyKind::ExtremePressure]);
    }

    #[test]
    fn test_reported_anomaly_counts() {
        let mut r = reading(-2.0, 3.8, 25.0, 1013.0);
        r.reported_anomaly = true;
        let assessment = AnomalyDetectionPolicy::default().assess(&r);
        assert!(assessment.anomalies.is_empty());
        assert!(assessment.is_anomaly);
    }

    #[test]
    fn test_non_finite_reading_is_flagged_invalid() {
        let assessment =
            AnomalyDetectionPolicy::default().assess(&reading(-2.0, 3.8, f64::NAN, 1013.0));
        assert_eq!(kinds(&assessment), vec![AnomalyKind::InvalidReading]);
        assert_eq!(assessment.severity, AnomalySeverity::Critical);
        assert!(assessment.is_anomaly);
    }
}

//! Station classification

use chrono::{DateTime, Utc};
use dwlr_core::{AnomalySeverity, HealthStatus, Reading, SeverityBand, Station, Trend};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    severity_band, Anomaly, AnomalyDetectionPolicy, AnomalyKind, DashboardHealthPolicy,
    ReadingAssessment,
};

/// Status derived from a station's latest readings at a point in time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStatus {
    pub severity: SeverityBand,
    pub health: HealthStatus,
    pub trend: Trend,
    pub anomalies: Vec<Anomaly>,
    pub anomaly_severity: AnomalySeverity,
}

impl DerivedStatus {
    /// Status of a station that has never reported
    pub fn no_readings() -> Self {
        Self {
            severity: SeverityBand::Critical,
            health: HealthStatus::Offline,
            trend: Trend::Stable,
            anomalies: Vec::new(),
            anomaly_severity: AnomalySeverity::Low,
        }
    }

    pub fn has_anomaly(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|a| a.kind == kind)
    }
}

/// A station together with its derived status
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedStation {
    pub station: Station,
    pub status: DerivedStatus,
}

impl ClassifiedStation {
    pub fn id(&self) -> &str {
        self.station.id()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.station.latest()
    }
}

/// Applies both threshold policies to stations and readings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    #[serde(default)]
    pub dashboard: DashboardHealthPolicy,
    #[serde(default)]
    pub anomaly: AnomalyDetectionPolicy,
}

impl Classifier {
    pub fn new(dashboard: DashboardHealthPolicy, anomaly: AnomalyDetectionPolicy) -> Self {
        Self { dashboard, anomaly }
    }

    /// Derive the status of `station` as of `now`
    pub fn classify(&self, station: &Station, now: DateTime<Utc>) -> DerivedStatus {
        let Some(latest) = station.latest() else {
            return DerivedStatus::no_readings();
        };

        let assessment = self.anomaly.assess(latest);
        DerivedStatus {
            severity: severity_band(latest.water_level_m),
            health: self.dashboard.health(latest, now),
            trend: self.dashboard.trend(latest, station.previous()),
            anomalies: assessment.anomalies,
            anomaly_severity: assessment.severity,
        }
    }

    pub fn assess_reading(&self, reading: &Reading) -> ReadingAssessment {
        self.anomaly.assess(reading)
    }

    #[instrument(skip(self, stations), fields(stations = stations.len()))]
    pub fn classify_all(&self, stations: &[Station], now: DateTime<Utc>) -> Vec<ClassifiedStation> {
        let classified: Vec<ClassifiedStation> = stations
            .iter()
            .map(|station| ClassifiedStation {
                status: self.classify(station, now),
                station: station.clone(),
            })
            .collect();
        debug!(
            alerts = classified.iter().filter(|c| c.status.health.is_alert()).count(),
            "Classified stations"
        );
        classified
    }
}

/// Classify with the default policies
pub fn classify(station: &Station, now: DateTime<Utc>) -> DerivedStatus {
    Classifier::default().classify(station, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use dwlr_core::{Location, PressureUnit};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 21, 12, 0, 0).unwrap()
    }

    fn reading(minutes_ago: i64, level: f64, battery: f64) -> Reading {
        Reading {
            timestamp: now() - Duration::minutes(minutes_ago),
            water_level_m: level,
            battery_v: battery,
            temperature_c: 24.0,
            pressure: 1012.0,
            pressure_unit: PressureUnit::Hectopascal,
            reported_anomaly: false,
        }
    }

    fn station(readings: Vec<Reading>) -> Station {
        Station::new("DWLR-T1", Location::default(), readings)
    }

    #[test]
    fn test_classify_is_pure() {
        let s = station(vec![reading(60, -5.0, 3.8), reading(30, -4.8, 3.8)]);
        let first = classify(&s, now());
        let second = classify(&s, now());
        assert_eq!(first, second);
        assert_eq!(first.trend, Trend::Rising);
        assert_eq!(first.health, HealthStatus::Warning);
        assert_eq!(first.severity, SeverityBand::Good);
    }

    #[test]
    fn test_trend_uses_last_two_readings() {
        let stable = station(vec![reading(60, -5.0, 3.8), reading(30, -5.05, 3.8)]);
        assert_eq!(classify(&stable, now()).trend, Trend::Stable);

        let single = station(vec![reading(30, -5.0, 3.8)]);
        assert_eq!(classify(&single, now()).trend, Trend::Stable);
    }

    #[test]
    fn test_stale_station_is_offline() {
        let s = station(vec![reading(180, -16.0, 2.8)]);
        let status = classify(&s, now());
        assert_eq!(status.health, HealthStatus::Offline);
        assert_eq!(status.severity, SeverityBand::Critical);
        assert!(status.has_anomaly(AnomalyKind::CriticalBattery));
        assert!(status.has_anomaly(AnomalyKind::CriticalWaterLevel));
    }

    #[test]
    fn test_station_without_readings() {
        let status = classify(&station(Vec::new()), now());
        assert_eq!(status, DerivedStatus::no_readings());
        assert_eq!(status.health, HealthStatus::Offline);
        assert_eq!(status.severity, SeverityBand::Critical);
        assert_eq!(status.trend, Trend::Stable);
    }

    #[test]
    fn test_non_finite_latest_fails_closed() {
        let s = station(vec![reading(10, f64::NAN, 3.8)]);
        let status = classify(&s, now());
        assert_eq!(status.severity, SeverityBand::Critical);
        assert_eq!(status.health, HealthStatus::Critical);
        assert!(status.has_anomaly(AnomalyKind::InvalidReading));
        assert_eq!(status.anomaly_severity, AnomalySeverity::Critical);
    }

    #[test]
    fn test_custom_policy_is_honoured() {
        let classifier = Classifier::new(
            DashboardHealthPolicy {
                offline_after_minutes: 15,
                ..Default::default()
            },
            AnomalyDetectionPolicy::default(),
        );
        let s = station(vec![reading(30, -1.0, 3.9)]);
        assert_eq!(classifier.classify(&s, now()).health, HealthStatus::Offline);
        assert_eq!(classify(&s, now()).health, HealthStatus::Normal);
    }

    #[test]
    fn test_huge_offline_threshold_does_not_panic() {
        let classifier = Classifier::new(
            DashboardHealthPolicy {
                offline_after_minutes: i64::MAX,
                ..Default::default()
            },
            AnomalyDetectionPolicy::default(),
        );
        let s = station(vec![reading(600, -1.0, 3.9)]);
        assert_eq!(classifier.classify(&s, now()).health, HealthStatus::Normal);
    }

    #[test]
    fn test_classify_all_keeps_order() {
        let stations = vec![
            Station::new("A", Location::default(), vec![reading(10, -2.0, 4.0)]),
            Station::new("B", Location::default(), vec![reading(10, -7.0, 4.0)]),
        ];
        let classified = Classifier::default().classify_all(&stations, now());
        let ids: Vec<&str> = classified.iter().map(ClassifiedStation::id).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(classified[1].status.health, HealthStatus::Critical);
        assert_eq!(classified[1].status.severity, SeverityBand::Moderate);
    }
}

//! Threshold tables

use chrono::{DateTime, Duration, Utc};
use dwlr_core::{HealthStatus, Reading, SeverityBand, Trend};
use serde::{Deserialize, Serialize};

/// Water-level severity band of a level in meters.
///
/// `excellent` above 0, `good` in (-5, 0], `moderate` in (-10, -5],
/// `poor` in (-15, -10], `critical` at -15 and below. A non-finite level is
/// `critical`.
pub fn severity_band(level_m: f64) -> SeverityBand {
    if !level_m.is_finite() {
        SeverityBand::Critical
    } else if level_m > 0.0 {
        SeverityBand::Excellent
    } else if level_m > -5.0 {
        SeverityBand::Good
    } else if level_m > -10.0 {
        SeverityBand::Moderate
    } else if level_m > -15.0 {
        SeverityBand::Poor
    } else {
        SeverityBand::Critical
    }
}

/// Thresholds used by the station dashboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardHealthPolicy {
    /// Level below which a station is critical (m)
    pub critical_level_m: f64,
    /// Level below which a station is in warning (m)
    pub warning_level_m: f64,
    pub critical_battery_v: f64,
    pub warning_battery_v: f64,
    /// Age of the latest reading beyond which a station is offline
    pub offline_after_minutes: i64,
    /// Level change that counts as rising/falling (m)
    pub trend_deadband_m: f64,
    /// Temperature above which a station counts as running hot (°C)
    pub high_temperature_c: f64,
}

impl Default for DashboardHealthPolicy {
    fn default() -> Self {
        Self {
            critical_level_m: -6.0,
            warning_level_m: -4.0,
            critical_battery_v: 3.0,
            warning_battery_v: 3.5,
            offline_after_minutes: 120,
            trend_deadband_m: 0.1,
            high_temperature_c: 30.0,
        }
    }
}

impl DashboardHealthPolicy {
    /// `None` when the threshold does not fit a [`Duration`]
    pub fn offline_after(&self) -> Option<Duration> {
        Duration::try_minutes(self.offline_after_minutes)
    }

    /// Strictly older than the offline threshold; never offline when the
    /// threshold is out of range
    pub fn is_offline(&self, reading: &Reading, now: DateTime<Utc>) -> bool {
        self.offline_after()
            .is_some_and(|limit| now.signed_duration_since(reading.timestamp) > limit)
    }

    /// Composite health of the latest reading at `now`
    pub fn health(&self, latest: &Reading, now: DateTime<Utc>) -> HealthStatus {
        if self.is_offline(latest, now) {
            return HealthStatus::Offline;
        }

        let level = latest.water_level_m;
        let battery = latest.battery_v;
        if !level.is_finite() || !battery.is_finite() {
            return HealthStatus::Critical;
        }

        if level < self.critical_level_m || battery < self.critical_battery_v {
            HealthStatus::Critical
        } else if level < self.warning_level_m || battery < self.warning_battery_v {
            HealthStatus::Warning
        } else {
            HealthStatus::Normal
        }
    }

    /// Direction of change from `previous` to `latest`
    pub fn trend(&self, latest: &Reading, previous: Option<&Reading>) -> Trend {
        let Some(previous) = previous else {
            return Trend::Stable;
        };
        let delta = latest.water_level_m - previous.water_level_m;
        if delta > self.trend_deadband_m {
            Trend::Rising
        } else if delta < -self.trend_deadband_m {
            Trend::Falling
        } else {
            Trend::Stable
        }
    }

    /// Battery below the warning voltage; unreadable voltages count as low
    pub fn is_low_battery(&self, battery_v: f64) -> bool {
        !(battery_v >= self.warning_battery_v)
    }

    pub fn is_high_temperature(&self, temperature_c: f64) -> bool {
        temperature_c > self.high_temperature_c
    }
}

/// Thresholds used by the anomaly detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyDetectionPolicy {
    pub battery_critical_v: f64,
    pub battery_warning_v: f64,
    /// Lower bound of the normal water temperature range (°C)
    pub temperature_min_c: f64,
    /// Upper bound of the normal water temperature range (°C)
    pub temperature_max_c: f64,
    pub temperature_extreme_c: f64,
    pub level_critical_m: f64,
    pub level_warning_m: f64,
    pub pressure_reference_hpa: f64,
    /// Allowed deviation from the reference pressure (hPa)
    pub pressure_extreme_delta_hpa: f64,
}

impl Default for AnomalyDetectionPolicy {
    fn default() -> Self {
        Self {
            battery_critical_v: 3.2,
            battery_warning_v: 3.4,
            temperature_min_c: 15.0,
            temperature_max_c: 35.0,
            temperature_extreme_c: 40.0,
            level_critical_m: -10.0,
            level_warning_m: -5.0,
            pressure_reference_hpa: dwlr_core::STANDARD_ATMOSPHERE_HPA,
            pressure_extreme_delta_hpa: 50.0,
        }
    }
}

/// Battery condition under the anomaly policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    Good,
    Warning,
    Critical,
}

impl AnomalyDetectionPolicy {
    pub fn battery_status(&self, battery_v: f64) -> BatteryStatus {
        if !battery_v.is_finite() || battery_v < self.battery_critical_v {
            BatteryStatus::Critical
        } else if battery_v < self.battery_warning_v {
            BatteryStatus::Warning
        } else {
            BatteryStatus::Good
        }
    }
}

//! Station queries

use dwlr_core::{SeverityBand, Trend};
use dwlr_status::{ClassifiedStation, DashboardHealthPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::StatsError;

/// Level below which a station shows up under the low-water filter (m)
pub const LOW_WATER_LEVEL_M: f64 = -10.0;

/// Preset dashboard filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickFilter {
    #[default]
    All,
    LowBattery,
    HighTemp,
    LowWater,
    Critical,
    Recharged,
    Excellent,
}

impl QuickFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuickFilter::All => "all",
            QuickFilter::LowBattery => "low_battery",
            QuickFilter::HighTemp => "high_temp",
            QuickFilter::LowWater => "low_water",
            QuickFilter::Critical => "critical",
            QuickFilter::Recharged => "recharged",
            QuickFilter::Excellent => "excellent",
        }
    }

    /// Reading thresholds come from `policy`; stations without readings only
    /// match filters on derived status
    pub fn matches(&self, station: &ClassifiedStation, policy: &DashboardHealthPolicy) -> bool {
        let latest = station.latest();
        match self {
            QuickFilter::All => true,
            QuickFilter::LowBattery => latest.is_some_and(|r| policy.is_low_battery(r.battery_v)),
            QuickFilter::HighTemp => {
                latest.is_some_and(|r| policy.is_high_temperature(r.temperature_c))
            }
            QuickFilter::LowWater => latest.is_some_and(|r| r.water_level_m < LOW_WATER_LEVEL_M),
            QuickFilter::Critical => station.status.severity == SeverityBand::Critical,
            QuickFilter::Recharged => station.status.trend == Trend::Rising,
            QuickFilter::Excellent => station.status.severity == SeverityBand::Excellent,
        }
    }
}

impl fmt::Display for QuickFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuickFilter {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(QuickFilter::All),
            "low_battery" => Ok(QuickFilter::LowBattery),
            "high_temp" => Ok(QuickFilter::HighTemp),
            "low_water" => Ok(QuickFilter::LowWater),
            "critical" => Ok(QuickFilter::Critical),
            "recharged" => Ok(QuickFilter::Recharged),
            "excellent" => Ok(QuickFilter::Excellent),
            other => Err(StatsError::UnknownFilter(other.to_string())),
        }
    }
}

/// State, free-text and preset filters, all of which must match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationQuery {
    /// Exact state name; `"all"` disables the filter
    #[serde(default)]
    pub state: Option<String>,
    /// Case-insensitive substring of the id, state, district or village
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: QuickFilter,
}

impl StationQuery {
    pub fn is_empty(&self) -> bool {
        self.state_filter().is_none() && self.search_term().is_none() && self.filter == QuickFilter::All
    }

    fn state_filter(&self) -> Option<&str> {
        self.state
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("all"))
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, station: &ClassifiedStation, policy: &DashboardHealthPolicy) -> bool {
        let location = station.station.location();
        if let Some(state) = self.state_filter() {
            if location.state != state {
                return false;
            }
        }
        if let Some(term) = self.search_term() {
            let hit = [
                station.id(),
                location.state.as_str(),
                location.district.as_str(),
                location.village.as_str(),
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&term));
            if !hit {
                return false;
            }
        }
        self.filter.matches(station, policy)
    }

    /// Matching stations, in input order
    pub fn apply(
        &self,
        stations: &[ClassifiedStation],
        policy: &DashboardHealthPolicy,
    ) -> Vec<ClassifiedStation> {
        stations
            .iter()
            .filter(|s| self.matches(s, policy))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use dwlr_core::{Location, PressureUnit, Reading, Station};
    use dwlr_status::Classifier;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 21, 12, 0, 0).unwrap()
    }

    fn station(id: &str, state: &str, village: &str, levels: &[f64], battery: f64, temp: f64) -> Station {
        let readings = levels
            .iter()
            .enumerate()
            .map(|(i, level)| Reading {
                timestamp: now() - Duration::minutes(60 - i as i64 * 15),
                water_level_m: *level,
                battery_v: battery,
                temperature_c: temp,
                pressure: 10.1,
                pressure_unit: PressureUnit::MetresH2O,
                reported_anomaly: false,
            })
            .collect();
        let location = Location {
            state: state.to_string(),
            district: "District".to_string(),
            village: village.to_string(),
            ..Default::default()
        };
        Station::new(id, location, readings)
    }

    fn fixture() -> Vec<ClassifiedStation> {
        let stations = vec![
            station("DWLR-001", "Punjab", "Raikot", &[-3.0, -2.5], 3.9, 24.0),
            station("DWLR-002", "Punjab", "Jagraon", &[-12.0], 3.3, 24.0),
            station("DWLR-003", "Kerala", "Kuttanad", &[0.5], 3.9, 32.0),
            station("DWLR-004", "Kerala", "Alappuzha", &[-16.0], 3.9, 24.0),
        ];
        Classifier::default().classify_all(&stations, now())
    }

    fn ids(stations: &[ClassifiedStation]) -> Vec<&str> {
        stations.iter().map(ClassifiedStation::id).collect()
    }

    fn run(query: StationQuery) -> Vec<String> {
        let stations = fixture();
        let matched = query.apply(&stations, &DashboardHealthPolicy::default());
        ids(&matched).into_iter().map(String::from).collect()
    }

    #[test]
    fn test_quick_filters() {
        let with = |filter| StationQuery {
            filter,
            ..Default::default()
        };
        assert_eq!(run(with(QuickFilter::All)).len(), 4);
        assert_eq!(run(with(QuickFilter::LowBattery)), vec!["DWLR-002"]);
        assert_eq!(run(with(QuickFilter::HighTemp)), vec!["DWLR-003"]);
        assert_eq!(run(with(QuickFilter::LowWater)), vec!["DWLR-002", "DWLR-004"]);
        assert_eq!(run(with(QuickFilter::Critical)), vec!["DWLR-004"]);
        assert_eq!(run(with(QuickFilter::Recharged)), vec!["DWLR-001"]);
        assert_eq!(run(with(QuickFilter::Excellent)), vec!["DWLR-003"]);
    }

    #[test]
    fn test_state_and_search() {
        let by_state = StationQuery {
            state: Some("Kerala".to_string()),
            ..Default::default()
        };
        assert_eq!(run(by_state), vec!["DWLR-003", "DWLR-004"]);

        let all_states = StationQuery {
            state: Some("all".to_string()),
            ..Default::default()
        };
        assert!(all_states.is_empty());
        assert_eq!(run(all_states).len(), 4);

        let search = StationQuery {
            search: Some("  JAGRAON ".to_string()),
            ..Default::default()
        };
        assert_eq!(run(search), vec!["DWLR-002"]);

        let combined = StationQuery {
            state: Some("Punjab".to_string()),
            search: Some("dwlr".to_string()),
            filter: QuickFilter::LowWater,
        };
        assert_eq!(run(combined), vec!["DWLR-002"]);
    }

    #[test]
    fn test_quick_filter_parsing() {
        assert_eq!("low_battery".parse::<QuickFilter>().unwrap(), QuickFilter::LowBattery);
        assert_eq!(" ALL ".parse::<QuickFilter>().unwrap(), QuickFilter::All);
        assert_eq!(
            "sunny".parse::<QuickFilter>(),
            Err(StatsError::UnknownFilter("sunny".to_string()))
        );
        assert_eq!(QuickFilter::HighTemp.to_string(), "high_temp");
    }

    #[test]
    fn test_query_deserializes() {
        let query: StationQuery =
            serde_json::from_str(r#"{"state":"Punjab","filter":"recharged"}"#).unwrap();
        assert_eq!(query.state.as_deref(), Some("Punjab"));
        assert_eq!(query.filter, QuickFilter::Recharged);
        assert_eq!(query.search, None);
    }
}

//! Reading-level anomaly statistics

use dwlr_core::{mean, PressureUnit, Reading, Station};
use dwlr_status::{BatteryStatus, Classifier, ReadingAssessment};
use serde::Serialize;

use crate::{pressure_series, PeriodTrends, PeriodWindow};

/// Figures over one series of readings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingSummary {
    pub total_readings: usize,
    /// Readings flagged by the source or the anomaly policy
    pub anomaly_count: usize,
    pub latest_battery_status: Option<BatteryStatus>,
    pub average_temperature_c: Option<f64>,
    pub average_water_level_m: Option<f64>,
    pub average_pressure: Option<f64>,
    pub pressure_unit: Option<PressureUnit>,
    pub trends: PeriodTrends,
}

/// Summarize readings given in ascending timestamp order
pub fn summarize_readings(
    readings: &[Reading],
    classifier: &Classifier,
    window: PeriodWindow,
) -> ReadingSummary {
    let refs: Vec<&Reading> = readings.iter().collect();
    let (pressures, pressure_unit) = pressure_series(&refs);

    ReadingSummary {
        total_readings: readings.len(),
        anomaly_count: readings
            .iter()
            .filter(|r| classifier.assess_reading(r).is_anomaly)
            .count(),
        latest_battery_status: readings
            .last()
            .map(|r| classifier.anomaly.battery_status(r.battery_v)),
        average_temperature_c: mean(readings.iter().map(|r| r.temperature_c)),
        average_water_level_m: mean(readings.iter().map(|r| r.water_level_m)),
        average_pressure: mean(pressures),
        pressure_unit,
        trends: PeriodTrends::from_readings(&refs, window),
    }
}

/// An anomalous reading and where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlaggedReading {
    pub station_id: String,
    pub reading: Reading,
    pub assessment: ReadingAssessment,
}

/// Every anomalous reading across `stations`, newest first
pub fn flagged_readings<'a, I>(stations: I, classifier: &Classifier) -> Vec<FlaggedReading>
where
    I: IntoIterator<Item = &'a Station>,
{
    let mut flagged: Vec<FlaggedReading> = stations
        .into_iter()
        .flat_map(|station| {
            station.readings().iter().filter_map(move |reading| {
                let assessment = classifier.assess_reading(reading);
                if !assessment.is_anomaly {
                    return None;
                }
                Some(FlaggedReading {
                    station_id: station.id().to_string(),
                    reading: reading.clone(),
                    assessment,
                })
            })
        })
        .collect();
    flagged.sort_by(|a, b| b.reading.timestamp.cmp(&a.reading.timestamp));
    flagged
}

//! Period-over-period windows and daily buckets

use chrono::NaiveDate;
use dwlr_core::{mean, relative_change, Accumulator, AggregateType, PressureUnit, Reading, Station};
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of readings per half of a period comparison
pub const DEFAULT_TREND_WINDOW: usize = 5;

/// Splits a series into its last `size` values and up to `size` before them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodWindow {
    size: usize,
}

impl PeriodWindow {
    /// A zero size is treated as one
    pub fn new(size: usize) -> Self {
        Self { size: size.max(1) }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// `(previous, recent)` halves of an ascending series
    pub fn split<'a, T>(&self, series: &'a [T]) -> (&'a [T], &'a [T]) {
        let recent_start = series.len().saturating_sub(self.size);
        let previous_start = recent_start.saturating_sub(self.size);
        (
            &series[previous_start..recent_start],
            &series[recent_start..],
        )
    }

    /// Relative change in percent from the previous to the recent half.
    ///
    /// `None` when either half has no finite value or the previous mean is 0.
    pub fn change(&self, series: &[f64]) -> Option<f64> {
        let (previous, recent) = self.split(series);
        let previous_avg = mean(previous.iter().copied())?;
        let recent_avg = mean(recent.iter().copied())?;
        relative_change(previous_avg, recent_avg)
    }
}

impl Default for PeriodWindow {
    fn default() -> Self {
        Self::new(DEFAULT_TREND_WINDOW)
    }
}

/// Period-over-period change per metric, in percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTrends {
    pub water_level: Option<f64>,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub battery: Option<f64>,
}

impl PeriodTrends {
    /// Trends over readings already in ascending timestamp order
    pub fn from_readings(readings: &[&Reading], window: PeriodWindow) -> Self {
        let series = |f: fn(&Reading) -> f64| -> Vec<f64> { readings.iter().map(|r| f(r)).collect() };
        let (pressures, _) = pressure_series(readings);
        Self {
            water_level: window.change(&series(|r| r.water_level_m)),
            temperature: window.change(&series(|r| r.temperature_c)),
            pressure: window.change(&pressures),
            battery: window.change(&series(|r| r.battery_v)),
        }
    }
}

/// Readings of every station merged ascending by timestamp.
///
/// The sort is stable, so readings sharing a timestamp keep station order.
pub fn merged_readings<'a, I>(stations: I) -> Vec<&'a Reading>
where
    I: IntoIterator<Item = &'a Station>,
{
    let mut readings: Vec<&Reading> = stations
        .into_iter()
        .flat_map(|s| s.readings().iter())
        .collect();
    readings.sort_by_key(|r| r.timestamp);
    readings
}

/// Pressure values in one unit.
///
/// Values stay in their source unit when all readings share it; mixed units
/// are all converted to hectopascal. The unit is `None` for no readings.
pub fn pressure_series(readings: &[&Reading]) -> (Vec<f64>, Option<PressureUnit>) {
    let Some(first) = readings.first() else {
        return (Vec::new(), None);
    };
    let shared = first.pressure_unit;
    if readings.iter().all(|r| r.pressure_unit == shared) {
        (readings.iter().map(|r| r.pressure).collect(), Some(shared))
    } else {
        (
            readings.iter().map(|r| r.pressure_hpa()).collect(),
            Some(PressureUnit::Hectopascal),
        )
    }
}

/// Mean water level of one UTC calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyLevel {
    pub date: NaiveDate,
    pub average_water_level_m: f64,
    pub readings: usize,
}

/// Every reading bucketed by UTC date and averaged, ascending by date.
///
/// Days with no finite water level are left out.
pub fn daily_water_levels<'a, I>(stations: I) -> Vec<DailyLevel>
where
    I: IntoIterator<Item = &'a Station>,
{
    let mut days: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for reading in stations.into_iter().flat_map(|s| s.readings().iter()) {
        days.entry(reading.timestamp.date_naive())
            .or_insert_with(|| Accumulator::new(AggregateType::Avg))
            .add(reading.water_level_m);
    }

    days.into_iter()
        .filter_map(|(date, acc)| {
            Some(DailyLevel {
                date,
                average_water_level_m: acc.result()?,
                readings: acc.count(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use dwlr_core::Location;

    fn at(hours: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 9, 20, 0, 0, 0).unwrap() + Duration::hours(hours)
    }

    fn reading(hours: i64, level: f64, pressure: f64, unit: PressureUnit) -> Reading {
        Reading {
            timestamp: at(hours),
            water_level_m: level,
            battery_v: 3.8,
            temperature_c: 25.0,
            pressure,
            pressure_unit: unit,
            reported_anomaly: false,
        }
    }

    #[test]
    fn test_split_halves() {
        let window = PeriodWindow::new(5);
        let series: Vec<u32> = (0..12).collect();
        let (previous, recent) = window.split(&series);
        assert_eq!(previous, &[2, 3, 4, 5, 6]);
        assert_eq!(recent, &[7, 8, 9, 10, 11]);

        let short = [1, 2, 3, 4, 5, 6, 7];
        let (previous, recent) = window.split(&short);
        assert_eq!(previous, &[1, 2]);
        assert_eq!(recent, &[3, 4, 5, 6, 7]);

        let (previous, recent) = window.split(&short[..3]);
        assert!(previous.is_empty());
        assert_eq!(recent.len(), 3);
    }

    #[test]
    fn test_change_formula() {
        let window = PeriodWindow::new(2);
        // previous avg 10, recent avg 12
        assert_eq!(window.change(&[10.0, 10.0, 12.0, 12.0]), Some(20.0));
        // Negative previous mean keeps the literal formula
        let change = window.change(&[-5.0, -5.0, -4.0, -4.0]).unwrap();
        assert!((change - -20.0).abs() < 1e-9);
        assert_eq!(window.change(&[0.0, 0.0, 1.0, 1.0]), None);
        assert_eq!(window.change(&[1.0, 2.0]), None);
        assert_eq!(window.change(&[]), None);
    }

    #[test]
    fn test_zero_window_is_one() {
        assert_eq!(PeriodWindow::new(0).size(), 1);
        assert_eq!(PeriodWindow::default().size(), DEFAULT_TREND_WINDOW);
    }

    #[test]
    fn test_merged_readings_are_ascending() {
        let a = Station::new(
            "A",
            Location::default(),
            vec![
                reading(1, -1.0, 10.0, PressureUnit::MetresH2O),
                reading(5, -1.1, 10.0, PressureUnit::MetresH2O),
            ],
        );
        let b = Station::new(
            "B",
            Location::default(),
            vec![reading(3, -9.0, 10.0, PressureUnit::MetresH2O)],
        );
        let merged = merged_readings([&a, &b]);
        let levels: Vec<f64> = merged.iter().map(|r| r.water_level_m).collect();
        assert_eq!(levels, vec![-1.0, -9.0, -1.1]);
    }

    #[test]
    fn test_pressure_series_units() {
        let same = [
            reading(0, 0.0, 10.0, PressureUnit::MetresH2O),
            reading(1, 0.0, 10.2, PressureUnit::MetresH2O),
        ];
        let refs: Vec<&Reading> = same.iter().collect();
        let (values, unit) = pressure_series(&refs);
        assert_eq!(values, vec![10.0, 10.2]);
        assert_eq!(unit, Some(PressureUnit::MetresH2O));

        let mixed = [
            reading(0, 0.0, 10.0, PressureUnit::MetresH2O),
            reading(1, 0.0, 1000.0, PressureUnit::Hectopascal),
        ];
        let refs: Vec<&Reading> = mixed.iter().collect();
        let (values, unit) = pressure_series(&refs);
        assert_eq!(unit, Some(PressureUnit::Hectopascal));
        assert!((values[0] - 980.665).abs() < 1e-9);
        assert_eq!(values[1], 1000.0);

        assert_eq!(pressure_series(&[]), (Vec::new(), None));
    }

    #[test]
    fn test_daily_water_levels() {
        let station = Station::new(
            "A",
            Location::default(),
            vec![
                reading(1, -2.0, 10.0, PressureUnit::MetresH2O),
                reading(3, -4.0, 10.0, PressureUnit::MetresH2O),
                reading(26, -6.0, 10.0, PressureUnit::MetresH2O),
                reading(27, f64::NAN, 10.0, PressureUnit::MetresH2O),
            ],
        );
        let daily = daily_water_levels([&station]);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2025, 9, 20).unwrap());
        assert_eq!(daily[0].average_water_level_m, -3.0);
        assert_eq!(daily[0].readings, 2);
        assert_eq!(daily[1].average_water_level_m, -6.0);
        assert_eq!(daily[1].readings, 1);
    }
}

//! Station collection aggregation

use dwlr_core::{
    mean, percentage, percentages, Accumulator, AggregateType, HealthStatus, PressureUnit, Reading,
    SeverityBand, Trend,
};
use dwlr_status::{ClassifiedStation, DashboardHealthPolicy};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::{merged_readings, pressure_series, PeriodTrends, PeriodWindow, DEFAULT_TREND_WINDOW};

/// Tunables for [`aggregate_with`]
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOptions {
    /// Readings per half of the period-over-period comparison
    pub trend_window: usize,
    /// Low-battery and high-temperature thresholds
    pub dashboard: DashboardHealthPolicy,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            dashboard: DashboardHealthPolicy::default(),
        }
    }
}

/// Count and share of one category
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CategoryCount<K> {
    pub category: K,
    pub count: usize,
    /// Percent of all stations, one decimal; a breakdown's shares sum to 100
    pub percentage: f64,
}

/// Every category of `K` in canonical order, including empty ones
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown<K> {
    pub categories: Vec<CategoryCount<K>>,
}

impl<K: Copy + PartialEq> Breakdown<K> {
    fn tally(all: &[K], values: impl Iterator<Item = K>, total: usize) -> Self {
        let mut counts = vec![0usize; all.len()];
        for value in values {
            if let Some(slot) = all.iter().position(|k| *k == value) {
                counts[slot] += 1;
            }
        }
        let shares = percentages(&counts, total);
        Self {
            categories: all
                .iter()
                .zip(counts)
                .zip(shares)
                .map(|((category, count), percentage)| CategoryCount {
                    category: *category,
                    count,
                    percentage,
                })
                .collect(),
        }
    }

    pub fn count(&self, category: K) -> usize {
        self.get(category).map_or(0, |c| c.count)
    }

    pub fn percentage(&self, category: K) -> f64 {
        self.get(category).map_or(0.0, |c| c.percentage)
    }

    fn get(&self, category: K) -> Option<&CategoryCount<K>> {
        self.categories.iter().find(|c| c.category == category)
    }
}

/// Means of the latest reading of every station
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Averages {
    pub water_level_m: Option<f64>,
    pub temperature_c: Option<f64>,
    pub battery_v: Option<f64>,
    pub pressure: Option<f64>,
    /// Unit of `pressure`; hectopascal when stations report in mixed units
    pub pressure_unit: Option<PressureUnit>,
}

/// Aggregate figures over a station collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub total_stations: usize,
    /// Stations whose health is not offline
    pub active_stations: usize,
    /// Stations in warning or critical health
    pub alert_stations: usize,
    pub low_battery_count: usize,
    pub high_temperature_count: usize,

    pub averages: Averages,
    pub min_water_level_m: Option<f64>,
    pub max_water_level_m: Option<f64>,

    pub severity: Breakdown<SeverityBand>,
    pub health: Breakdown<HealthStatus>,
    pub trend: Breakdown<Trend>,

    /// Share of stations with a healthy battery
    pub data_quality: f64,
    /// Share of stations with a rising level
    pub recharge_potential: f64,
    /// Share of stations in the critical severity band
    pub groundwater_stress: f64,

    pub period_change: PeriodTrends,

    /// Station count per state
    pub state_distribution: BTreeMap<String, usize>,
    /// Mean latest water level per state
    pub state_averages: BTreeMap<String, f64>,
}

impl Statistics {
    /// Statistics of an empty collection
    pub fn empty() -> Self {
        Self {
            total_stations: 0,
            active_stations: 0,
            alert_stations: 0,
            low_battery_count: 0,
            high_temperature_count: 0,
            averages: Averages::default(),
            min_water_level_m: None,
            max_water_level_m: None,
            severity: Breakdown::tally(&SeverityBand::ALL, std::iter::empty(), 0),
            health: Breakdown::tally(&HealthStatus::ALL, std::iter::empty(), 0),
            trend: Breakdown::tally(&Trend::ALL, std::iter::empty(), 0),
            data_quality: 0.0,
            recharge_potential: 0.0,
            groundwater_stress: 0.0,
            period_change: PeriodTrends::default(),
            state_distribution: BTreeMap::new(),
            state_averages: BTreeMap::new(),
        }
    }
}

/// Aggregate with default options
pub fn aggregate(stations: &[ClassifiedStation]) -> Statistics {
    aggregate_with(stations, &AggregateOptions::default())
}

#[instrument(skip_all, fields(stations = stations.len()))]
pub fn aggregate_with(stations: &[ClassifiedStation], options: &AggregateOptions) -> Statistics {
    if stations.is_empty() {
        return Statistics::empty();
    }

    let total = stations.len();
    let latest: Vec<&Reading> = stations.iter().filter_map(ClassifiedStation::latest).collect();
    let policy = &options.dashboard;

    let low_battery_count = latest
        .iter()
        .filter(|r| policy.is_low_battery(r.battery_v))
        .count();
    let high_temperature_count = latest
        .iter()
        .filter(|r| policy.is_high_temperature(r.temperature_c))
        .count();

    let (pressures, pressure_unit) = pressure_series(&latest);
    let averages = Averages {
        water_level_m: mean(latest.iter().map(|r| r.water_level_m)),
        temperature_c: mean(latest.iter().map(|r| r.temperature_c)),
        battery_v: mean(latest.iter().map(|r| r.battery_v)),
        pressure: mean(pressures),
        pressure_unit,
    };

    let levels = || latest.iter().map(|r| r.water_level_m);
    let mut min = Accumulator::new(AggregateType::Min);
    min.extend(levels());
    let mut max = Accumulator::new(AggregateType::Max);
    max.extend(levels());

    let severity = Breakdown::tally(
        &SeverityBand::ALL,
        stations.iter().map(|s| s.status.severity),
        total,
    );
    let health = Breakdown::tally(
        &HealthStatus::ALL,
        stations.iter().map(|s| s.status.health),
        total,
    );
    let trend = Breakdown::tally(&Trend::ALL, stations.iter().map(|s| s.status.trend), total);

    let readings = merged_readings(stations.iter().map(|s| &s.station));
    let period_change = PeriodTrends::from_readings(&readings, PeriodWindow::new(options.trend_window));

    let mut state_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut state_levels: BTreeMap<String, Accumulator> = BTreeMap::new();
    for classified in stations {
        let state = &classified.station.location().state;
        *state_distribution.entry(state.clone()).or_default() += 1;
        let acc = state_levels
            .entry(state.clone())
            .or_insert_with(|| Accumulator::new(AggregateType::Avg));
        if let Some(reading) = classified.latest() {
            acc.add(reading.water_level_m);
        }
    }
    let state_averages = state_levels
        .into_iter()
        .filter_map(|(state, acc)| Some((state, acc.result()?)))
        .collect();

    let statistics = Statistics {
        total_stations: total,
        active_stations: total - health.count(HealthStatus::Offline),
        alert_stations: health.count(HealthStatus::Warning) + health.count(HealthStatus::Critical),
        low_battery_count,
        high_temperature_count,
        averages,
        min_water_level_m: min.result(),
        max_water_level_m: max.result(),
        data_quality: percentage(total - low_battery_count, total),
        recharge_potential: trend.percentage(Trend::Rising),
        groundwater_stress: severity.percentage(SeverityBand::Critical),
        severity,
        health,
        trend,
        period_change,
        state_distribution,
        state_averages,
    };
    debug!(
        active = statistics.active_stations,
        alerts = statistics.alert_stations,
        "Aggregated station statistics"
    );
    statistics
}

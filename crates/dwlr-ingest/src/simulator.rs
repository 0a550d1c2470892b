//! Simulated DWLR network for demos and tests

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use dwlr_core::{RawRecord, TelemetrySource};

use crate::dwlr;

const SITES: &[(&str, &str, &str, f64, f64)] = &[
    ("Maharashtra", "Pune", "Wagholi", 18.5793, 73.9823),
    ("Rajasthan", "Jaipur", "Sanganer", 26.8227, 75.7916),
    ("Karnataka", "Tumakuru", "Kunigal", 13.0230, 77.0290),
    ("Punjab", "Ludhiana", "Raikot", 30.6500, 75.6000),
    ("Tamil Nadu", "Madurai", "Melur", 10.0322, 78.3380),
    ("Uttar Pradesh", "Agra", "Fatehabad", 27.0260, 78.3050),
];

/// Generates DWLR-shaped records for a fixed set of stations.
///
/// Values are derived from station and reading indices only, so the same
/// anchor time always yields the same batch.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    stations: usize,
    readings_per_station: usize,
    interval: Duration,
}

impl SimulatedSource {
    pub fn new(stations: usize, readings_per_station: usize) -> Self {
        Self {
            stations,
            readings_per_station,
            interval: Duration::minutes(15),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Records for every station, the newest of each stamped at `anchor`
    pub fn generate(&self, anchor: DateTime<Utc>) -> Vec<RawRecord> {
        let mut records = Vec::with_capacity(self.stations * self.readings_per_station);
        for s in 0..self.stations {
            let (state, district, village, lat, lon) = SITES[s % SITES.len()];
            // Spread the base levels over every severity band
            let base_level = 1.5 - (s as f64 * 3.7) % 18.0;
            let battery = 2.9 + (s % 10) as f64 * 0.13;
            let temperature = 18.0 + (s % 7) as f64 * 3.1;

            for r in 0..self.readings_per_station {
                let age = (self.readings_per_station - 1 - r) as i32;
                let timestamp = anchor - self.interval * age;
                let phase = (s as f64) + r as f64 * 0.6;
                let level = base_level + phase.sin() * 0.25;
                let pressure = 10.1 + (phase * 0.5).cos() * 0.08;

                records.push(
                    RawRecord::new()
                        .with("S.No", (records.len() + 1) as i64)
                        .with(dwlr::UID, format!("DWLR-SIM-{:03}", s + 1))
                        .with(dwlr::STATE, state)
                        .with(dwlr::DISTRICT, district)
                        .with(dwlr::VILLAGE, village)
                        .with(dwlr::LATITUDE, lat + s as f64 * 0.01)
                        .with(dwlr::LONGITUDE, lon + s as f64 * 0.01)
                        .with(
                            dwlr::DATE_TIME,
                            timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                        )
                        .with(dwlr::BATTERY, round2(battery - r as f64 * 0.001))
                        .with(dwlr::WATER_TEMPERATURE, round2(temperature + phase.cos() * 0.4))
                        .with(dwlr::WATER_LEVEL, round2(level))
                        .with(dwlr::PRESSURE, round2(pressure))
                        .with(dwlr::ANOMALY, "Normal"),
                );
            }
        }
        records
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait::async_trait]
impl TelemetrySource for SimulatedSource {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch(&self) -> Result<Vec<RawRecord>> {
        Ok(self.generate(Utc::now()))
    }
}

//! Aggregation helpers shared by the dashboard statistics

use serde::{Deserialize, Serialize};

/// Aggregation type for rollups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateType {
    Min,
    Max,
    Avg,
}

/// Accumulator for calculating aggregates over multiple observations.
///
/// Non-finite values are ignored so that a single corrupt reading can never
/// turn a dashboard figure into NaN.
#[derive(Debug, Clone)]
pub struct Accumulator {
    observations: Vec<f64>,
    aggregate_type: AggregateType,
}

impl Accumulator {
    pub fn new(aggregate_type: AggregateType) -> Self {
        Self {
            observations: Vec::new(),
            aggregate_type,
        }
    }

    pub fn add(&mut self, value: f64) {
        if value.is_finite() {
            self.observations.push(value);
        }
    }

    pub fn extend<I: IntoIterator<Item = f64>>(&mut self, values: I) {
        for value in values {
            self.add(value);
        }
    }

    pub fn result(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }

        Some(match self.aggregate_type {
            AggregateType::Min => self
                .observations
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
            AggregateType::Max => self
                .observations
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
            AggregateType::Avg => {
                let sum: f64 = self.observations.iter().sum();
                sum / self.observations.len() as f64
            }
        })
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }
}

/// Aggregate a series of values in one go
pub fn aggregate_values<I: IntoIterator<Item = f64>>(
    aggregate_type: AggregateType,
    values: I,
) -> Option<f64> {
    let mut acc = Accumulator::new(aggregate_type);
    acc.extend(values);
    acc.result()
}

/// Arithmetic mean of the finite values, `None` when there are none
pub fn mean<I: IntoIterator<Item = f64>>(values: I) -> Option<f64> {
    aggregate_values(AggregateType::Avg, values)
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / total * 100` rounded to one decimal; zero when `total` is zero
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(part as f64 / total as f64 * 100.0, 1)
}

/// Shares of `total` for every count, in percent with one decimal.
///
/// Tenths are allocated by largest remainder, so when the counts add up to
/// `total` the shares add up to exactly 100.0. Ties go to the earlier count.
pub fn percentages(counts: &[usize], total: usize) -> Vec<f64> {
    if total == 0 {
        return vec![0.0; counts.len()];
    }
    let total = total as u64;
    let scaled: Vec<u64> = counts.iter().map(|&c| c as u64 * 1000).collect();
    let mut tenths: Vec<u64> = scaled.iter().map(|s| s / total).collect();

    let sum: u64 = counts.iter().map(|&c| c as u64).sum();
    let target = (sum * 1000 + total / 2) / total;
    let allocated: u64 = tenths.iter().sum();

    let mut order: Vec<usize> = (0..counts.len()).collect();
    // Stable sort keeps earlier categories first among equal remainders
    order.sort_by(|&a, &b| (scaled[b] % total).cmp(&(scaled[a] % total)));
    for &slot in order
        .iter()
        .take(target.saturating_sub(allocated) as usize)
    {
        tenths[slot] += 1;
    }

    tenths.into_iter().map(|t| t as f64 / 10.0).collect()
}

/// Relative change between two averages in percent.
///
/// `None` when the previous average is zero or either value is not finite.
pub fn relative_change(previous_avg: f64, recent_avg: f64) -> Option<f64> {
    if previous_avg == 0.0 || !previous_avg.is_finite() || !recent_avg.is_finite() {
        return None;
    }
    Some((recent_avg - previous_avg) / previous_avg * 100.0)
}

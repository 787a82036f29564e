use std::path::Path;

use hmc_core::{AttributeStore, HmcError};
use indexmap::IndexMap;

use crate::sampler::{StepObserver, StepOutcome};

/// Column order of the per-step statistics.
pub const STAT_KEYS: [&str; 8] = [
    "accepted",
    "trials",
    "velocities_refreshed",
    "acceptance_probability",
    "delta_energy",
    "kinetic_energy",
    "potential_energy",
    "total_energy",
];

fn stat_values(outcome: &StepOutcome) -> [f64; 8] {
    [
        if outcome.accepted { 1.0 } else { 0.0 },
        outcome.trials as f64,
        if outcome.velocities_refreshed { 1.0 } else { 0.0 },
        outcome.acceptance_probability,
        outcome.delta_energy(),
        outcome.kinetic_energy,
        outcome.potential_energy,
        outcome.total_energy(),
    ]
}

/// Records per-step sampler statistics with running means.
#[derive(Debug, Clone)]
pub struct StatisticsAccumulator {
    steps: Vec<usize>,
    columns: IndexMap<&'static str, Vec<f64>>,
    means: IndexMap<&'static str, f64>,
    period: usize,
}

impl Default for StatisticsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatisticsAccumulator {
    /// Creates an accumulator recording every step.
    pub fn new() -> Self {
        Self::with_period(1)
    }

    /// Creates an accumulator recording every `period`-th step (minimum 1).
    pub fn with_period(period: usize) -> Self {
        Self {
            steps: Vec::new(),
            columns: STAT_KEYS.iter().map(|&key| (key, Vec::new())).collect(),
            means: STAT_KEYS.iter().map(|&key| (key, 0.0)).collect(),
            period: period.max(1),
        }
    }

    /// Adds one outcome regardless of the period.
    pub fn add_sample(&mut self, step: usize, outcome: &StepOutcome) {
        self.steps.push(step);
        let n = self.steps.len() as f64;
        for (key, value) in STAT_KEYS.iter().zip(stat_values(outcome)) {
            if let Some(column) = self.columns.get_mut(key) {
                column.push(value);
            }
            if let Some(mean) = self.means.get_mut(key) {
                *mean += (value - *mean) / n;
            }
        }
    }

    /// Number of recorded samples.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step indexes of the recorded samples.
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Recorded values of one statistic.
    pub fn samples(&self, key: &str) -> Option<&[f64]> {
        self.columns.get(key).map(Vec::as_slice)
    }

    /// Running mean of every statistic, in column order.
    pub fn mean_stats(&self) -> &IndexMap<&'static str, f64> {
        &self.means
    }

    /// Most recent value of every statistic.
    pub fn current(&self) -> IndexMap<&'static str, f64> {
        self.columns
            .iter()
            .filter_map(|(&key, column)| column.last().map(|&value| (key, value)))
            .collect()
    }

    /// Forgets every sample.
    pub fn clear(&mut self) {
        self.steps.clear();
        for column in self.columns.values_mut() {
            column.clear();
        }
        for mean in self.means.values_mut() {
            *mean = 0.0;
        }
    }

    /// Writes the recorded statistics to a CSV file.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), HmcError> {
        let path = path.as_ref();
        let mut writer =
            csv::Writer::from_path(path).map_err(|err| HmcError::serde_at("stats-write", err, path))?;
        writer
            .write_record(std::iter::once("step").chain(STAT_KEYS))
            .map_err(|err| HmcError::serde_at("stats-write", err, path))?;
        for (row, step) in self.steps.iter().enumerate() {
            let record = std::iter::once(step.to_string()).chain(
                self.columns
                    .values()
                    .map(|column| format!("{:.6}", column[row])),
            );
            writer
                .write_record(record)
                .map_err(|err| HmcError::serde_at("stats-write", err, path))?;
        }
        writer
            .flush()
            .map_err(|err| HmcError::serde_at("stats-write", err, path))
    }
}

impl StepObserver for StatisticsAccumulator {
    fn update(
        &mut self,
        step: usize,
        _store: &dyn AttributeStore,
        outcome: &StepOutcome,
    ) -> Result<(), HmcError> {
        if step % self.period == 0 {
            self.add_sample(step, outcome);
        }
        Ok(())
    }
}

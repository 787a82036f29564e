use serde::{Deserialize, Serialize};

/// Summary statistics of one sampled variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name.
    pub name: String,
    /// Number of samples.
    pub samples: usize,
    /// Sample mean.
    pub mean: f64,
    /// Unbiased sample variance.
    pub variance: f64,
    /// Lag-1 autocorrelation.
    pub lag1_autocorrelation: f64,
    /// Crude effective sample size `n (1 − ρ₁) / (1 + ρ₁)`, clamped to `[1, n]`.
    pub effective_sample_size: f64,
}

/// Summary of every column of a trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TraceSummary {
    /// Per-column summaries in trace order.
    pub columns: Vec<ColumnSummary>,
}

impl TraceSummary {
    /// Summarises row-major samples with the given column names.
    pub fn from_rows(names: &[String], rows: &[Vec<f64>]) -> Self {
        let columns = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let values: Vec<f64> = rows.iter().filter_map(|row| row.get(index).copied()).collect();
                summarize_column(name, &values)
            })
            .collect();
        Self { columns }
    }

    /// Looks up a column summary by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSummary> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Summarises one series of samples.
pub fn summarize_column(name: &str, values: &[f64]) -> ColumnSummary {
    let n = values.len();
    let mean = mean(values);
    let variance = variance(values, mean);
    let rho = lag1_autocorrelation(values, mean);
    let effective_sample_size = if n == 0 {
        0.0
    } else {
        let ess = n as f64 * (1.0 - rho) / (1.0 + rho);
        if ess.is_finite() {
            ess.clamp(1.0, n as f64)
        } else {
            n as f64
        }
    };
    ColumnSummary {
        name: name.to_string(),
        samples: n,
        mean,
        variance,
        lag1_autocorrelation: rho,
        effective_sample_size,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

fn lag1_autocorrelation(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let denom: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    if denom <= 0.0 {
        return 0.0;
    }
    let numer: f64 = values
        .windows(2)
        .map(|pair| (pair[0] - mean) * (pair[1] - mean))
        .sum();
    numer / denom
}

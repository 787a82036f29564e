use std::path::Path;

use csv::ReaderBuilder;
use hmc_core::errors::ErrorInfo;
use hmc_core::{AttributeStore, HmcError};

use crate::accessor::ValueGradientInterface;
use crate::sampler::{StepObserver, StepOutcome};

/// Records the values of a binding after Monte Carlo steps.
#[derive(Debug, Clone)]
pub struct TraceRecorder {
    interface: ValueGradientInterface,
    names: Vec<String>,
    steps: Vec<usize>,
    values: Vec<Vec<f64>>,
    period: usize,
}

impl TraceRecorder {
    /// Records every step with column names taken from `store`.
    pub fn new(interface: ValueGradientInterface, store: &dyn AttributeStore) -> Self {
        let names = interface.names(store);
        Self::with_names(interface, names)
    }

    /// Records every step with caller-provided column names.
    pub fn with_names(interface: ValueGradientInterface, names: Vec<String>) -> Self {
        Self {
            interface,
            names,
            steps: Vec::new(),
            values: Vec::new(),
            period: 1,
        }
    }

    /// Records only every `period`-th step (minimum 1).
    pub fn set_period(&mut self, period: usize) {
        self.period = period.max(1);
    }

    /// The recorded binding.
    pub fn interface(&self) -> &ValueGradientInterface {
        &self.interface
    }

    /// Column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Step indexes of the recorded rows.
    pub fn steps(&self) -> &[usize] {
        &self.steps
    }

    /// Recorded rows, one per sample.
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// Recorded values of column `index`.
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.values
            .iter()
            .filter_map(|row| row.get(index).copied())
            .collect()
    }

    /// Reads the binding now and appends a row.
    pub fn record(&mut self, step: usize, store: &dyn AttributeStore) -> Result<(), HmcError> {
        let row = self.interface.get_values(store)?;
        self.steps.push(step);
        self.values.push(row);
        Ok(())
    }

    /// Forgets every row.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.values.clear();
    }

    /// Writes the trace to a CSV file with a `step` column followed by the names.
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), HmcError> {
        let path = path.as_ref();
        let mut writer =
            csv::Writer::from_path(path).map_err(|err| HmcError::serde_at("trace-write", err, path))?;
        let header = std::iter::once("step").chain(self.names.iter().map(String::as_str));
        writer
            .write_record(header)
            .map_err(|err| HmcError::serde_at("trace-write", err, path))?;
        for (step, row) in self.steps.iter().zip(&self.values) {
            let record = std::iter::once(step.to_string())
                .chain(row.iter().map(|value| format!("{value:e}")));
            writer
                .write_record(record)
                .map_err(|err| HmcError::serde_at("trace-write", err, path))?;
        }
        writer
            .flush()
            .map_err(|err| HmcError::serde_at("trace-write", err, path))
    }
}

impl StepObserver for TraceRecorder {
    fn update(
        &mut self,
        step: usize,
        store: &dyn AttributeStore,
        _outcome: &StepOutcome,
    ) -> Result<(), HmcError> {
        if step % self.period == 0 {
            self.record(step, store)?;
        }
        Ok(())
    }
}

/// Trace loaded back from a CSV file written by [`TraceRecorder::write_csv`].
#[derive(Debug, Clone, PartialEq)]
pub struct TraceTable {
    /// Column names (without the step column).
    pub names: Vec<String>,
    /// Step of every row.
    pub steps: Vec<usize>,
    /// Row values.
    pub rows: Vec<Vec<f64>>,
}

impl TraceTable {
    /// Parses a trace CSV file.
    pub fn load(path: &Path) -> Result<Self, HmcError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|err| HmcError::serde_at("trace-read", err, path))?;
        let header = reader
            .headers()
            .map_err(|err| HmcError::serde_at("trace-read", err, path))?
            .clone();
        if header.is_empty() {
            return Err(HmcError::serde_at("trace-empty", "trace file is empty", path));
        }
        let names: Vec<String> = header.iter().skip(1).map(str::to_string).collect();
        let mut steps = Vec::new();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| HmcError::serde_at("trace-read", err, path))?;
            let line = record.position().map_or(0, |pos| pos.line() as usize);
            let mut cells = record.iter();
            let step = cells
                .next()
                .and_then(|cell| cell.trim().parse::<usize>().ok())
                .ok_or_else(|| parse_error(path, line))?;
            let row = cells
                .map(|cell| cell.trim().parse::<f64>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| parse_error(path, line))?;
            if row.len() != names.len() {
                return Err(parse_error(path, line));
            }
            steps.push(step);
            rows.push(row);
        }
        Ok(Self { names, steps, rows })
    }
}

fn parse_error(path: &Path, line: usize) -> HmcError {
    HmcError::Serde(
        ErrorInfo::new("trace-parse", "malformed trace row")
            .with_context("path", path.display().to_string())
            .with_context("line", line.to_string()),
    )
}

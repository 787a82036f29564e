use std::fs;

use hmc_core::{AttributeStore, FloatKey, HmcError, MemoryStore};
use tempfile::tempdir;

use hmc_sampler::stats::STAT_KEYS;
use hmc_sampler::{
    OptimizedVariables, StatisticsAccumulator, StepObserver, StepOutcome, TraceRecorder,
    TraceSummary, TraceTable,
};

fn outcome(accepted: bool, energy_old: f64, energy_new: f64) -> StepOutcome {
    StepOutcome {
        accepted,
        trials: 1,
        velocities_refreshed: true,
        energy_old,
        energy_new,
        acceptance_probability: if accepted { 1.0 } else { 0.25 },
        kinetic_energy: 0.5,
        potential_energy: if accepted { energy_new - 0.5 } else { energy_old - 0.5 },
    }
}

#[test]
fn trace_csv_round_trips_through_the_loader() {
    let mut store = MemoryStore::new();
    let p = store.add_point("atom", [0.25, -1.5, 3.0], 1.0);
    let n = store.add_nuisance("sigma", 0.125, 1.0);
    let binding = OptimizedVariables::new(&store).unwrap().into_interface();
    let mut trace = TraceRecorder::new(binding, &store);
    assert_eq!(trace.names(), &["atom_x", "atom_y", "atom_z", "sigma_nuisance"]);

    trace.record(0, &store).unwrap();
    store.set_value(FloatKey::X, p, 1e-7).unwrap();
    store.set_value(FloatKey::NUISANCE, n, -2.0).unwrap();
    trace.record(1, &store).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    trace.write_csv(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents.lines().next(),
        Some("step,atom_x,atom_y,atom_z,sigma_nuisance")
    );

    let table = TraceTable::load(&path).unwrap();
    assert_eq!(table.names, trace.names());
    assert_eq!(table.steps, vec![0, 1]);
    assert_eq!(table.rows, trace.values());
    assert_eq!(trace.column(3), vec![0.125, -2.0]);
}

#[test]
fn names_with_separators_and_quotes_survive_the_round_trip() {
    let mut store = MemoryStore::new();
    store.add_nuisance("sigma,1", 0.5, 1.0);
    store.add_nuisance("say \"hi\"", -0.25, 1.0);
    let binding = OptimizedVariables::new(&store).unwrap().into_interface();
    let mut trace = TraceRecorder::new(binding, &store);
    trace.record(0, &store).unwrap();
    trace.record(1, &store).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    trace.write_csv(&path).unwrap();

    let table = TraceTable::load(&path).unwrap();
    assert_eq!(table.names, vec!["sigma,1_nuisance", "say \"hi\"_nuisance"]);
    assert_eq!(table.steps, vec![0, 1]);
    assert_eq!(table.rows, vec![vec![0.5, -0.25], vec![0.5, -0.25]]);
}

#[test]
fn trace_loader_reports_malformed_rows() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "step,a,b\n0,1.0,2.0\n1,1.0\n").unwrap();
    let err = TraceTable::load(&path).unwrap_err();
    assert!(matches!(err, HmcError::Serde(_)));
    assert_eq!(err.info().code, "trace-parse");
    assert_eq!(err.info().context.get("line").map(String::as_str), Some("3"));

    let empty = dir.path().join("empty.csv");
    fs::write(&empty, "").unwrap();
    assert_eq!(TraceTable::load(&empty).unwrap_err().info().code, "trace-empty");
}

#[test]
fn trace_observer_honours_period() {
    let mut store = MemoryStore::new();
    store.add_nuisance("sigma", 1.0, 1.0);
    let binding = OptimizedVariables::new(&store).unwrap().into_interface();
    let mut trace = TraceRecorder::new(binding, &store);
    trace.set_period(3);
    for step in 0..7 {
        trace.update(step, &store, &outcome(true, 0.0, 0.0)).unwrap();
    }
    assert_eq!(trace.steps(), &[0, 3, 6]);
    trace.clear();
    assert!(trace.values().is_empty());
}

#[test]
fn statistics_track_running_means() {
    let mut stats = StatisticsAccumulator::new();
    stats.add_sample(0, &outcome(true, 1.0, 0.0));
    stats.add_sample(1, &outcome(false, 1.0, 3.0));

    assert_eq!(stats.len(), 2);
    let means = stats.mean_stats();
    assert_eq!(means.keys().copied().collect::<Vec<_>>(), STAT_KEYS.to_vec());
    assert!((means["accepted"] - 0.5).abs() < 1e-12);
    assert!((means["acceptance_probability"] - 0.625).abs() < 1e-12);
    assert!((means["delta_energy"] - 0.5).abs() < 1e-12);
    assert!((means["total_energy"] - 0.5).abs() < 1e-12);
    assert_eq!(stats.samples("delta_energy"), Some(&[-1.0, 2.0][..]));
    assert_eq!(stats.current()["accepted"], 0.0);

    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.csv");
    stats.write_csv(&path).unwrap();
    let contents = fs::read_to_string(&path).unwrap();
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some(format!("step,{}", STAT_KEYS.join(",")).as_str()));
    assert_eq!(lines.count(), 2);

    stats.clear();
    assert!(stats.is_empty());
    assert_eq!(stats.mean_stats()["accepted"], 0.0);
}

#[test]
fn trace_summary_reports_moments() {
    let names = vec!["a".to_string(), "b".to_string()];
    let rows = vec![vec![1.0, 5.0], vec![2.0, 5.0], vec![3.0, 5.0], vec![4.0, 5.0]];
    let summary = TraceSummary::from_rows(&names, &rows);

    let a = summary.column("a").unwrap();
    assert_eq!(a.samples, 4);
    assert!((a.mean - 2.5).abs() < 1e-12);
    assert!((a.variance - 5.0 / 3.0).abs() < 1e-12);
    assert!(a.lag1_autocorrelation > 0.0);
    assert!(a.effective_sample_size >= 1.0 && a.effective_sample_size <= 4.0);

    let b = summary.column("b").unwrap();
    assert_eq!(b.variance, 0.0);
    assert_eq!(b.lag1_autocorrelation, 0.0);
    assert_eq!(b.effective_sample_size, 4.0);
    assert!(summary.column("c").is_none());
}

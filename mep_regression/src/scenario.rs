//! Hyperparameter scenarios: fully independent searches fanned out across
//! scoped threads and merged after each run completes. No state is shared
//! between runs; each scenario gets its own seed and its own `Population`.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use fastrand::Rng;
use linear_expressions::{latex_formula, string_formula};
use num_traits::Float;

use crate::dataset::Dataset;
use crate::loss_functions::LossObject;
use crate::options::Options;
use crate::population::{Population, PopulationError};

/// Inclusive sampling bounds for each evolutionary knob.
#[derive(Clone, Debug)]
pub struct ScenarioRanges {
    pub population_size: (usize, usize),
    pub operations_size: (usize, usize),
    pub operands_size: (usize, usize),
    pub epochs: (usize, usize),
    pub crossover_rate: (f64, f64),
    pub mutation_rate: (f64, f64),
    pub kill_rate: (f64, f64),
}

impl Default for ScenarioRanges {
    fn default() -> Self {
        Self {
            population_size: (100, 500),
            operations_size: (10, 100),
            operands_size: (30, 50),
            epochs: (400, 1000),
            crossover_rate: (0.2, 0.8),
            mutation_rate: (0.01, 0.3),
            kill_rate: (0.01, 0.3),
        }
    }
}

pub fn sample_options(ranges: &ScenarioRanges, rng: &mut Rng) -> Options {
    let uniform = |rng: &mut Rng, (lo, hi): (f64, f64)| lo + rng.f64() * (hi - lo);
    Options {
        population_size: rng.usize(ranges.population_size.0..=ranges.population_size.1),
        operations_size: rng.usize(ranges.operations_size.0..=ranges.operations_size.1),
        operands_size: rng.usize(ranges.operands_size.0..=ranges.operands_size.1),
        epochs: rng.usize(ranges.epochs.0..=ranges.epochs.1),
        crossover_rate: uniform(rng, ranges.crossover_rate),
        mutation_rate: uniform(rng, ranges.mutation_rate),
        kill_rate: uniform(rng, ranges.kill_rate),
    }
}

/// Outcome of one independent search.
#[derive(Clone, Debug)]
pub struct ScenarioReport<T: Float> {
    pub options: Options,
    pub seed: u64,
    pub train_score: T,
    pub test_score: T,
    pub formula: String,
    pub latex: String,
    pub elapsed: Duration,
}

/// Run a single search with the given options and score the winner on the
/// held-out rows.
pub fn run_scenario<T: Float>(
    train: &Dataset<T>,
    test: &Dataset<T>,
    metric: &LossObject<T>,
    options: Options,
    seed: u64,
) -> Result<ScenarioReport<T>, PopulationError> {
    let start = Instant::now();

    let mut population = Population::new(
        options.clone(),
        train.parameters.clone(),
        metric.clone(),
        train.rows.clone(),
        train.targets.clone(),
        Rng::with_seed(seed),
    )?;
    population.run_epochs();

    let best = population.best_program();
    let mut scratch = Vec::new();
    let mut predicted = Vec::with_capacity(test.len());
    for row in &test.rows {
        predicted.push(best.evaluate_with(row, &mut scratch)?);
    }
    let test_score = metric.loss(&test.targets, &predicted);

    Ok(ScenarioReport {
        seed,
        train_score: population.best_score(),
        test_score,
        formula: string_formula(best),
        latex: latex_formula(best),
        elapsed: start.elapsed(),
        options,
    })
}

/// Sample `count` option sets and run each as an independent scenario.
///
/// Scenarios are dispatched in waves of up to one thread per core and joined
/// before the next wave starts; results come back in dispatch order.
pub fn run_scenarios<T: Float + Send + Sync>(
    train: &Dataset<T>,
    test: &Dataset<T>,
    metric: &LossObject<T>,
    ranges: &ScenarioRanges,
    count: usize,
    base_seed: u64,
) -> Vec<Result<ScenarioReport<T>, PopulationError>> {
    let mut planner = Rng::with_seed(base_seed);
    let plans: Vec<(Options, u64)> = (0..count)
        .map(|i| {
            (
                sample_options(ranges, &mut planner),
                base_seed.wrapping_add(i as u64 + 1),
            )
        })
        .collect();

    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);

    let mut reports = Vec::with_capacity(count);
    for wave in plans.chunks(workers) {
        let mut finished = thread::scope(|scope| {
            let handles: Vec<_> = wave
                .iter()
                .cloned()
                .map(|(options, seed)| {
                    let metric = metric.clone();
                    scope.spawn(move || run_scenario(train, test, &metric, options, seed))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("scenario worker panicked"))
                .collect::<Vec<_>>()
        });
        reports.append(&mut finished);
    }
    reports
}

/// Write one CSV row per report, formulas quoted.
pub fn write_reports_csv<T: Float + Display>(
    path: &Path,
    reports: &[ScenarioReport<T>],
) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(
        out,
        "population_size,operations_size,operands_size,epochs,crossover_rate,mutation_rate,kill_rate,seed,train_score,test_score,elapsed_secs,latex"
    )?;
    for report in reports {
        let o = &report.options;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{:.2},{}",
            o.population_size,
            o.operations_size,
            o.operands_size,
            o.epochs,
            o.crossover_rate,
            o.mutation_rate,
            o.kill_rate,
            report.seed,
            report.train_score,
            report.test_score,
            report.elapsed.as_secs_f64(),
            quote(&report.latex),
        )?;
    }
    out.flush()
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

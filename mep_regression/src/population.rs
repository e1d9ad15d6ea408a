use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;

use fastrand::Rng;
use linear_expressions::{Program, ProgramError};
use num_traits::Float;

use crate::loss_functions::{LossFn, LossObject};
use crate::options::Options;
use crate::progress::TaskBar;
use crate::random::usize_range_excl;

pub const MIN_POPULATION: usize = 10;
pub const MIN_OPERATIONS: usize = 2;
pub const MIN_OPERANDS: usize = linear_expressions::MIN_OPERANDS;

#[derive(Clone, Debug)]
pub enum PopulationError {
    PopulationTooSmall { got: usize },
    NoParameters,
    TooFewOperations { got: usize },
    TooFewOperands { got: usize },
    NoEpochs,
    CrossoverRateNotPositive { got: f64 },
    NegativeMutationRate { got: f64 },
    NegativeKillRate { got: f64 },
    TrainingLengthMismatch { inputs: usize, outputs: usize },
    EmptyTrainingSet,
    Program(ProgramError),
}

impl fmt::Display for PopulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopulationError::PopulationTooSmall { got } => {
                write!(f, "population size must be at least {MIN_POPULATION}, got {got}")
            }
            PopulationError::NoParameters => write!(f, "parameter list must be non-empty"),
            PopulationError::TooFewOperations { got } => {
                write!(f, "need at least {MIN_OPERATIONS} operations per tape, got {got}")
            }
            PopulationError::TooFewOperands { got } => {
                write!(f, "need at least {MIN_OPERANDS} operand slots, got {got}")
            }
            PopulationError::NoEpochs => write!(f, "epoch count must be at least 1"),
            PopulationError::CrossoverRateNotPositive { got } => {
                write!(f, "crossover rate must be > 0, got {got}")
            }
            PopulationError::NegativeMutationRate { got } => {
                write!(f, "mutation rate must be >= 0, got {got}")
            }
            PopulationError::NegativeKillRate { got } => {
                write!(f, "kill rate must be >= 0, got {got}")
            }
            PopulationError::TrainingLengthMismatch { inputs, outputs } => write!(
                f,
                "training inputs ({inputs}) and outputs ({outputs}) differ in length"
            ),
            PopulationError::EmptyTrainingSet => write!(f, "training set must be non-empty"),
            PopulationError::Program(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PopulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PopulationError::Program(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ProgramError> for PopulationError {
    fn from(e: ProgramError) -> Self {
        PopulationError::Program(e)
    }
}

/// The evolving set of candidate tapes with a parallel cache of fitness
/// scores (lower is better).
///
/// A score is recomputed only when its tape changes (crossover replacement,
/// mutation, kill), so `scores[i]` always reflects `programs[i]` against the
/// full training set. All validation happens in [`Population::new`]; the
/// epoch loop itself cannot fail.
pub struct Population<T: Float> {
    pub(crate) programs: Vec<Program>,
    pub(crate) scores: Vec<T>,
    pub(crate) options: Options,
    parameters: Vec<String>,
    pub(crate) crossovers: usize,
    pub(crate) mutations: usize,
    pub(crate) kills: usize,
    metric: LossObject<T>,
    inputs: Vec<HashMap<String, T>>,
    outputs: Vec<T>,
    rng: Rng,
    scratch: Vec<T>,
    predicted: Vec<T>,
}

impl<T: Float> Population<T> {
    pub fn new(
        options: Options,
        parameters: Vec<String>,
        metric: LossObject<T>,
        inputs: Vec<HashMap<String, T>>,
        outputs: Vec<T>,
        mut rng: Rng,
    ) -> Result<Self, PopulationError> {
        if options.population_size < MIN_POPULATION {
            return Err(PopulationError::PopulationTooSmall {
                got: options.population_size,
            });
        }
        if parameters.is_empty() {
            return Err(PopulationError::NoParameters);
        }
        if options.operations_size < MIN_OPERATIONS {
            return Err(PopulationError::TooFewOperations {
                got: options.operations_size,
            });
        }
        if options.operands_size < MIN_OPERANDS {
            return Err(PopulationError::TooFewOperands {
                got: options.operands_size,
            });
        }
        if options.epochs < 1 {
            return Err(PopulationError::NoEpochs);
        }
        if options.crossover_rate <= 0.0 {
            return Err(PopulationError::CrossoverRateNotPositive {
                got: options.crossover_rate,
            });
        }
        if options.mutation_rate < 0.0 {
            return Err(PopulationError::NegativeMutationRate {
                got: options.mutation_rate,
            });
        }
        if options.kill_rate < 0.0 {
            return Err(PopulationError::NegativeKillRate {
                got: options.kill_rate,
            });
        }
        if inputs.len() != outputs.len() {
            return Err(PopulationError::TrainingLengthMismatch {
                inputs: inputs.len(),
                outputs: outputs.len(),
            });
        }
        if inputs.is_empty() {
            return Err(PopulationError::EmptyTrainingSet);
        }

        let bar = TaskBar::new("Initialize programs", options.population_size);
        let mut programs = Vec::with_capacity(options.population_size);
        for _ in 0..options.population_size {
            programs.push(Program::random(
                &parameters,
                options.operations_size,
                options.operands_size,
                &mut rng,
            )?);
            bar.inc();
        }
        bar.finish();

        let mut population = Self {
            scores: vec![T::zero(); programs.len()],
            programs,
            crossovers: options.crossovers_per_epoch(),
            mutations: options.mutations_per_epoch(),
            kills: options.kills_per_epoch(),
            options,
            parameters,
            metric,
            inputs,
            outputs,
            rng,
            scratch: Vec::new(),
            predicted: Vec::new(),
        };

        let bar = TaskBar::new("Initialize scores", population.len());
        for idx in 0..population.len() {
            population.scores[idx] = compute_score(
                &population.programs[idx],
                &population.inputs,
                &population.outputs,
                population.metric.as_ref(),
                &mut population.scratch,
                &mut population.predicted,
            )?;
            bar.inc();
        }
        bar.finish();

        Ok(population)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    pub fn scores(&self) -> &[T] {
        &self.scores
    }

    /// Restartable forward iteration over the current programs.
    pub fn iter(&self) -> std::slice::Iter<'_, Program> {
        self.programs.iter()
    }

    /// First index achieving the minimum cached score. Ties resolve to the
    /// lowest index; incomparable (NaN) scores order last.
    pub fn best_index(&self) -> usize {
        let mut best = 0;
        for (idx, score) in self.scores.iter().enumerate().skip(1) {
            if matches!(score.partial_cmp(&self.scores[best]), Some(Ordering::Less)) {
                best = idx;
            }
        }
        best
    }

    pub fn best_score(&self) -> T {
        self.scores[self.best_index()]
    }

    pub fn best_program(&self) -> &Program {
        &self.programs[self.best_index()]
    }

    pub fn mean_score(&self) -> T {
        let n = T::from(self.scores.len()).unwrap();
        self.scores.iter().fold(T::zero(), |acc, &s| acc + s) / n
    }

    /// All cached scores identical: no improving direction is
    /// distinguishable any more.
    pub fn converged(&self) -> bool {
        self.scores.windows(2).all(|pair| pair[0] == pair[1])
    }

    fn worst_index(&self) -> usize {
        let mut worst = 0;
        for (idx, score) in self.scores.iter().enumerate().skip(1) {
            if matches!(
                score.partial_cmp(&self.scores[worst]),
                Some(Ordering::Greater)
            ) {
                worst = idx;
            }
        }
        worst
    }

    pub(crate) fn rescore(&mut self, idx: usize) {
        self.scores[idx] = compute_score(
            &self.programs[idx],
            &self.inputs,
            &self.outputs,
            self.metric.as_ref(),
            &mut self.scratch,
            &mut self.predicted,
        )
        .expect("training rows were validated at construction");
    }

    /// Splice a child from two distinct parents and score it.
    ///
    /// The child deep-copies parent A, then takes a prefix of parent B whose
    /// length is drawn uniformly from `[0, operations_size]`.
    fn create_child(&mut self) -> (Program, T) {
        let a = self.rng.usize(0..self.programs.len());
        let b = usize_range_excl(&mut self.rng, 0..self.programs.len(), a);
        let mut child = self.programs[a].clone();
        let splice = self.rng.usize(0..=self.options.operations_size);
        child.splice_prefix(&self.programs[b], splice);
        let score = compute_score(
            &child,
            &self.inputs,
            &self.outputs,
            self.metric.as_ref(),
            &mut self.scratch,
            &mut self.predicted,
        )
        .expect("training rows were validated at construction");
        (child, score)
    }

    /// One crossover attempt: the child replaces the first worst-scoring
    /// individual only when strictly better than the current population
    /// maximum; otherwise it is discarded.
    pub(crate) fn crossover_one(&mut self) {
        let (child, score) = self.create_child();
        let worst = self.worst_index();
        if matches!(
            score.partial_cmp(&self.scores[worst]),
            Some(Ordering::Less)
        ) {
            self.programs[worst] = child;
            self.scores[worst] = score;
        }
    }

    /// The epoch's crossover budget, abandoned early once every cached score
    /// is identical.
    pub(crate) fn crossover_many(&mut self) {
        for _ in 0..self.crossovers {
            if self.converged() {
                break;
            }
            self.crossover_one();
        }
    }

    /// Mutate one uniformly drawn individual and rescore it. The current
    /// best individual is immune.
    pub(crate) fn mutate_one(&mut self) {
        let idx = self.rng.usize(0..self.programs.len());
        if idx == self.best_index() {
            return;
        }
        self.programs[idx].mutate(&mut self.rng);
        self.rescore(idx);
    }

    pub(crate) fn mutate_many(&mut self) {
        for _ in 0..self.mutations {
            self.mutate_one();
        }
    }

    /// Replace one uniformly drawn individual with a fresh random tape and
    /// rescore it. The current best individual is immune.
    pub(crate) fn kill_one(&mut self) {
        let idx = self.rng.usize(0..self.programs.len());
        if idx == self.best_index() {
            return;
        }
        self.programs[idx] = Program::random(
            &self.parameters,
            self.options.operations_size,
            self.options.operands_size,
            &mut self.rng,
        )
        .expect("tape shape was validated at construction");
        self.rescore(idx);
    }

    pub(crate) fn kill_many(&mut self) {
        for _ in 0..self.kills {
            self.kill_one();
        }
    }

    /// Drive the search for up to the configured number of epochs. Each
    /// generation runs crossover, then mutation, then kill/replace, and the
    /// loop stops early once every score is identical or the best score hits
    /// an exact zero.
    pub fn run_epochs(&mut self) {
        let bar = TaskBar::new("Epochs", self.options.epochs);
        for _ in 0..self.options.epochs {
            self.crossover_many();
            self.mutate_many();
            self.kill_many();
            bar.inc();

            if self.converged() {
                break;
            }
            if self.best_score() == T::zero() {
                break;
            }
        }
        bar.finish();
    }
}

impl<'a, T: Float> IntoIterator for &'a Population<T> {
    type Item = &'a Program;
    type IntoIter = std::slice::Iter<'a, Program>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Map a tape over every training row and reduce through the metric.
fn compute_score<T: Float>(
    program: &Program,
    inputs: &[HashMap<String, T>],
    outputs: &[T],
    metric: &dyn LossFn<T>,
    scratch: &mut Vec<T>,
    predicted: &mut Vec<T>,
) -> Result<T, ProgramError> {
    predicted.clear();
    for row in inputs {
        predicted.push(program.evaluate_with(row, scratch)?);
    }
    Ok(metric.loss(outputs, predicted))
}

use fastrand::Rng;
use linear_expressions::{Instruction, Operator, Program};

use super::{assert_cache_coherent, make_population, small_options, sum_params, sum_rows};
use crate::loss_functions::mae;
use crate::population::Population;

/// A tape whose final row computes `a + b` exactly.
fn perfect_sum() -> Program {
    let add = |slots: [usize; 4]| Instruction::Operation {
        operator: Operator::Add,
        operands: slots.to_vec(),
    };
    Program::from_parts(
        sum_params(),
        vec![
            Instruction::Terminal { param: 0 },
            Instruction::Terminal { param: 1 },
            add([0, 1, 0, 0]),
            add([0, 1, 1, 0]),
            add([0, 1, 0, 1]),
            add([0, 1, 1, 1]),
            add([0, 1, 0, 0]),
        ],
        4,
    )
    .unwrap()
}

#[test]
fn an_exact_zero_score_stops_the_loop() {
    let mut options = small_options();
    options.epochs = 1_000_000;
    let (rows, targets) = sum_rows(20);
    let mut population = Population::new(
        options,
        sum_params(),
        mae::<f64>(),
        rows,
        targets,
        Rng::with_seed(20),
    )
    .unwrap();

    population.programs[4] = perfect_sum();
    population.rescore(4);
    assert_eq!(population.scores[4], 0.0);

    // With an exact-zero individual protected by elitism, the loop must
    // terminate after its first generation rather than exhausting the epoch
    // budget.
    population.run_epochs();
    assert_eq!(population.best_score(), 0.0);
    assert_cache_coherent(&population);
}

#[test]
fn the_epoch_budget_bounds_the_loop() {
    let mut population = make_population(21);
    let initial_best = population.best_score();
    population.run_epochs();
    assert!(population.best_score() <= initial_best);
    assert_cache_coherent(&population);
}

#[test]
fn convergence_is_all_scores_identical() {
    let mut population = make_population(22);
    assert!(!population.converged() || population.scores.windows(2).all(|w| w[0] == w[1]));

    for score in population.scores.iter_mut() {
        *score = 0.25;
    }
    assert!(population.converged());

    population.scores[5] = 0.75;
    assert!(!population.converged());
}

#[test]
fn nan_scores_block_convergence() {
    let mut population = make_population(23);
    for score in population.scores.iter_mut() {
        *score = f64::NAN;
    }
    assert!(!population.converged());
}

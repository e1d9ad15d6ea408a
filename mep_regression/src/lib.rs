pub mod dataset;
pub mod loss_functions;
pub mod options;
pub mod population;
pub(crate) mod progress;
pub(crate) mod random;
pub mod scenario;

#[cfg(feature = "cli")]
pub mod cli;

pub use crate::dataset::Dataset;
pub use crate::loss_functions::{
    huber, mae, make_loss, mse, rmse, LossFn, LossKind, LossObject,
};
pub use crate::options::Options;
pub use crate::population::{Population, PopulationError};
pub use crate::scenario::{
    run_scenario, run_scenarios, sample_options, write_reports_csv, ScenarioRanges,
    ScenarioReport,
};

// Re-export the tape crate surface so callers don't need to depend on it
// directly.
pub use linear_expressions::{
    format_tape, latex_formula, string_formula, Instruction, Operator, Program, ProgramError,
};

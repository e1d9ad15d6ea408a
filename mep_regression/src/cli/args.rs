use std::path::PathBuf;

use clap::{Args, Parser};

use crate::options::Options;

#[derive(Parser, Debug, Clone)]
#[command(name = "mep")]
#[command(about = "Evolutionary symbolic regression over linear instruction tapes")]
pub struct Cli {
    /// Input dataset path (.csv with a header row).
    pub data: PathBuf,

    /// Target column (defaults to the last column).
    #[arg(long)]
    pub target: Option<String>,

    /// Fraction of rows held out for test scoring.
    #[arg(long, default_value_t = 0.33)]
    pub test_fraction: f64,

    /// Error metric: mae, mse, rmse, or huber.
    #[arg(long, default_value = "mae")]
    pub loss: String,

    /// Base seed for the split and the search rngs.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Number of independent random-hyperparameter scenarios. Zero runs a
    /// single search with the configured options instead.
    #[arg(long, default_value_t = 0)]
    pub scenarios: usize,

    /// Output path for the scenario report CSV.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Also print the winning formula as LaTeX.
    #[arg(long)]
    pub latex: bool,

    #[command(flatten)]
    pub options: OptionsArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OptionsArgs {
    #[arg(long)]
    pub population_size: Option<usize>,

    #[arg(long)]
    pub operations_size: Option<usize>,

    #[arg(long)]
    pub operands_size: Option<usize>,

    #[arg(long)]
    pub epochs: Option<usize>,

    #[arg(long)]
    pub crossover_rate: Option<f64>,

    #[arg(long)]
    pub mutation_rate: Option<f64>,

    #[arg(long)]
    pub kill_rate: Option<f64>,
}

impl OptionsArgs {
    pub fn apply_to(&self, options: &mut Options) {
        if let Some(v) = self.population_size {
            options.population_size = v;
        }
        if let Some(v) = self.operations_size {
            options.operations_size = v;
        }
        if let Some(v) = self.operands_size {
            options.operands_size = v;
        }
        if let Some(v) = self.epochs {
            options.epochs = v;
        }
        if let Some(v) = self.crossover_rate {
            options.crossover_rate = v;
        }
        if let Some(v) = self.mutation_rate {
            options.mutation_rate = v;
        }
        if let Some(v) = self.kill_rate {
            options.kill_rate = v;
        }
    }
}

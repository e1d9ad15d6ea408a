pub mod args;

use anyhow::{bail, Context};
use clap::Parser;
use fastrand::Rng;

use crate::cli::args::Cli;
use crate::dataset::Dataset;
use crate::loss_functions::{make_loss, LossKind};
use crate::options::Options;
use crate::scenario::{run_scenario, run_scenarios, write_reports_csv, ScenarioRanges};

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let Some(kind) = LossKind::parse(&cli.loss) else {
        bail!("unknown loss {:?} (expected mae, mse, rmse, or huber)", cli.loss);
    };
    let metric = make_loss::<f64>(kind);

    let dataset = Dataset::from_csv(&cli.data, cli.target.as_deref())?;
    if dataset.is_empty() {
        bail!("dataset {} has no rows", cli.data.display());
    }

    let mut rng = Rng::with_seed(cli.seed);
    let (train, test) = dataset.train_test_split(cli.test_fraction, &mut rng);

    if cli.scenarios == 0 {
        let mut options = Options::default();
        cli.options.apply_to(&mut options);

        let report = run_scenario(&train, &test, &metric, options, cli.seed)
            .context("search failed")?;
        println!("train score: {}", report.train_score);
        println!("test score:  {}", report.test_score);
        println!("elapsed:     {:.2}s", report.elapsed.as_secs_f64());
        println!("formula:     {}", report.formula);
        if cli.latex {
            println!("latex:       {}", report.latex);
        }
        return Ok(());
    }

    let ranges = ScenarioRanges::default();
    let results = run_scenarios(&train, &test, &metric, &ranges, cli.scenarios, cli.seed);

    let mut reports = Vec::with_capacity(results.len());
    println!(
        "{:<5} {:<6} {:<5} {:<5} {:<7} {:<14} {:<14} {}",
        "run", "pop", "ops", "opr", "epochs", "train", "test", "time"
    );
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(report) => {
                let o = &report.options;
                println!(
                    "{:<5} {:<6} {:<5} {:<5} {:<7} {:<14.6} {:<14.6} {:.2}s",
                    i,
                    o.population_size,
                    o.operations_size,
                    o.operands_size,
                    o.epochs,
                    report.train_score,
                    report.test_score,
                    report.elapsed.as_secs_f64()
                );
                reports.push(report);
            }
            Err(e) => eprintln!("scenario {i} failed: {e}"),
        }
    }

    if let Some(path) = &cli.output {
        write_reports_csv(path, &reports)
            .with_context(|| format!("failed to write report CSV {}", path.display()))?;
        println!("wrote {} reports to {}", reports.len(), path.display());
    }

    Ok(())
}

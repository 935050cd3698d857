//! CLI command handling
//!
//! Dispatches CLI commands and formats output.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use tokio_util::sync::CancellationToken;

use crate::commands::{Commands, ShowFormat};
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::scenario::{builtin, loader, Scenario};
use crate::session::{ChromeDriver, Driver, SimulatedDriver};
use crate::testing::{self, RunOptions, RunReport, Runner, SuiteReport};

/// Dispatch a CLI command
pub async fn dispatch(command: Commands, config: Config) -> Result<()> {
    match command {
        Commands::Run {
            scenarios,
            jobs,
            simulate,
            output_dir,
            report,
        } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.artifacts.dir = dir;
            }
            let jobs = jobs.unwrap_or(config.run.jobs);
            if jobs == 0 {
                return Err(Error::Config("--jobs must be at least 1".to_string()));
            }

            let scenarios = loader::resolve(&scenarios)?;
            run(scenarios, &config, jobs, simulate, report.as_deref()).await
        }

        Commands::List => {
            println!("{}", "Built-in scenarios:".cyan());
            for scenario in builtin::all() {
                println!(
                    "  {} {}",
                    scenario.title().white().bold(),
                    format!("({} steps)", scenario.steps().len()).dimmed()
                );
                println!("    file: {}", scenario.id().file_stem().dimmed());
                if let Some(desc) = scenario.description() {
                    println!("    {}", desc.dimmed());
                }
            }
            Ok(())
        }

        Commands::Show { scenario, format } => {
            let scenario = find_one(&scenario)?;
            match format {
                ShowFormat::Text => print_scenario(&scenario),
                ShowFormat::Yaml => print!("{}", serde_yaml::to_string(&scenario)?),
                ShowFormat::Json => println!("{}", serde_json::to_string_pretty(&scenario)?),
            }
            Ok(())
        }

        Commands::Validate { paths } => validate(&paths),

        Commands::New { name, dir } => {
            let path = loader::scaffold(&name, &dir, &config.run.base_url)?;
            println!("{} Created {}", "✓".green(), path.display());
            Ok(())
        }
    }
}

async fn run(
    scenarios: Vec<Scenario>,
    config: &Config,
    jobs: usize,
    simulate: bool,
    report_path: Option<&Path>,
) -> Result<()> {
    let driver: Arc<dyn Driver> = if simulate {
        Arc::new(SimulatedDriver::new(config.run.base_url.clone()))
    } else {
        Arc::new(ChromeDriver::new(config.clone()))
    };

    let cancel = CancellationToken::new();
    let runner =
        Runner::new(driver, RunOptions::from_config(config)).with_cancellation(cancel.clone());

    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling running scenarios");
            cancel.cancel();
        }
    });

    println!(
        "{} {} scenario(s) with {} driver",
        "Running".blue().bold(),
        scenarios.len(),
        runner.driver_name()
    );

    let suite = testing::run_suite_with(&runner, &scenarios, jobs, print_result).await;
    interrupt.abort();

    print_summary(&suite);

    if let Some(path) = report_path {
        suite.write_json(path)?;
        println!("Report written to {}", path.display().to_string().dimmed());
    }

    if suite.all_passed() {
        Ok(())
    } else {
        Err(Error::ScenariosFailed {
            failed: suite.total() - suite.passed(),
            total: suite.total(),
        })
    }
}

fn print_result(report: &RunReport) {
    let duration = format!("({} ms)", report.duration_ms);
    match &report.failure {
        None => {
            println!("  {} {} {}", "✓".green(), report.scenario, duration.dimmed());
            for shot in &report.screenshots {
                println!("      {}", shot.display().to_string().dimmed());
            }
        }
        Some(failure) => {
            println!("  {} {} {}", "✗".red(), report.scenario.bold(), duration.dimmed());
            println!("      {} {}", format!("[{}]", failure.code).red(), failure.message);
            if let Some(shot) = &failure.screenshot {
                println!("      page at failure: {}", shot.display().to_string().dimmed());
            }
        }
    }
}

fn print_summary(suite: &SuiteReport) {
    println!("\n{}", "Summary:".cyan());
    println!("  Run:     {}", suite.run_id.to_string().dimmed());
    println!("  Total:   {}", suite.total());
    println!("  Passed:  {}", suite.passed().to_string().green());
    let failed = suite.total() - suite.passed();
    if failed > 0 {
        println!("  Failed:  {}", failed.to_string().red());
    } else {
        println!("  Failed:  0");
    }
    println!("  Success rate: {:.1}%", suite.success_rate());

    if suite.all_passed() {
        println!("\n{} {}", "✓".green().bold(), "All scenarios passed".green().bold());
    } else {
        println!("\n{} {}", "✗".red().bold(), "Some scenarios failed".red().bold());
    }
}

/// Resolve a target that must name exactly one scenario
fn find_one(target: &str) -> Result<Scenario> {
    let path = Path::new(target);
    if path.is_file() {
        return loader::load_file(path);
    }
    builtin::find(target).ok_or_else(|| Error::ScenarioNotFound(target.to_string()))
}

fn print_scenario(scenario: &Scenario) {
    println!("{} {}", "Scenario:".blue().bold(), scenario.title().white().bold());
    if let Some(desc) = scenario.description() {
        println!("  {}", desc.dimmed());
    }
    if let Some(uuid) = scenario.id().uuid {
        println!("  id: {}", uuid.to_string().dimmed());
    }

    println!("\n{}", "Steps:".cyan());
    for (i, step) in scenario.steps().iter().enumerate() {
        println!("  {:>2}. {}", i + 1, step);
    }
}

fn validate(paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(loader::scenario_files(path)?);
        } else {
            files.push(path.clone());
        }
    }

    let mut failed = 0;
    for file in &files {
        match loader::load_file(file) {
            Ok(scenario) => println!(
                "  {} {} {}",
                "✓".green(),
                file.display(),
                format!("({}, {} steps)", scenario.title(), scenario.steps().len()).dimmed()
            ),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {}", "✗".red(), file.display(), e);
            }
        }
    }

    if failed > 0 {
        return Err(Error::ScenariosFailed {
            failed,
            total: files.len(),
        });
    }
    println!("{} {} scenario file(s) valid", "✓".green().bold(), files.len());
    Ok(())
}

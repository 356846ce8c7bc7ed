mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use joltage_lang::{CompiledMachine, Compiler};
use joltage_solver::{Arithmetic, IntegerSolution, SolveError, SolverConfig, Strategy};
use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "joltage")]
#[command(about = "Minimal button presses for machine joltage and light puzzles", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// TOML file with [solver] and [logging] tables
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter, e.g. `info` or `joltage_solver=debug`
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Log format (pretty, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve the joltage counters of every machine and print the total
    Solve {
        /// The machine file
        file: PathBuf,
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
        /// Use exact rational arithmetic
        #[arg(long)]
        exact: bool,
        /// Wall-clock limit per machine
        #[arg(long)]
        time_limit_ms: Option<u64>,
        /// Relaxation limit per machine
        #[arg(long)]
        node_limit: Option<usize>,
        /// Worker threads (defaults to the number of CPUs)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Output format (json, pretty)
        #[arg(short, long, default_value = "pretty")]
        format: String,
    },
    /// Sum the fewest presses that match every light diagram
    Lights {
        /// The machine file
        file: PathBuf,
        #[arg(long, default_value_t = usize::MAX)]
        max_presses: usize,
    },
    /// Check a machine file for errors
    Check {
        /// The file to check
        file: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    Auto,
    BranchAndBound,
    Enumerate,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => Strategy::Auto,
            StrategyArg::BranchAndBound => Strategy::BranchAndBound,
            StrategyArg::Enumerate => Strategy::Enumerate,
        }
    }
}

#[derive(Serialize)]
struct MachineReport {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    solution: Option<IntegerSolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct Report {
    machines: Vec<MachineReport>,
    total: Option<i64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    config.logging.init();

    match cli.command {
        Commands::Solve {
            file,
            strategy,
            exact,
            time_limit_ms,
            node_limit,
            threads,
            format,
        } => {
            let mut solver = config.solver.clone();
            if let Some(strategy) = strategy {
                solver = solver.with_strategy(strategy.into());
            }
            if exact {
                solver = solver.with_arithmetic(Arithmetic::Exact);
            }
            if time_limit_ms.is_some() {
                solver.time_limit_ms = time_limit_ms;
            }
            if node_limit.is_some() {
                solver = solver.with_node_limit(node_limit);
            }
            let threads = threads.or(config.threads).unwrap_or_else(num_cpus::get);
            run_solve(&file, &solver, threads, &format)
        }
        Commands::Lights { file, max_presses } => run_lights(&file, max_presses),
        Commands::Check { file } => run_check(&file),
    }
}

fn load_machines(file: &Path, compiler: &Compiler) -> anyhow::Result<Vec<CompiledMachine>> {
    let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let program = joltage_lang::Parser::parse(&source).with_context(|| format!("parsing {}", file.display()))?;
    let machines = compiler
        .compile_program(&program)
        .with_context(|| format!("compiling {}", file.display()))?;
    Ok(machines)
}

/// Solves every machine on a dedicated rayon pool; results keep input order.
fn solve_all(
    machines: &[CompiledMachine],
    config: &SolverConfig,
    threads: usize,
) -> anyhow::Result<Vec<Result<IntegerSolution, SolveError>>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .context("building solver thread pool")?;

    Ok(pool.install(|| {
        machines
            .par_iter()
            .map(|machine| joltage_solver::solve(&machine.problem, config))
            .collect()
    }))
}

fn run_solve(file: &Path, config: &SolverConfig, threads: usize, format: &str) -> anyhow::Result<()> {
    let machines = load_machines(file, &Compiler::new())?;
    info!(machines = machines.len(), threads, "solving");

    let results = solve_all(&machines, config, threads)?;

    let reports: Vec<MachineReport> = machines
        .iter()
        .zip(results)
        .map(|(machine, result)| match result {
            Ok(solution) => MachineReport {
                index: machine.index,
                solution: Some(solution),
                error: None,
            },
            Err(err) => MachineReport {
                index: machine.index,
                solution: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    let total = (failed == 0).then(|| {
        reports
            .iter()
            .filter_map(|r| r.solution.as_ref())
            .map(|s| s.objective)
            .sum::<i64>()
    });
    let report = Report { machines: reports, total };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for machine in &report.machines {
            match (&machine.solution, &machine.error) {
                (Some(solution), _) => println!(
                    "Machine {:4}: {:6} presses  ({:?}, {} relaxations)",
                    machine.index + 1,
                    solution.objective,
                    solution.method,
                    solution.stats.relaxations
                ),
                (None, Some(err)) => println!("Machine {:4}: FAILED  {}", machine.index + 1, err),
                (None, None) => {}
            }
        }
        println!();
        match report.total {
            Some(total) => println!("Total: {}", total),
            None => println!("Total: unavailable"),
        }
    }

    if failed > 0 {
        bail!("{} of {} machines could not be solved", failed, report.machines.len());
    }
    Ok(())
}

fn run_lights(file: &Path, max_presses: usize) -> anyhow::Result<()> {
    let machines = load_machines(file, &Compiler::new().with_required_lights(true))?;

    let mut total = 0;
    for machine in &machines {
        let puzzle = machine.lights_puzzle()?;
        let presses = puzzle
            .min_presses(max_presses)
            .ok_or_else(|| anyhow!("machine {}: light pattern unreachable", machine.index + 1))?;
        println!("Machine {:4}: {:6} presses", machine.index + 1, presses);
        total += presses;
    }
    println!();
    println!("Total: {}", total);
    Ok(())
}

fn run_check(file: &Path) -> anyhow::Result<()> {
    let machines = match load_machines(file, &Compiler::new()) {
        Ok(machines) => machines,
        Err(e) => {
            eprintln!("✗ {} has errors:", file.display());
            return Err(e);
        }
    };

    let buttons: usize = machines.iter().map(|m| m.problem.num_variables()).sum();
    let counters: usize = machines.iter().map(|m| m.problem.num_constraints()).sum();
    let with_lights = machines.iter().filter(|m| m.lights.is_some()).count();

    println!("✓ {} is valid", file.display());
    println!("  {} machines", machines.len());
    println!("  {} with light diagrams", with_lights);
    println!("  {} buttons", buttons);
    println!("  {} counters", counters);
    Ok(())
}

mod logging;

use clap::{Parser, Subcommand, ValueEnum};
use spotmix_core::{ModelVariant, ProblemDefinition, SolveDriver};
use spotmix_solver::ConstraintOp;
use std::path::{Path, PathBuf};
use tracing::info;

use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "spotmix")]
#[command(about = "Media-budget allocation: solve, then analyse the optimal vertex", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    /// Log format (pretty, json)
    #[arg(long, global = true, default_value = "pretty")]
    log_format: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an instance and print the full analysis
    Solve {
        /// JSON instance file; the reference instance is used when omitted
        instance: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// The bounded re-solve gets the optimal iteration count divided by this
        #[arg(long, default_value_t = 2)]
        divisor: usize,
        /// Weight of the bounded point in the interpolated point
        #[arg(long, default_value_t = spotmix_core::DEFAULT_LAMBDA)]
        lambda: f64,
    },
    /// Check an instance file for errors
    Check {
        /// The file to check
        instance: PathBuf,
    },
    /// List the variables and rows of the built model
    Model {
        /// JSON instance file; the reference instance is used when omitted
        instance: Option<PathBuf>,
        /// Build the auxiliary (penalty) variant
        #[arg(short, long)]
        auxiliary: bool,
    },
    /// Print the reference instance as JSON, to use as a starting point
    Template,
}

fn main() {
    let cli = Cli::parse();

    LoggingConfig {
        level: cli.log_level,
        format: cli.log_format,
    }
    .init();

    match cli.command {
        Commands::Solve {
            instance,
            format,
            divisor,
            lambda,
        } => {
            let problem = load_instance(instance.as_deref());

            let result = match SolveDriver::new()
                .with_iteration_divisor(divisor)
                .with_lambda(lambda)
                .solve(&problem)
            {
                Ok(r) => r,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };

            match format {
                OutputFormat::Text => print!("{}", spotmix_core::render_text(&result)),
                OutputFormat::Json => match serde_json::to_string_pretty(&result.rounded()) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        std::process::exit(1);
                    }
                },
            }
        }
        Commands::Check { instance } => {
            let problem = load_instance(Some(instance.as_path()));

            println!("✓ {} is valid", instance.display());
            println!("  {} outlets", problem.outlets());
            println!("  {} slots per outlet", problem.slots());
            println!("  total budget {}", problem.total_budget());
            println!("  minimum spend per slot {}", problem.slot_spend_floor());
            println!("  minimum coverage {}", problem.min_coverage);
        }
        Commands::Model { instance, auxiliary } => {
            let problem = load_instance(instance.as_deref());
            let variant = if auxiliary {
                ModelVariant::Auxiliary
            } else {
                ModelVariant::Primal
            };

            let built = match spotmix_core::build(&problem, variant) {
                Ok(b) => b,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            };
            let lp = built.model.problem();

            println!("Variables ({}):", lp.num_variables());
            for var in &lp.variables {
                println!("  {:10} [{}, {}]", var.name, var.lower, var.upper);
            }
            println!();

            let objective: Vec<String> = lp
                .objective
                .coefficients
                .iter()
                .zip(&lp.variables)
                .filter(|(c, _)| **c != 0.0)
                .map(|(c, v)| format!("{} {}", c, v.name))
                .collect();
            println!("Objective: minimize {}", objective.join(" + "));
            println!();

            println!("Constraints ({}):", lp.num_constraints());
            for constraint in &lp.constraints {
                let terms: Vec<String> = constraint
                    .terms
                    .iter()
                    .map(|(var, c)| format!("{} {}", c, lp.variables[var.index()].name))
                    .collect();
                let op = match constraint.op {
                    ConstraintOp::Le => "<=",
                    ConstraintOp::Ge => ">=",
                    ConstraintOp::Eq => "=",
                };
                println!("  {}: {} {} {}", constraint.name, terms.join(" + "), op, constraint.rhs);
            }
        }
        Commands::Template => match serde_json::to_string_pretty(&ProblemDefinition::reference()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}

/// Read and validate an instance file, or fall back to the reference instance
fn load_instance(path: Option<&Path>) -> ProblemDefinition {
    let Some(path) = path else {
        info!("no instance file given, using the reference instance");
        return ProblemDefinition::reference();
    };

    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            std::process::exit(1);
        }
    };

    let problem = match parse_instance(&source) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid instance {}: {}", path.display(), e);
            std::process::exit(1);
        }
    };
    info!(path = %path.display(), outlets = problem.outlets(), slots = problem.slots(), "instance loaded");
    problem
}

fn parse_instance(source: &str) -> Result<ProblemDefinition, String> {
    let problem: ProblemDefinition = serde_json::from_str(source).map_err(|e| e.to_string())?;
    problem.validate().map_err(|e| e.to_string())?;
    Ok(problem)
}

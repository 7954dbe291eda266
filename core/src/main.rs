use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;
use stylus_scan::detectors::default_detectors;
use stylus_scan::output::{print_json, print_results, print_summary};
use stylus_scan::scan::{calculate_statistics, scan_path, ScanOptions};
use stylus_scan::Detector;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "stylus-scan")]
#[command(version)]
#[command(about = "Security scanner for Stylus smart contracts", long_about = None)]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a Stylus contract file or directory
    Scan {
        /// Path to the contract file or directory to scan
        path: PathBuf,

        /// Show issue descriptions and code snippets
        #[arg(short, long)]
        verbose: bool,

        /// Print results as JSON
        #[arg(long)]
        json: bool,

        /// Run only the named detector (repeatable)
        #[arg(short, long = "detector", value_name = "NAME")]
        detectors: Vec<String>,

        /// Only scan the top level of a directory
        #[arg(long)]
        no_recursive: bool,
    },
    /// List available detectors
    Detectors,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn select_detectors(names: &[String]) -> Result<Vec<Box<dyn Detector>>> {
    let available = default_detectors();
    if names.is_empty() {
        return Ok(available);
    }
    if let Some(unknown) = names
        .iter()
        .find(|name| !available.iter().any(|d| d.name() == name.as_str()))
    {
        let known: Vec<&str> = available.iter().map(|d| d.name()).collect();
        bail!("unknown detector '{}' (available: {})", unknown, known.join(", "));
    }
    Ok(available
        .into_iter()
        .filter(|d| names.iter().any(|name| name == d.name()))
        .collect())
}

fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Detectors => {
            for detector in default_detectors() {
                println!("{:<20} {}", detector.name().bold(), detector.description());
            }
            Ok(false)
        }
        Commands::Scan {
            path,
            verbose,
            json,
            detectors,
            no_recursive,
        } => {
            let detectors = select_detectors(&detectors)?;
            let options = ScanOptions {
                recursive: !no_recursive,
            };
            let reports = scan_path(&path, &detectors, &options)
                .with_context(|| format!("failed to scan '{}'", path.display()))?;
            let stats = calculate_statistics(&reports);

            if json {
                print_json(&reports, &stats).context("failed to serialize results")?;
            } else {
                if reports.is_empty() {
                    eprintln!(
                        "{} No Rust files found in '{}'",
                        "Warning:".yellow().bold(),
                        path.display()
                    );
                }
                for report in &reports {
                    print_results(report, verbose);
                }
                print_summary(&stats);
            }
            Ok(stats.total_issues() > 0)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(found_issues) => {
            if found_issues {
                process::exit(1);
            }
        }
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            process::exit(2);
        }
    }
}

//! POI Topology - generate and inspect proximity relations between
//! point-of-interest datasets.
//!
//! Usage:
//!   poi-topology generate --data-root datav2
//!   poi-topology generate --data-dir datav2/cleaned --output out/topology.nt --strategy grid
//!   poi-topology generate --rules rules.json --report out/report.json
//!   poi-topology inspect datav2/data_hanoi_topology.ttl

use clap::{Parser, Subcommand};
use poi_topology::config::{JoinStrategy, RuleTable, TopologyConfig};
use poi_topology::querying::TopologyInspector;
use poi_topology::storage::{write_topology, TurtleDirectory};
use poi_topology::topology::{log_config_issues, TopologyJoin};
use poi_topology::TopologyError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "poi-topology")]
#[command(about = "Spatial topology generator for point-of-interest datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Join category datasets and write the proximity relations
    Generate {
        /// Data root; datasets are read from <root>/cleaned when present
        #[arg(long, default_value = "datav2")]
        data_root: PathBuf,

        /// Dataset directory, overriding the one derived from --data-root
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output file (.ttl or .nt)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Dataset file name prefix
        #[arg(long, default_value = "data_hanoi_")]
        file_prefix: String,

        /// Rule table as JSON; the built-in table when omitted
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Join strategy: exhaustive or grid
        #[arg(long, default_value = "exhaustive")]
        strategy: String,

        /// Also write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Summarize an existing topology file
    Inspect {
        /// Topology file to read
        input: PathBuf,

        /// Category pairs to list per tier predicate
        #[arg(long, default_value = "5")]
        top: usize,
    },
}

fn generate(
    config: TopologyConfig,
    rules: Option<PathBuf>,
    report_path: Option<PathBuf>,
    interrupt: Arc<AtomicBool>,
) -> poi_topology::Result<()> {
    let (table, issues) = match rules {
        Some(path) => RuleTable::from_json_file(path)?,
        None => RuleTable::builtin(),
    };
    log_config_issues(&issues);

    println!("Spatial Topology Generator");
    println!("==========================\n");
    println!("Configuration:");
    println!("  Data directory: {}", config.data_dir.display());
    println!("  Output file:    {}", config.output_file.display());
    println!("  Rules:          {}", table.len());
    println!("  Strategy:       {}", config.strategy);
    println!();

    let output = config.output_file.clone();
    let strategy = config.strategy;
    let outcome = TopologyJoin::new(table, TurtleDirectory::new(config))?
        .with_strategy(strategy)
        .with_config_issues(issues)
        .with_interrupt(interrupt)
        .run()?;

    write_topology(&output, &outcome.relations)?;
    if let Some(path) = report_path {
        let json = outcome.report.to_json().map_err(|e| TopologyError::Serialization(e.to_string()))?;
        std::fs::write(&path, json).map_err(|e| TopologyError::io(&path, e))?;
    }

    println!("{}", outcome.report);
    println!("Output saved to: {}", output.display());
    Ok(())
}

fn inspect(input: PathBuf, top: usize) -> poi_topology::Result<()> {
    let inspector = TopologyInspector::open(&input)?;
    println!("{}", inspector.inspect(top)?);
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let interrupt = Arc::new(AtomicBool::new(false));
    let interrupt_clone = Arc::clone(&interrupt);
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, stopping...");
        interrupt_clone.store(true, Ordering::Relaxed);
    }) {
        error!("cannot install Ctrl+C handler: {}", e);
    }

    let result = match cli.command {
        Commands::Generate {
            data_root,
            data_dir,
            output,
            file_prefix,
            rules,
            strategy,
            report,
        } => {
            let strategy = match strategy.parse::<JoinStrategy>() {
                Ok(s) => s,
                Err(msg) => {
                    eprintln!("Error: {}", msg);
                    return ExitCode::from(2);
                }
            };
            let mut config = TopologyConfig::from_data_root(&data_root);
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            config.output_file =
                output.unwrap_or_else(|| data_root.join(format!("{}topology.ttl", file_prefix)));
            config.file_prefix = file_prefix;
            config.strategy = strategy;
            generate(config, rules, report, interrupt)
        }
        Commands::Inspect { input, top } => inspect(input, top),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(TopologyError::Interrupted) => {
            eprintln!("Topology generation interrupted by user; nothing was written");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("Error during topology generation: {}", e);
            ExitCode::FAILURE
        }
    }
}

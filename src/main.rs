//! Entry point for the h5convert application.
//! Handles CLI parsing, logging setup, and dispatches the convert and list commands.

use clap::Parser;
use h5convert::cli::{Args, Command, ConvertArgs, ListArgs};
use h5convert::container::{has_container_extension, Hdf5Container};
use h5convert::errors::Result;
use h5convert::inventory::{list_datasets, print_inventory};
use h5convert::orchestrator::{ConversionJob, Orchestrator};
use h5convert::parallel::{get_parallel_info, ParallelConfig};
use h5convert::status::ConsoleSink;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn warn_unusual_extensions(inputs: &[std::path::PathBuf]) {
    for input in inputs {
        if !has_container_extension(input) {
            warn!(input = %input.display(), "no HDF5 extension, trying anyway");
        }
    }
}

fn run_convert(args: ConvertArgs, parallel: ParallelConfig) -> Result<bool> {
    warn_unusual_extensions(&args.input);

    let jobs: Vec<ConversionJob> = args
        .input
        .iter()
        .map(|input| {
            ConversionJob::new(input, args.search.as_str(), args.format.as_str(), args.digits)
        })
        .collect();

    let sink = ConsoleSink::new();
    let orchestrator = Orchestrator::new(&sink).with_parallel(parallel);
    let report = orchestrator.run_batch(&jobs)?;

    if report.is_success() {
        println!("✅ Wrote {} file(s)", report.files_written());
    } else {
        println!(
            "⚠ Wrote {} file(s), {} error(s) reported",
            report.files_written(),
            report.error_count()
        );
    }
    Ok(report.is_success())
}

fn run_list(args: ListArgs) -> Result<bool> {
    warn_unusual_extensions(&args.input);

    let mut all_ok = true;
    for input in &args.input {
        let listing = Hdf5Container::open(input)
            .and_then(|container| list_datasets(&container, &args.search));
        match listing {
            Ok(entries) => print_inventory(&input.display().to_string(), &entries),
            Err(e) => {
                eprintln!("❌ {}: {}", input.display(), e);
                all_ok = false;
            }
        }
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose);

    println!(
        r#"
------------------------------------------------------------------
                 _    ____                                _
                | |__| ___|  ___ ___  _ ____   _____ _ __| |_
                | '_ \___ \ / __/ _ \| '_ \ \ / / _ \ '__| __|
                | | | |__) | (_| (_) | | | \ V /  __/ |  | |_
                |_| |_|____/ \___\___/|_| |_|\_/ \___|_|   \__|
                    HDF5 to image converter
------------------------------------------------------------------
                        "#
    );

    let parallel = args
        .threads
        .map_or_else(ParallelConfig::all_cores, ParallelConfig::with_threads);
    if args.verbose {
        get_parallel_info().print_info();
    }

    let result = match args.command {
        Command::Convert(convert) => run_convert(convert, parallel),
        Command::List(list) => run_list(list),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

//! ArgMatches → run arguments.

use std::path::PathBuf;

use ccsim_core::Algorithm;
use ccsim_engine::SimulationOptions;
use clap::ArgMatches;
use tracing::level_filters::LevelFilter;

use crate::format::OutputMode;

/// Everything one invocation needs.
#[derive(Debug)]
pub struct RunArgs {
    pub trace: PathBuf,
    pub options: SimulationOptions,
    pub output: OutputMode,
    pub log_level: LevelFilter,
}

/// Convert clap ArgMatches into run arguments.
pub fn matches_to_run(matches: &ArgMatches) -> Result<RunArgs, String> {
    let trace = matches
        .get_one::<String>("trace")
        .map(PathBuf::from)
        .ok_or_else(|| "No trace file provided".to_string())?;

    let algorithm = matches
        .get_one::<String>("algorithm")
        .ok_or_else(|| "No algorithm provided".to_string())?
        .parse::<Algorithm>()?;

    let max_replays = matches
        .get_one::<u64>("max-replays")
        .copied()
        .filter(|n| *n > 0);

    let output = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    Ok(RunArgs {
        trace,
        options: SimulationOptions::new()
            .algorithm(algorithm)
            .max_replays(max_replays),
        output,
        log_level: log_level(matches.get_count("verbose"), matches.get_flag("quiet")),
    })
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

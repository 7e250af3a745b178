//! ccsim CLI: replay a transaction trace under 2PL, OCC or MVTO and print
//! the final status report.
//!
//! ```text
//! ccsim <TRACE> --algorithm <ALG> [--json] [-v...] [--quiet] [--max-replays N]
//! ```

mod commands;
mod format;
mod logging;
mod parse;

use std::process;

use anyhow::Context;
use ccsim_engine::Simulation;

use commands::build_cli;
use format::{format_error, format_report, OutputMode};
use parse::{matches_to_run, RunArgs};

fn main() {
    let matches = build_cli().get_matches();
    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let args = match matches_to_run(&matches) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}", format_error(&anyhow::anyhow!(e), output_mode));
            process::exit(1);
        }
    };
    logging::init_logging(args.log_level);

    match run(&args) {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            eprintln!("{}", format_error(&e, args.output));
            process::exit(1);
        }
    }
}

fn run(args: &RunArgs) -> anyhow::Result<String> {
    let report = Simulation::new(args.options.clone())
        .run_path(&args.trace)
        .with_context(|| {
            format!(
                "{} simulation of {} failed",
                args.options.algorithm,
                args.trace.display()
            )
        })?;
    Ok(format_report(&report, args.output))
}

//! clap command definition for the `ccsim` binary.

use clap::{Arg, ArgAction, Command};

/// Build the top-level command.
pub fn build_cli() -> Command {
    Command::new("ccsim")
        .about("Replay a transaction trace under a concurrency-control algorithm")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("trace")
                .value_name("TRACE")
                .required(true)
                .help("Trace file; `<TRACE>.txt` is also tried when TRACE has no extension"),
        )
        .arg(
            Arg::new("algorithm")
                .short('a')
                .long("algorithm")
                .value_name("ALG")
                .required(true)
                .help("2pl | occ | mvto (or 1 | 2 | 3)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the final report as JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("More log output (-v info, -vv debug, -vvv trace)"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .conflicts_with("verbose")
                .help("Only log errors"),
        )
        .arg(
            Arg::new("max-replays")
                .long("max-replays")
                .value_name("N")
                .value_parser(clap::value_parser!(u64))
                .help("Rollback replays allowed before giving up (default and 0: unbounded)"),
        )
}

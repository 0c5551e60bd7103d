use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use std::process::ExitCode;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
        .help("Path to the TOML run configuration")
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Command::new("sitemig")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Replay an exported facility into a target facility")
        .subcommand_required(true)
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .global(true)
                .help("Log filter, e.g. `debug` or `sitemig_core=trace` (overrides RUST_LOG)"),
        )
        .subcommand(
            Command::new("run")
                .about("Run the migration")
                .arg(config_arg())
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Skip both confirmation checkpoints"),
                ),
        )
        .subcommand(
            Command::new("check")
                .about("Validate configuration and input document without contacting the API")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();
    sitemig_cli::init_tracing(matches.get_one::<String>("log-level").map(String::as_str));

    let result = match matches.subcommand() {
        Some(("run", args)) => {
            let Some(config) = args.get_one::<PathBuf>("config") else {
                return ExitCode::from(2);
            };
            sitemig_cli::run(config, args.get_flag("yes")).await
        }
        Some(("check", args)) => {
            let Some(config) = args.get_one::<PathBuf>("config") else {
                return ExitCode::from(2);
            };
            sitemig_cli::check(config).map(|()| true)
        }
        _ => Ok(true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

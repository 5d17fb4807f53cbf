use backsim::cli::{Cli, run};
use backsim::logging::setup_logging;
use clap::Parser;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level, cli.json_logs);
    run(cli)
}

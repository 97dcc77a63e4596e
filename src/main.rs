use clap::Parser;
use qqetrader::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

use clap::Parser;
use lrcwatch::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}

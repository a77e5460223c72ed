use std::process::ExitCode;

mod cli;
mod logging;

fn main() -> ExitCode {
    ExitCode::from(cli::run())
}

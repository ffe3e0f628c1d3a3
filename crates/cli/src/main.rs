use std::process::ExitCode;

fn main() -> ExitCode {
    opshub_cli::run()
}

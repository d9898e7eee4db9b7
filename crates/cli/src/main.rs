use std::process::ExitCode;

fn main() -> ExitCode {
    jardin_cli::run()
}

use std::process::ExitCode;

fn main() -> ExitCode {
    sachet_cli::run()
}

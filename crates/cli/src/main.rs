use std::process::ExitCode;

fn main() -> ExitCode {
    tipbot_cli::run()
}

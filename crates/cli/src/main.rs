use std::process::ExitCode;

fn main() -> ExitCode {
    bazari_cli::run()
}

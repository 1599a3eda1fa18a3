use syndicate_cli::{print_error, run, CliError};

fn main() {
    if let Err(e) = run() {
        // Ledger errors were already reported alongside the command output
        if !matches!(e, CliError::Ledger(_)) {
            print_error(&e.to_string());
        }
        std::process::exit(e.exit_code());
    }
}

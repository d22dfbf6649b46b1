//! aeromodel CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`. Errors are printed
//! to stderr with their code and the process exits non-zero.

use aeromodel::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e.report());
        std::process::exit(1);
    }
}

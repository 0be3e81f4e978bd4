//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

use tiler_cli::CliError;

fn main() {
    if let Err(err) = tiler_cli::run() {
        if let CliError::ArgumentParsing(usage) = &err {
            usage.exit();
        }
        eprintln!("tiler: {err}");
        std::process::exit(err.exit_code());
    }
}

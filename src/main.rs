//
// main.rs
// Volume-Convert-rs
//
// Entry point that hands off execution to the CLI layer; any returned error exits with status 1.
//
// Thales Matheus Mendonça Santos - October 2026

use volume_convert::cli;

fn main() -> anyhow::Result<()> {
    // Delegate all argument parsing and dispatching to the CLI module.
    cli::run()
}

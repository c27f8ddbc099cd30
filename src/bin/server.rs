//! Ranking API server.
//! Run with: cargo run --bin equity-ranker-server

use std::process::ExitCode;

use equity_ranker::start_equity_ranker;

fn main() -> ExitCode {
    start_equity_ranker::run()
}

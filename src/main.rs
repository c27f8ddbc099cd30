//! One-shot CLI: rank companies for a request and print the result.

use std::process::ExitCode;

use clap::Parser;
use equity_ranker::ranking::{Ranker, RankerConfig, RankingSession, render_markdown};
use equity_ranker::start_equity_ranker;

/// Rank companies against a free-text investment preference.
///
/// Examples:
///   equity-ranker low volatility and strong governance
///   equity-ranker --top-n 5 --export cheap large caps
#[derive(Parser, Debug)]
#[command(name = "equity-ranker")]
#[command(version)]
#[command(about, long_about = None)]
struct Cli {
    /// Preference in plain words; the words are joined with spaces
    #[arg(value_name = "REQUEST", required = true)]
    request: Vec<String>,

    /// Rows to show (defaults to EQUITY_RANKER_TOP_N or 15)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    top_n: Option<u64>,

    /// Compare raw values across the whole table instead of within sectors
    #[arg(long)]
    no_sector_neutral: bool,

    /// Also save the shown rows as a CSV in the export directory
    #[arg(long)]
    export: bool,
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let ranker = Ranker::with_ollama(RankerConfig::from_env())?;
    let mut session = RankingSession::new();
    let top_n = cli.top_n.map(usize::try_from).transpose()?;

    let (view, spec) = ranker
        .rank_into_session(
            &mut session,
            &cli.request.join(" "),
            top_n,
            Some(!cli.no_sector_neutral),
        )
        .await?;
    println!("{}", render_markdown(&view, &spec));

    if cli.export {
        let path = ranker.export_session(&session).await?;
        println!("\nSaved to {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    start_equity_ranker::init_tracing();

    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match rt.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::from(1)
        }
    }
}

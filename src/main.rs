use std::process::ExitCode;

use clap::Parser;

use profile_scout::cli::Cli;
use profile_scout::errors::ScoutError;

#[tokio::main]
async fn main() -> ExitCode {
    profile_scout::init_tracing();
    let cli = Cli::parse();

    match profile_scout::run(cli).await {
        Ok(summary) => {
            println!(
                "Done: {} profiles processed ({} saved, {} invited, {} skipped, {} fallbacks, {} degraded evaluations).",
                summary.processed,
                summary.saved,
                summary.sent,
                summary.skipped,
                summary.fallbacks,
                summary.degraded_evaluations,
            );
            for path in &summary.archived {
                println!("  archived {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e @ (ScoutError::MissingCredentials(_) | ScoutError::Config(_) | ScoutError::TomlDe(_))) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Run failed: {e}");
            if let Some(path) = e.diagnostic() {
                eprintln!("Diagnostic capture: {}", path.display());
            }
            ExitCode::from(2)
        }
    }
}

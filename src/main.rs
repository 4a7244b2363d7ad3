use foosball_ladder::repository::{InMemoryLadderRepository, Ledger};
use foosball_ladder::settlement::SystemClock;
use foosball_ladder::{AppError, LadderConfig, LadderState};
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: ladder <ledger.json>";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Logs go to stderr so the rebuilt ledger can be piped from stdout
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "foosball_ladder=debug,ladder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(&path).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(status = err.status_code(), %err, "Rebuild failed");
            ExitCode::FAILURE
        }
    }
}

/// Loads a ledger dump, rebuilds every member from its match log and prints the result.
async fn run(path: &str) -> Result<(), AppError> {
    let config = LadderConfig::from_env();
    info!(path, ?config, "Loading ledger");

    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Ledger(format!("cannot read {path}: {e}")))?;
    let ledger: Ledger = serde_json::from_str(&raw)
        .map_err(|e| AppError::Ledger(format!("cannot parse {path}: {e}")))?;

    let repository = Arc::new(InMemoryLadderRepository::from_ledger(ledger));
    let state = LadderState::new(repository.clone(), Arc::new(SystemClock), config);

    let rebuild = state.recalc.rebuild_all().await?;
    info!(
        members = rebuild.members.len(),
        matches = rebuild.matches.len(),
        "Ledger rebuilt"
    );

    write_ledger(&mut std::io::stdout().lock(), &repository.ledger().await)
}

fn write_ledger(out: &mut impl Write, ledger: &Ledger) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, ledger)
        .map_err(|e| AppError::Internal(format!("cannot write ledger: {e}")))?;
    writeln!(out).map_err(|e| AppError::Internal(format!("cannot write ledger: {e}")))
}

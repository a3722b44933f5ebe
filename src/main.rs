//! Bug Catcher - Entry Point
//!
//! Command dispatch for the catch workflow:
//! - `catch-full --name NAME`: full two-phase catch for the signer
//! - `get-uri --token-id N`: print a caught bug's metadata URI
//! - `status`: cooldown, balance and in-flight catch for the signer
//!
//! Wiring sequence:
//! 1. Parse CLI arguments
//! 2. Load config.toml + validate
//! 3. Init tracing (JSON structured logging by default)
//! 4. Load signer from PRIVATE_KEY
//! 5. Connect provider, validate chain id
//! 6. Resolve + validate contract addresses on-chain
//! 7. Run the command; Ctrl-C drops the in-flight catch, releasing
//!    its subscriptions

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info, warn};

use bug_catcher::adapters::chain::{AlloyLedger, CatchContracts, ChainProvider, signer_from_env};
use bug_catcher::config::{self, AppConfig, LogFormat};
use bug_catcher::usecases::CatchOrchestrator;

#[derive(Parser, Debug)]
#[command(
    name = "bug-catcher",
    about = "Catch bugs on the BugMinter contracts",
    version
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initiate and complete a catch, then print the caught bug.
    CatchFull {
        /// Name given to the caught bug.
        #[arg(long)]
        name: String,
    },
    /// Print the metadata URI of a bug.
    GetUri {
        /// Token id (decimal or 0x-prefixed hex).
        #[arg(long)]
        token_id: String,
    },
    /// Show cooldown, balance and in-flight catch for the signer.
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── 1. Load configuration ───────────────────────────────
    let config = config::loader::load_config(&cli.config).context("Failed to load configuration")?;

    // ── 2. Initialize structured logging ────────────────────
    init_tracing(&config);

    info!(
        name = %config.app.name,
        version = env!("CARGO_PKG_VERSION"),
        network = %config.network.name,
        "Starting bug catcher"
    );

    // ── 3. Signer, provider, contracts ──────────────────────
    let signer = signer_from_env()?;
    let chain = ChainProvider::connect(&config.network, signer)
        .await
        .context("Failed to connect to network")?;
    let contracts = CatchContracts::resolve(chain.inner(), &config.contracts)
        .await
        .context("Failed to resolve catch contracts")?;

    let ledger = Arc::new(AlloyLedger::new(&chain, contracts));
    let orchestrator = CatchOrchestrator::new(Arc::clone(&ledger), config.catch.to_settings());
    let actor = ledger.signer();

    // ── 4. Dispatch ─────────────────────────────────────────
    match cli.command {
        Command::CatchFull { name } => run_catch(&orchestrator, &ledger, &name).await,
        Command::GetUri { token_id } => {
            let token_id: U256 = token_id
                .parse()
                .with_context(|| format!("Invalid token id: {token_id}"))?;
            let uri = orchestrator.token_uri(token_id).await?;
            println!("{uri}");
            Ok(())
        }
        Command::Status => {
            let status = orchestrator.status(actor).await?;
            println!("chain id:         {}", chain.chain_id());
            println!("rpc healthy:      {}", chain.is_healthy().await);
            println!("bug minter:       {}", ledger.contracts().bug_minter);
            println!("actor:            {}", status.actor);
            println!("balance (wei):    {}", status.balance);
            if status.can_catch() {
                println!("cooldown:         clear");
            } else {
                println!("cooldown:         {}s remaining", status.seconds_until_available);
            }
            match status.in_flight_token {
                Some(id) => println!("in-flight token:  #{id}"),
                None => println!("in-flight token:  none"),
            }
            Ok(())
        }
    }
}

/// Run `catch-full` until it finishes or Ctrl-C arrives.
async fn run_catch(
    orchestrator: &CatchOrchestrator<AlloyLedger>,
    ledger: &AlloyLedger,
    name: &str,
) -> Result<()> {
    let actor = ledger.signer();

    let outcome = tokio::select! {
        outcome = orchestrator.catch_full(actor, name) => outcome,
        _ = signal::ctrl_c() => {
            // the catch future is already dropped here, so this counts
            // subscriptions that survived its teardown
            warn!(
                leaked_subscriptions = ledger.active_subscriptions(),
                "Interrupted; mined transactions stay on-chain"
            );
            anyhow::bail!("catch interrupted");
        }
    };

    match outcome {
        Ok(result) => {
            info!(
                token_id = %result.token_id,
                attempt_id = %result.attempt_id,
                "Catch finished"
            );
            println!("Catch initiated in block {}", result.initiated_block);
            println!("You caught bug #{}", result.token_id);
            if let Some(uri) = &result.metadata_uri {
                println!("Metadata: {uri}");
            }
            Ok(())
        }
        Err(failure) if !failure.is_fatal() => {
            warn!(reason = %failure.reason, "Catch not possible right now");
            println!("{}", failure.reason);
            Ok(())
        }
        Err(failure) => {
            error!(
                tag = failure.reason.tag(),
                phase = %failure.phase,
                mined = failure.receipts.len(),
                "Catch failed"
            );
            for tx_hash in &failure.receipts {
                println!("Mined before the failure: {tx_hash}");
            }
            if failure.initiate_mined() {
                println!("A catch may still be in flight; run `bug-catcher status` before retrying");
            }
            Err(failure.into())
        }
    }
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.app.log_level));

    match config.app.log_format {
        LogFormat::Json => tracing_subscriber::fmt().with_env_filter(filter).json().init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

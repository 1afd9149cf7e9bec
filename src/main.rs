//! Ledger gateway command-line entry point.
//!
//! - `tools`: print the tool catalog as JSON
//! - `call`: run one tool call through the full gateway

use clap::{Parser, Subcommand};
use ledger_gateway::ledger::{FixtureLedger, LedgerQuery};
use ledger_gateway::tools::parse_arguments;
use ledger_gateway::{observability, Error, GatewayBuilder, GatewayConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Parser)]
#[command(name = "ledger-gateway", version, about = "Resilient read-only ledger tools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the tool catalog with input schemas.
    Tools,
    /// Invoke a tool and print its text result.
    Call {
        /// Tool name, e.g. `show-provider`.
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long)]
        params: Option<String>,
        /// Answer from a JSON fixture instead of a live ledger.
        #[arg(long, env = "LEDGER_GATEWAY_FIXTURES")]
        fixtures: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = GatewayConfig::from_env()?;

    // Initialize observability
    observability::init_tracing(&config.observability);

    match cli.command {
        Command::Tools => {
            let gateway = GatewayBuilder::from_config(&config).build();
            println!("{}", serde_json::to_string_pretty(gateway.catalog().entries())?);
        }
        Command::Call {
            tool,
            params,
            fixtures,
        } => {
            let params = params
                .as_deref()
                .map(parse_arguments)
                .transpose()
                .map_err(Error::from)?;

            // No fixture means no ledger handle: every call reports the
            // dependency as unavailable.
            let ledger = match fixtures {
                Some(path) => {
                    Some(Arc::new(FixtureLedger::from_path(path)?) as Arc<dyn LedgerQuery>)
                }
                None => {
                    tracing::warn!(
                        grpc_url = %config.ledger.grpc_url,
                        "No ledger client available, tools will report the dependency as unavailable"
                    );
                    None
                }
            };

            let gateway = GatewayBuilder::from_config(&config)
                .maybe_ledger(ledger)
                .build();

            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let result = gateway.call_tool(&tool, params.as_ref(), &cancel).await?;
            println!("{}", result.text());
        }
    }

    Ok(())
}

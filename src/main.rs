//! x402-monero payment client entrypoint.
//!
//! Runs one complete pay-per-request cycle against a Monero x402 facilitator:
//!
//! 1. Obtain an invoice (`POST /invoices`, or parse the resource's 402
//!    challenge with `--from-challenge`)
//! 2. Pay it through the local wallet daemon's `transfer` RPC
//! 3. Wait out mempool propagation (cancellable via SIGINT/SIGTERM)
//! 4. Submit payment evidence via the configured strategy
//!    (`verify`, `settle`, or `header-retry`)
//! 5. On confirmation, read back the invoice's final state
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `FACILITATOR_URL`, `WALLET_RPC_URL`, `RESOURCE_URL` select endpoints
//! - `RUST_LOG` controls log verbosity

use clap::Parser;
use dotenvy::dotenv;
use std::process::ExitCode;

use x402_monero::config::Config;
use x402_monero::facilitator::FacilitatorClient;
use x402_monero::flow::{FlowOutcome, InvoiceSource, PaymentFlow, PropagationWait};
use x402_monero::proof::ProofSubmitter;
use x402_monero::resource::ResourceClient;
use x402_monero::sig_down::SigDown;
use x402_monero::telemetry;
use x402_monero::wallet::WalletRpcClient;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // Load .env variables
    dotenv().ok();
    telemetry::init();

    let config = Config::parse();
    config.validate()?;

    let facilitator = FacilitatorClient::try_new(config.facilitator_url.clone())?
        .with_timeout(config.http_timeout());
    let wallet =
        WalletRpcClient::new(config.wallet_rpc_url.clone()).with_timeout(config.http_timeout());
    let resource = config
        .resource_url
        .clone()
        .map(|url| ResourceClient::new(url).with_timeout(config.http_timeout()));

    let submitter = ProofSubmitter::new(
        config.strategy,
        facilitator.clone(),
        resource.clone(),
        config.network,
    );
    let wait = PropagationWait::new(config.propagation_wait(), config.propagation_poll());
    let flow = PaymentFlow::new(
        facilitator,
        wallet,
        submitter,
        config.tx_key_policy,
        wait,
    );

    let source = if config.from_challenge {
        // validate() guarantees the resource URL is present here.
        match resource {
            Some(resource) => InvoiceSource::Challenge(resource),
            None => unreachable!("validated configuration"),
        }
    } else {
        InvoiceSource::Request {
            amount_usd: config.amount_usd.amount(),
            metadata: config.metadata.clone(),
        }
    };

    let sig_down = SigDown::try_new()?;
    let outcome = flow.run(source, sig_down.cancellation_token()).await?;

    match outcome {
        FlowOutcome::Confirmed {
            settlement,
            invoice,
        } => {
            tracing::info!(
                status = %settlement.status,
                amount_received = ?settlement.amount_received,
                payer = ?settlement.payer,
                "Facilitator confirms payment"
            );
            if let Some(invoice) = invoice {
                tracing::info!(
                    address = %invoice.address,
                    invoice_status = ?invoice.status,
                    "Final invoice state"
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        FlowOutcome::Unlocked { body, invoice } => {
            tracing::info!("Resource unlocked");
            if let Some(invoice) = invoice {
                tracing::info!(
                    address = %invoice.address,
                    invoice_status = ?invoice.status,
                    "Final invoice state"
                );
            }
            println!("{body}");
            Ok(ExitCode::SUCCESS)
        }
        FlowOutcome::Declined { status, detail } => {
            tracing::error!(?status, %detail, "Payment declined");
            Ok(ExitCode::FAILURE)
        }
    }
}

//! # Loyalty Accrual
//!
//! Reads `<user-id> <order-number>` lines from stdin, uploads each order and
//! lets the pipeline reconcile it with the accrual service configured by
//! `--accrual-system-address` / `ACCRUAL_SYSTEM_ADDRESS`.
//!
//! ```bash
//! printf '1 79927398713\n2 4561261212345467\n' | RUST_LOG=info cargo run -- -r http://localhost:8081
//! ```
//!
//! At end of input the pipeline keeps polling until every order is resolved
//! (bounded by `--drain-timeout-ms`), then shuts down and prints the balances
//! of every user seen. Ctrl-C shuts down at once.

use loyalty_accrual::clients::AccrualClient;
use loyalty_accrual::config::Config;
use loyalty_accrual::dispatcher::{self, HttpTransport};
use loyalty_accrual::intake::{OrderIntake, SubmitOutcome};
use loyalty_accrual::lifecycle::{order_channel, setup_tracing, AccrualPipeline};
use loyalty_accrual::model::UserId;
use loyalty_accrual::repository::ledger;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = Config::load();
    setup_tracing();

    let settings = config.pipeline();
    info!(accrual = %config.accrual_system_address, "Starting loyalty accrual");

    let (ledger_actor, ledger) = ledger::new();
    tokio::spawn(ledger_actor.run());

    let transport = HttpTransport::new(&config.accrual_system_address, settings.response_timeout)
        .map_err(|e| e.to_string())?;
    let (dispatcher, dispatch_client) = dispatcher::new(
        Arc::new(transport),
        settings.request_interval,
        settings.response_timeout,
    );
    let accrual = AccrualClient::new(dispatch_client, settings.throttle_cooldown);

    let (sender, intake_rx) = order_channel(settings.intake_capacity);
    let mut pipeline = AccrualPipeline::start(
        &settings,
        Arc::new(accrual),
        Arc::new(ledger.clone()),
        intake_rx,
    )
    .await
    .map_err(|e| e.to_string())?;
    let signal = pipeline.shutdown_signal();
    pipeline.spawn_task("dispatcher", dispatcher.run(signal));

    let intake = OrderIntake::new(ledger.clone(), sender);
    let mut users = BTreeSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interrupted = false;

    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                interrupted = true;
                break;
            }
            line = lines.next_line() => line,
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "Failed to read input");
                break;
            }
        };

        let mut fields = line.split_whitespace();
        let (Some(user), Some(number)) = (fields.next(), fields.next()) else {
            continue;
        };
        let Ok(user) = user.parse::<u64>().map(UserId) else {
            warn!(input = %line, "Expected `<user-id> <order-number>`");
            continue;
        };
        users.insert(user);

        match intake.submit(user, number).await {
            Ok(SubmitOutcome::Accepted(order)) => println!("{user} {}: accepted", order.number),
            Ok(SubmitOutcome::AlreadyUploaded(order)) => {
                println!("{user} {}: already uploaded ({})", order.number, order.status)
            }
            Err(e) => println!("{user} {number}: {e}"),
        }
    }

    if !interrupted {
        info!(timeout_ms = settings.drain_timeout.as_millis() as u64, "End of input, waiting for orders to resolve");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("Interrupted"),
            drained = pipeline.wait_until_drained(Duration::from_millis(500), settings.drain_timeout) => {
                if let Err(e) = drained {
                    error!(error = %e, "Failed to wait for orders");
                }
            }
        }
    }

    if let Err(e) = pipeline
        .shutdown(intake.into_sender(), settings.shutdown_timeout)
        .await
    {
        error!(error = %e, "Pipeline did not stop cleanly");
    }

    for user in users {
        match ledger.balance(user).await {
            Ok(balance) => println!("{user}: current={} withdrawn={}", balance.current, balance.withdrawn),
            Err(e) => error!(%user, error = %e, "Failed to read balance"),
        }
        for order in ledger.orders_for_user(user).await.map_err(|e| e.to_string())? {
            println!("  {} {} accrual={}", order.number, order.status, order.accrual);
        }
    }

    info!("Application completed successfully");
    Ok(())
}

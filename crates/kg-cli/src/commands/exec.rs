//! Exec command implementation

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use kg_client::{GatewayConfig, InboundMessage, Session};
use kg_protocol::content::{ExecutionState, Status};

use crate::output::print_warning;

pub struct ExecOptions {
    /// How long to wait for the kernel to go idle
    pub wait: Duration,
    /// Leave a kernel created for this run alive afterwards
    pub keep: bool,
}

/// Run `code` on a kernel and print every inbound frame as raw JSON
pub async fn exec_command(
    config: GatewayConfig,
    code: &str,
    options: &ExecOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    let mut session = Session::connect(config, cancel)
        .await
        .context("Failed to connect to gateway")?;
    let Some(mut inbound) = session.inbound() else {
        anyhow::bail!("Inbound queue already taken");
    };

    tracing::info!(kernel = %session.kernel(), "Executing code");
    let msg_id = session.execute(code).await.context("Failed to send code")?;

    let deadline = tokio::time::sleep(options.wait);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                print_warning("Interrupted");
                break;
            }
            _ = &mut deadline => {
                print_warning(&format!("Kernel did not go idle within {:?}", options.wait));
                break;
            }
            message = inbound.recv() => {
                let Some(message) = message else {
                    print_warning("Channel closed");
                    break;
                };
                println!("{}", message.raw());
                if is_idle_for(&message, &msg_id) {
                    break;
                }
            }
        }
    }

    if session.created_kernel() && !options.keep {
        session
            .shutdown_kernel(&CancellationToken::new())
            .await
            .context("Failed to delete kernel")?;
    } else {
        session.shutdown().await?;
    }
    Ok(())
}

/// Whether `message` reports the kernel idle after handling `msg_id`
fn is_idle_for(message: &InboundMessage, msg_id: &str) -> bool {
    message.msg_type() == "status"
        && message.is_child_of(msg_id)
        && matches!(
            message.content_as::<Status>(),
            Ok(Status {
                execution_state: ExecutionState::Idle
            })
        )
}

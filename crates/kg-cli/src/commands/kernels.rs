//! Kernel management commands

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use kg_client::{GatewayConfig, HttpTransport, KernelProvisioner};

use crate::output::{format_kernels, print_error, print_success};

/// List the gateway's kernels
pub async fn list_command(config: &GatewayConfig, cancel: &CancellationToken) -> Result<()> {
    let transport = HttpTransport::from_config(config)?;
    let provisioner = KernelProvisioner::new(&transport, &config.kernel_name);

    let kernels = provisioner
        .list(cancel)
        .await
        .context("Failed to list kernels")?;
    println!("{}", format_kernels(&kernels));
    Ok(())
}

/// Delete each kernel in `ids`, continuing past failures
pub async fn delete_command(
    config: &GatewayConfig,
    ids: &[String],
    cancel: &CancellationToken,
) -> Result<()> {
    let transport = HttpTransport::from_config(config)?;
    let provisioner = KernelProvisioner::new(&transport, &config.kernel_name);

    let mut failed = 0;
    for id in ids {
        match provisioner.delete(id, cancel).await {
            Ok(()) => print_success(&format!("Deleted kernel: {}", id)),
            Err(e) => {
                print_error(&format!("Failed to delete kernel {}: {}", id, e));
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("Failed to delete {} kernel(s)", failed);
    }
    Ok(())
}

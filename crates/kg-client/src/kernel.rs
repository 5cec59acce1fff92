//! Kernel provisioning over the gateway REST API

use reqwest::Method;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use kg_core::{GatewayError, KernelHandle, Result};

use crate::http::HttpTransport;

/// Collection endpoint for kernels
pub const KERNELS_PATH: &str = "/api/kernels";

#[derive(Serialize)]
struct CreateKernel<'a> {
    name: &'a str,
}

/// Obtains kernel handles from a gateway
#[derive(Debug, Clone, Copy)]
pub struct KernelProvisioner<'a> {
    transport: &'a HttpTransport,
    kernel_name: &'a str,
}

impl<'a> KernelProvisioner<'a> {
    /// Create a provisioner that creates kernels of type `kernel_name`
    pub fn new(transport: &'a HttpTransport, kernel_name: &'a str) -> Self {
        Self {
            transport,
            kernel_name,
        }
    }

    /// Kernel type used for new and adopted kernels
    pub fn kernel_name(&self) -> &str {
        self.kernel_name
    }

    /// Adopt `existing_id` if given, otherwise create a new kernel.
    ///
    /// An adopted kernel is not checked with the gateway; the first sign of a
    /// wrong id is the channel handshake failing.
    pub async fn acquire(
        &self,
        existing_id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<KernelHandle> {
        match existing_id.filter(|id| !id.is_empty()) {
            Some(id) => {
                tracing::info!(kernel_id = %id, "Adopting existing kernel");
                Ok(KernelHandle::new(self.kernel_name, id))
            }
            None => self.create(cancel).await,
        }
    }

    /// Create a new kernel
    pub async fn create(&self, cancel: &CancellationToken) -> Result<KernelHandle> {
        let body = CreateKernel {
            name: self.kernel_name,
        };
        let request = self
            .transport
            .build_request(Method::POST, KERNELS_PATH, Some(&body))?;

        let kernel: KernelHandle = self
            .transport
            .execute_json(request, cancel)
            .await?
            .ok_or_else(|| GatewayError::Decoding("Empty kernel creation response".into()))?;

        tracing::info!(kernel_id = %kernel.id(), kernel_name = %kernel.name(), "Created kernel");
        Ok(kernel)
    }

    /// List the kernels running on the gateway
    pub async fn list(&self, cancel: &CancellationToken) -> Result<Vec<KernelHandle>> {
        let request = self
            .transport
            .build_request::<()>(Method::GET, KERNELS_PATH, None)?;
        let kernels = self.transport.execute_json(request, cancel).await?;
        Ok(kernels.unwrap_or_default())
    }

    /// Look up one kernel
    pub async fn get(&self, id: &str, cancel: &CancellationToken) -> Result<KernelHandle> {
        let request = self
            .transport
            .build_request::<()>(Method::GET, &kernel_path(id, "")?, None)?;
        self.transport
            .execute_json(request, cancel)
            .await?
            .ok_or_else(|| GatewayError::Decoding(format!("Empty response for kernel {}", id)))
    }

    /// Shut a kernel down and remove it from the gateway
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let request = self
            .transport
            .build_request::<()>(Method::DELETE, &kernel_path(id, "")?, None)?;
        self.transport.execute_empty(request, cancel).await?;
        tracing::info!(kernel_id = %id, "Deleted kernel");
        Ok(())
    }

    /// Interrupt the kernel's current execution
    pub async fn interrupt(&self, id: &str, cancel: &CancellationToken) -> Result<()> {
        let request = self
            .transport
            .build_request::<()>(Method::POST, &kernel_path(id, "/interrupt")?, None)?;
        self.transport.execute_empty(request, cancel).await
    }

    /// Restart the kernel, keeping its id
    pub async fn restart(&self, id: &str, cancel: &CancellationToken) -> Result<KernelHandle> {
        let request = self
            .transport
            .build_request::<()>(Method::POST, &kernel_path(id, "/restart")?, None)?;
        let kernel = self.transport.execute_json(request, cancel).await?;
        tracing::info!(kernel_id = %id, "Restarted kernel");
        Ok(kernel.unwrap_or_else(|| KernelHandle::new(self.kernel_name, id)))
    }
}

/// Path of one kernel resource, with an optional action suffix
pub(crate) fn kernel_path(id: &str, suffix: &str) -> Result<String> {
    if id.is_empty() || id.contains(['/', '?', '#']) {
        return Err(GatewayError::Address(format!("Invalid kernel id: {:?}", id)));
    }
    Ok(format!("{}/{}{}", KERNELS_PATH, id, suffix))
}

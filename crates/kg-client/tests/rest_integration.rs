//! REST integration tests
//!
//! Exercises the HTTP transport and kernel provisioner against the mock gateway.

mod common;

use reqwest::Method;
use serde_json::Value;

use common::MockGateway;
use kg_client::{CancellationToken, GatewayError, HttpTransport, KernelHandle, KernelProvisioner};

fn transport(gateway: &MockGateway) -> HttpTransport {
    HttpTransport::new(gateway.api_url().parse().unwrap()).unwrap()
}

#[tokio::test]
async fn test_empty_body_decodes_to_none() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);

    let request = transport
        .build_request::<()>(Method::GET, "/test/empty", None)
        .unwrap();
    let body: Option<Value> = transport
        .execute_json(request, &CancellationToken::new())
        .await
        .unwrap();
    assert!(body.is_none());
}

#[tokio::test]
async fn test_raw_body_copied_to_sink() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);

    let request = transport
        .build_request::<()>(Method::GET, "/test/raw", None)
        .unwrap();
    let mut sink = Vec::new();
    let written = transport
        .execute_raw(request, &CancellationToken::new(), &mut sink)
        .await
        .unwrap();

    assert_eq!(sink, b"raw body bytes");
    assert_eq!(written, sink.len() as u64);
}

#[tokio::test]
async fn test_malformed_body_is_decoding_error() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);

    let request = transport
        .build_request::<()>(Method::GET, "/test/malformed", None)
        .unwrap();
    let err = transport
        .execute_json::<Value>(request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decoding(_)));
}

#[tokio::test]
async fn test_unreachable_gateway_is_transport_error() {
    // Bind then drop to get a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let transport =
        HttpTransport::new(format!("http://127.0.0.1:{}", port).parse().unwrap()).unwrap();
    let request = transport
        .build_request::<()>(Method::GET, "/api/kernels", None)
        .unwrap();
    let err = transport
        .execute_empty(request, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Transport(_)));
}

#[tokio::test]
async fn test_acquire_creates_kernel() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);
    let provisioner = KernelProvisioner::new(&transport, "python3");

    let kernel = provisioner
        .acquire(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(kernel, KernelHandle::new("python3", "abc123"));
    assert_eq!(gateway.creates(), 1);
}

#[tokio::test]
async fn test_acquire_empty_id_creates_kernel() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);
    let provisioner = KernelProvisioner::new(&transport, "python3");

    let kernel = provisioner
        .acquire(Some(""), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(kernel.id(), "abc123");
    assert_eq!(gateway.creates(), 1);
}

#[tokio::test]
async fn test_list_and_get_kernels() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);
    let provisioner = KernelProvisioner::new(&transport, "python3");
    let cancel = CancellationToken::new();

    let kernels = provisioner.list(&cancel).await.unwrap();
    let ids: Vec<&str> = kernels.iter().map(KernelHandle::id).collect();
    assert_eq!(ids, ["abc123", "def456"]);
    assert_eq!(kernels[0].execution_state(), Some("idle"));
    assert_eq!(kernels[0].connections(), Some(1));

    let kernel = provisioner.get("abc123", &cancel).await.unwrap();
    assert_eq!(kernel.name(), "python3");
    assert_eq!(kernel.last_activity(), Some("2024-01-01T00:00:00Z"));

    let err = provisioner.get("missing", &cancel).await.unwrap_err();
    assert!(matches!(err, GatewayError::Status { code: 404, .. }));
}

#[tokio::test]
async fn test_kernel_lifecycle_operations() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);
    let provisioner = KernelProvisioner::new(&transport, "python3");
    let cancel = CancellationToken::new();

    provisioner.interrupt("abc123", &cancel).await.unwrap();
    let restarted = provisioner.restart("abc123", &cancel).await.unwrap();
    assert_eq!(restarted.id(), "abc123");
    provisioner.delete("abc123", &cancel).await.unwrap();

    assert_eq!(gateway.deletes(), 1);
    assert_eq!(gateway.rest_requests(), 3);
}

#[tokio::test]
async fn test_cancelled_request_never_reaches_gateway() {
    let gateway = MockGateway::start().await;
    let transport = transport(&gateway);
    let provisioner = KernelProvisioner::new(&transport, "python3");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = provisioner.list(&cancel).await.unwrap_err();
    assert!(matches!(err, GatewayError::Cancelled));
    assert_eq!(gateway.rest_requests(), 0);
}

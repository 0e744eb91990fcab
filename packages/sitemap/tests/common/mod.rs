// Common test utilities

use axum::Router;
use tokio::net::TcpListener;

/// Bind an ephemeral port and return the listener with its base URL.
///
/// Binding before building the router lets fixtures embed absolute URLs
/// that point back at the server.
pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");
    (listener, format!("http://{}", addr))
}

/// Serve `router` on `listener` in the background.
pub fn serve(listener: TcpListener, router: Router) {
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server crashed");
    });
}

/// Bind and serve in one step for fixtures that need no self-references.
pub async fn spawn(router: Router) -> String {
    let (listener, base) = bind().await;
    serve(listener, router);
    base
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

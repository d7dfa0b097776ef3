//! Helpers shared by the integration test binaries.

use wiremock::MockServer;

/// Starts a mock server, or returns `None` when localhost cannot be bound.
pub async fn start_mock_server_or_skip() -> Option<MockServer> {
    if std::net::TcpListener::bind("127.0.0.1:0").is_err() {
        eprintln!("cannot bind 127.0.0.1; skipping mock server test");
        return None;
    }
    Some(MockServer::start().await)
}

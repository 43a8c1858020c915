//! Network transport for client sessions.

pub mod ninep;

use crate::error::ApiError;
use crate::gateway::Gateway;
use std::sync::Arc;
use tracing::info;

pub use ninep::NinepServer;

/// Serve the gateway over 9P2000.L on `addr` (for example `tcp!0.0.0.0!1337`)
/// until the listener fails.
pub async fn serve(gateway: Arc<Gateway>, addr: &str) -> Result<(), ApiError> {
    info!(addr, share = gateway.share(), "Serving 9P");
    rs9p::srv::srv_async(NinepServer::new(gateway), addr)
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))
}

//! Observer server startup helper for embedding in the engine.
//!
//! [`spawn_observer`] launches the server on a background Tokio task so
//! the Observer API runs concurrently with the kernel runner.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{ServerConfig, ServerError};
use crate::state::AppState;

/// Spawn the Observer HTTP server on a background Tokio task.
///
/// The server runs until `shutdown` resolves. Bind failures inside the
/// task are logged rather than returned.
///
/// # Errors
///
/// Returns [`ServerError::Bind`] if the configured address does not
/// parse. This is checked before the task is spawned.
pub fn spawn_observer(
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<()>, ServerError> {
    let addr = config.socket_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = crate::server::start_server(&config, state, shutdown).await {
            tracing::error!(error = %e, "Observer server exited with error");
        }
    });

    tracing::info!(%addr, "Observer server spawned on background task");
    Ok(handle)
}

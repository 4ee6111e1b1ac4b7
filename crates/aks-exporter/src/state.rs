use prometheus::Registry;
use tracing::Dispatch;

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Registry,
    pub logger: Dispatch,
}

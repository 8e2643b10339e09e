use async_trait::async_trait;

use crate::error::Result;

/// Turns one dispatched request into one response.
///
/// Implementations are shared by every worker in the pool, so they must only
/// read their state.
#[async_trait]
pub trait RequestHandler: Send + Sync {
    type Request: Send;
    type Response: Send;

    /// Decode a single request. An error is fatal for the whole run.
    async fn handle(&self, request: Self::Request) -> Result<Self::Response>;
}

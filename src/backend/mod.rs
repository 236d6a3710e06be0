pub mod history;
pub mod simulated;

use crate::models::{Generation, GenerationRequest};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use crate::error::BackendError;
pub use history::GenerationHistory;
pub use simulated::SimulatedBackend;

/// A service that turns a [`GenerationRequest`] into a [`Generation`].
///
/// Implementations must resolve to [`BackendError::Cancelled`] whenever `cancel`
/// fires before the result is handed back, even if the work already finished.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn create_generation(
        &self,
        request: &GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<Generation, BackendError>;

    /// Most recent generations, newest first.
    async fn recent_generations(&self, limit: usize) -> Result<Vec<Generation>, BackendError>;
}

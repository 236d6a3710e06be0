pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod logger;
pub mod models;

pub use backend::{BackendError, GenerationBackend, GenerationHistory, SimulatedBackend};
pub use config::{BackendConfig, RetryPolicy, StudioConfig};
pub use controller::GenerationController;
pub use error::{GenerationError, Result, StudioError};
pub use models::*;

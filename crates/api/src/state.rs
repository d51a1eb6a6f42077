use std::sync::Arc;

use imageai_core::storage::BlobStore;
use imageai_genai::ImageGenerator;

use crate::auth::dev::DevTokenVerifier;
use crate::auth::VerifierChain;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: imageai_db::DbPool,
    /// Uploaded template assets; also the source of images to process.
    pub assets: Arc<dyn BlobStore>,
    /// Generated images.
    pub processed: Arc<dyn BlobStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub verifier: Arc<VerifierChain>,
    /// Set only when development login is enabled.
    pub dev_auth: Option<Arc<DevTokenVerifier>>,
}

use std::sync::Arc;

use crate::generation::GenerationClient;
use crate::layout::Typesetter;
use crate::storage::ObjectStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub generator: GenerationClient,
    /// Pluggable blob store. Default: S3BlobStore.
    pub store: Arc<dyn ObjectStore>,
    /// Font used for every text box and graph label.
    pub typesetter: Typesetter,
    /// Bucket that infographics and graphs are written to and read from.
    pub bucket: String,
}

//! Shared application state handed to every handler.

use crate::services::{
    art_service::ArtService, document_store::DocumentStore, image_service::ImageService,
};
use std::{path::PathBuf, sync::Arc};

/// Services built once at startup around a single store handle.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub art: ArtService,
    pub images: ImageService,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        base_url: impl Into<Arc<str>>,
        upload_dir: impl Into<PathBuf>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            art: ArtService::new(store.clone(), base_url),
            images: ImageService::new(store.clone(), upload_dir, staging_dir),
            store,
        }
    }
}

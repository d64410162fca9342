use std::sync::Arc;

use crate::config::Config;
use crate::store::EventStore;
use crate::uploads::UploadStore;

/// Shared request state; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EventStore>,
    pub uploads: UploadStore,
    /// `uid` stamped on newly created events.
    pub default_uid: i64,
}

impl AppState {
    pub fn new(store: Arc<dyn EventStore>, config: &Config) -> Self {
        Self {
            store,
            uploads: UploadStore::new(config.uploads.dir.clone()),
            default_uid: config.default_uid,
        }
    }
}

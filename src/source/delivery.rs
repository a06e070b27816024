use std::sync::{Arc, RwLock};

use super::error::SourceError;
use crate::telemetry::Fix;

/// Receiver of fixes from the background delivery path.
pub trait FixObserver: Send + Sync {
    fn on_fix(&self, fix: Fix);

    fn on_source_error(&self, err: SourceError) {
        log::error!("Location task error: {}", err);
    }
}

/// Registration point between a location source and whoever consumes its
/// fixes. Cloned into the source at construction; delivery with no observer
/// registered is discarded.
#[derive(Clone, Default)]
pub struct FixDelivery {
    observer: Arc<RwLock<Option<Arc<dyn FixObserver>>>>,
}

impl FixDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn FixObserver>) {
        let mut slot = self.observer.write().unwrap_or_else(|e| e.into_inner());
        if slot.replace(observer).is_some() {
            log::debug!("Replacing registered fix observer");
        }
    }

    pub fn unregister(&self) {
        let mut slot = self.observer.write().unwrap_or_else(|e| e.into_inner());
        slot.take();
    }

    /// Entry point for the background context. Only the first fix of a batch
    /// is forwarded.
    pub fn deliver(&self, batch: Result<Vec<Fix>, SourceError>) {
        let observer = self
            .observer
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let Some(observer) = observer else {
            log::debug!("No fix observer registered, discarding delivery");
            return;
        };

        match batch {
            Ok(fixes) => {
                if let Some(fix) = fixes.into_iter().next() {
                    observer.on_fix(fix);
                }
            }
            Err(err) => observer.on_source_error(err),
        }
    }
}

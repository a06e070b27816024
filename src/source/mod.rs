mod delivery;
mod error;
mod replay;
mod types;

pub use delivery::{FixDelivery, FixObserver};
pub use error::SourceError;
pub use replay::ReplaySource;
pub use types::{Accuracy, Permission, SubscriptionOptions};

use std::future::Future;

/// Device location API as seen by the tracking controller.
///
/// Fixes are not returned from these calls; a running subscription hands them
/// to the [`FixDelivery`] the source was built with.
pub trait LocationSource: Send + Sync + 'static {
    fn request_foreground_permission(&self) -> impl Future<Output = Permission> + Send;

    fn request_background_permission(&self) -> impl Future<Output = Permission> + Send;

    fn has_active_subscription(&self, task: &str) -> impl Future<Output = bool> + Send;

    fn start_subscription(
        &self,
        task: &str,
        options: SubscriptionOptions,
    ) -> impl Future<Output = Result<(), SourceError>> + Send;

    /// Requests cancellation. Fixes already in flight may still be delivered.
    fn stop_subscription(&self, task: &str) -> impl Future<Output = Result<(), SourceError>> + Send;
}

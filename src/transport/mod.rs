mod client;
mod error;
mod packet;

pub use client::SocketClient;

use crate::telemetry::LocationReport;

pub const UPDATE_LOCATION_EVENT: &str = "updateLocation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Queued,
    Dropped,
}

/// Egress for location reports. Sends are best effort: no acknowledgement,
/// no retry, nothing is held back while the link is down.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, report: &LocationReport) -> SendOutcome;

    fn is_connected(&self) -> bool;
}

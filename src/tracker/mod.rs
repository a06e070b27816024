mod controller;
mod error;
mod handler;
mod operator;

pub use controller::{TrackingController, TrackingMode};

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

impl Permission {
    pub fn granted_if(granted: bool) -> Self {
        if granted {
            Permission::Granted
        } else {
            Permission::Denied
        }
    }

    pub fn is_granted(self) -> bool {
        self == Permission::Granted
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    #[default]
    Highest,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubscriptionOptions {
    pub interval: Duration,
    pub accuracy: Accuracy,
    pub distance_filter_m: f64,
}

impl Default for SubscriptionOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            accuracy: Accuracy::Highest,
            distance_filter_m: 0.0,
        }
    }
}

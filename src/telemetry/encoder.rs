use chrono::{DateTime, FixedOffset, Utc};

use super::types::{Fix, LocationReport, OperatorId};

/// `en-IN` style: `18/10/2026, 3:04:05 pm`.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y, %-I:%M:%S %P";

/// Turns raw fixes into reports. The timestamp is rendered here, once, so the
/// network payload and the local display carry the same string.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    offset: FixedOffset,
}

impl Encoder {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn encode(
        &self,
        operator_id: &OperatorId,
        fix: &Fix,
        now: DateTime<Utc>,
    ) -> LocationReport {
        let captured_at = now
            .with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string();

        LocationReport::new(
            operator_id.clone(),
            fix.latitude,
            fix.longitude,
            fix.speed.unwrap_or(0.0),
            captured_at,
        )
    }
}

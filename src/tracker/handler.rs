use chrono::Utc;
use std::sync::{Arc, Mutex as StdMutex};

use super::operator::OperatorReader;
use crate::source::FixObserver;
use crate::telemetry::{Encoder, Fix, LocationReport, ReportLog};
use crate::transport::Transport;

/// Background side of tracking: turns fixes into reports and fans them out
/// to the transport and the display log. Fixes that arrive while no session
/// is active are discarded.
pub struct ReportHandler<T> {
    operator: OperatorReader,
    encoder: Encoder,
    transport: Arc<T>,
    log: Arc<StdMutex<ReportLog>>,
}

impl<T: Transport> ReportHandler<T> {
    pub fn new(
        operator: OperatorReader,
        encoder: Encoder,
        transport: Arc<T>,
        log: Arc<StdMutex<ReportLog>>,
    ) -> Self {
        Self {
            operator,
            encoder,
            transport,
            log,
        }
    }

    pub fn handle(&self, fix: Fix) -> Option<LocationReport> {
        let Some(operator_id) = self.operator.current() else {
            log::debug!("Tracking stopped, discarding late fix {:?}", fix);
            return None;
        };

        let report = self.encoder.encode(&operator_id, &fix, Utc::now());
        self.transport.send(&report);
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(report.clone());
        Some(report)
    }
}

impl<T: Transport> FixObserver for ReportHandler<T> {
    fn on_fix(&self, fix: Fix) {
        self.handle(fix);
    }
}

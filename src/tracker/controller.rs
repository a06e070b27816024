use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex;

use super::error::{PermissionError, TrackerError};
use super::handler::ReportHandler;
use super::operator::{operator_cell, OperatorWriter};
use crate::config::TrackingConfig;
use crate::source::{LocationSource, SubscriptionOptions};
use crate::telemetry::{DisplayRow, Encoder, LocationReport, OperatorId, ReportLog};
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq)]
pub enum TrackingMode {
    Idle,
    Tracking {
        operator_id: OperatorId,
        since: DateTime<Utc>,
    },
}

pub struct TrackingController<S, T> {
    source: Arc<S>,
    task_name: String,
    options: SubscriptionOptions,
    operator: OperatorWriter,
    mode: StdMutex<TrackingMode>,
    log: Arc<StdMutex<ReportLog>>,
    handler: Arc<ReportHandler<T>>,
    // Held for the whole of start() and stop().
    transition: Mutex<()>,
}

impl<S: LocationSource, T: Transport> TrackingController<S, T> {
    pub fn new(
        source: Arc<S>,
        transport: Arc<T>,
        encoder: Encoder,
        tracking: &TrackingConfig,
        capacity: usize,
    ) -> Self {
        let (operator, reader) = operator_cell();
        let log = Arc::new(StdMutex::new(ReportLog::with_capacity(capacity)));
        let handler = Arc::new(ReportHandler::new(reader, encoder, transport, log.clone()));

        Self {
            source,
            task_name: tracking.task_name.clone(),
            options: tracking.subscription_options(),
            operator,
            mode: StdMutex::new(TrackingMode::Idle),
            log,
            handler,
            transition: Mutex::new(()),
        }
    }

    /// The observer to register with the fix delivery path.
    pub fn handler(&self) -> Arc<ReportHandler<T>> {
        self.handler.clone()
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn reports(&self) -> Vec<LocationReport> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).snapshot()
    }

    pub fn rows(&self) -> Vec<DisplayRow> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).rows()
    }

    pub async fn start(&self, operator_id: &str) -> Result<(), TrackerError> {
        let operator_id = OperatorId::new(operator_id).ok_or(TrackerError::Validation)?;
        let _guard = self.transition.lock().await;

        if let TrackingMode::Tracking {
            operator_id: current,
            ..
        } = self.mode()
        {
            if current == operator_id {
                log::debug!("Already tracking {}", current);
                return Ok(());
            }
            return Err(TrackerError::AlreadyTracking(current));
        }

        if !self.source.request_foreground_permission().await.is_granted() {
            log::warn!("Foreground location permission denied");
            return Err(PermissionError::Foreground.into());
        }
        if !self.source.request_background_permission().await.is_granted() {
            log::warn!("Background location permission denied");
            return Err(PermissionError::Background.into());
        }

        self.operator.set(operator_id.clone());

        if self.source.has_active_subscription(&self.task_name).await {
            log::info!(
                "Subscription {} already active, leaving it running",
                self.task_name
            );
        } else if let Err(e) = self
            .source
            .start_subscription(&self.task_name, self.options)
            .await
        {
            self.operator.clear();
            return Err(e.into());
        }

        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = TrackingMode::Tracking {
            operator_id: operator_id.clone(),
            since: Utc::now(),
        };
        log::info!("Tracking started for {}", operator_id);
        Ok(())
    }

    pub async fn stop(&self) {
        let _guard = self.transition.lock().await;

        // Cleared first so fixes still in flight are discarded.
        let previous = self.operator.clear();

        if self.source.has_active_subscription(&self.task_name).await {
            if let Err(e) = self.source.stop_subscription(&self.task_name).await {
                log::error!("Failed to stop subscription {}: {}", self.task_name, e);
            }
        }

        *self.mode.lock().unwrap_or_else(|e| e.into_inner()) = TrackingMode::Idle;
        match previous {
            Some(id) => log::info!("Tracking stopped for {}", id),
            None => log::debug!("Stop requested while idle"),
        }
    }
}

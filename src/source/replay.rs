use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::delivery::FixDelivery;
use super::error::SourceError;
use super::types::{Permission, SubscriptionOptions};
use super::LocationSource;
use crate::telemetry::Fix;

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

/// Location source that plays back a fixed list of fixes at the subscription
/// interval. Used for headless runs where no device API is present.
pub struct ReplaySource {
    fixes: Arc<Vec<Fix>>,
    foreground: Permission,
    background: Permission,
    delivery: FixDelivery,
    workers: StdMutex<HashMap<String, WorkerHandle>>,
    exhausted: Arc<Notify>,
}

impl ReplaySource {
    pub fn new(fixes: Vec<Fix>, delivery: FixDelivery) -> Self {
        Self {
            fixes: Arc::new(fixes),
            foreground: Permission::Granted,
            background: Permission::Granted,
            delivery,
            workers: StdMutex::new(HashMap::new()),
            exhausted: Arc::new(Notify::new()),
        }
    }

    /// Reads a YAML sequence of `{latitude, longitude, speed?}` entries.
    pub fn from_file(path: &str, delivery: FixDelivery) -> Result<Self, SourceError> {
        let content = std::fs::read_to_string(path)?;
        let fixes: Vec<Fix> = serde_yaml::from_str(&content)?;
        log::info!("Loaded {} fixes from {}", fixes.len(), path);
        Ok(Self::new(fixes, delivery))
    }

    /// Answers the permission requests with these values instead of granting.
    pub fn with_permissions(mut self, foreground: Permission, background: Permission) -> Self {
        self.foreground = foreground;
        self.background = background;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Resolves once a subscription has played back every fix.
    pub async fn exhausted(&self) {
        self.exhausted.notified().await
    }
}

impl LocationSource for ReplaySource {
    async fn request_foreground_permission(&self) -> Permission {
        self.foreground
    }

    async fn request_background_permission(&self) -> Permission {
        self.background
    }

    async fn has_active_subscription(&self, task: &str) -> bool {
        let workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        workers
            .get(task)
            .map(|w| !w.join.is_finished())
            .unwrap_or(false)
    }

    async fn start_subscription(
        &self,
        task: &str,
        options: SubscriptionOptions,
    ) -> Result<(), SourceError> {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = workers.get(task) {
            if !existing.join.is_finished() {
                return Err(SourceError::Platform(format!(
                    "task {} already has an active subscription",
                    task
                )));
            }
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        let join = tokio::spawn(run_replay(
            self.fixes.clone(),
            self.delivery.clone(),
            options,
            stop_rx,
            self.exhausted.clone(),
        ));
        log::info!(
            "Replay subscription {} started (interval {:?}, accuracy {})",
            task,
            options.interval,
            options.accuracy
        );
        workers.insert(task.to_string(), WorkerHandle { stop_tx, join });
        Ok(())
    }

    async fn stop_subscription(&self, task: &str) -> Result<(), SourceError> {
        let worker = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(task);
        if let Some(worker) = worker {
            let _ = worker.stop_tx.send(());
            log::info!("Replay subscription {} stopped", task);
        }
        Ok(())
    }
}

async fn run_replay(
    fixes: Arc<Vec<Fix>>,
    delivery: FixDelivery,
    options: SubscriptionOptions,
    mut stop_rx: oneshot::Receiver<()>,
    exhausted: Arc<Notify>,
) {
    let mut ticker = interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    for fix in fixes.iter() {
        let should_stop = tokio::select! {
            _ = ticker.tick() => false,
            _ = &mut stop_rx => true,
        };
        if should_stop {
            return;
        }
        delivery.deliver(Ok(vec![*fix]));
    }

    log::info!("Replay finished after {} fixes", fixes.len());
    exhausted.notify_one();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FixObserver;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(StdMutex<Vec<Fix>>);

    impl FixObserver for Collect {
        fn on_fix(&self, fix: Fix) {
            self.0.lock().unwrap().push(fix);
        }
    }

    fn options() -> SubscriptionOptions {
        SubscriptionOptions {
            interval: Duration::from_millis(1),
            ..SubscriptionOptions::default()
        }
    }

    #[tokio::test]
    async fn plays_back_all_fixes_in_order() {
        let delivery = FixDelivery::new();
        let collect = Arc::new(Collect::default());
        delivery.register(collect.clone());

        let fixes = vec![
            Fix::new(1.0, 1.0, None),
            Fix::new(2.0, 2.0, Some(3.0)),
            Fix::new(3.0, 3.0, None),
        ];
        let source = ReplaySource::new(fixes.clone(), delivery);
        source.start_subscription("task", options()).await.unwrap();
        source.exhausted().await;

        assert_eq!(*collect.0.lock().unwrap(), fixes);
        assert!(!source.has_active_subscription("task").await);
    }

    #[tokio::test]
    async fn stop_cancels_subscription() {
        let delivery = FixDelivery::new();
        let fixes = vec![Fix::new(1.0, 1.0, None); 1000];
        let source = ReplaySource::new(fixes, delivery);
        source.start_subscription("task", options()).await.unwrap();
        assert!(source.has_active_subscription("task").await);

        source.stop_subscription("task").await.unwrap();
        assert!(!source.has_active_subscription("task").await);
        source.stop_subscription("task").await.unwrap();
    }

    #[tokio::test]
    async fn refuses_duplicate_subscription() {
        let source = ReplaySource::new(vec![Fix::new(1.0, 1.0, None); 1000], FixDelivery::new());
        source.start_subscription("task", options()).await.unwrap();
        let err = source.start_subscription("task", options()).await.unwrap_err();
        assert!(matches!(err, SourceError::Platform(_)));
        source.stop_subscription("task").await.unwrap();
    }

    #[tokio::test]
    async fn answers_configured_permissions() {
        let source = ReplaySource::new(Vec::new(), FixDelivery::new());
        assert!(source.request_foreground_permission().await.is_granted());
        assert!(source.request_background_permission().await.is_granted());

        let source = source.with_permissions(
            Permission::granted_if(true),
            Permission::granted_if(false),
        );
        assert_eq!(source.request_foreground_permission().await, Permission::Granted);
        assert_eq!(source.request_background_permission().await, Permission::Denied);
    }

    #[test]
    fn parses_fix_file() {
        let yaml = "- {latitude: 12.9, longitude: 77.6, speed: 10}\n- {latitude: 13.0, longitude: 77.7}\n";
        let fixes: Vec<Fix> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(fixes[0], Fix::new(12.9, 77.6, Some(10.0)));
        assert_eq!(fixes[1].speed, None);
    }
}

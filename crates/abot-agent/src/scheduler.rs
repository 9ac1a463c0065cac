// SPDX-FileCopyrightText: 2026 Abot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of scheduled events.
//!
//! A ticker wakes every `interval_secs`, loads the due events and hands
//! them to a single send worker over a bounded channel. An event is marked
//! sent only after the SMS driver accepted it, so failures are retried on
//! the next tick.

use std::sync::Arc;
use std::time::Duration;

use abot_config::model::SchedulerConfig;
use abot_core::{AbotError, FlexId, ScheduledEvent, SmsSender};
use abot_storage::Database;
use abot_storage::queries::scheduled;
use chrono::NaiveDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outcome of delivering one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// Already sent by an earlier pass.
    AlreadySent,
    /// Left unsent; retried next tick.
    Deferred,
    /// Cannot be delivered by this process; left unsent.
    Undeliverable,
}

/// Counts from one [`Scheduler::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub due: usize,
    pub sent: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Scheduler {
    db: Database,
    sms: Option<Arc<dyn SmsSender>>,
    interval: Duration,
    capacity: usize,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("capacity", &self.capacity)
            .field("sms", &self.sms.is_some())
            .finish()
    }
}

impl Scheduler {
    pub fn new(db: Database, sms: Option<Arc<dyn SmsSender>>, config: &SchedulerConfig) -> Self {
        Self {
            db,
            sms,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            capacity: config.queue_capacity.max(1),
        }
    }

    /// Deliver everything due at `now`, in order.
    pub async fn tick(&self, now: NaiveDateTime) -> Result<TickReport, AbotError> {
        let events = scheduled::due_events(&self.db, now).await?;
        let mut report = TickReport {
            due: events.len(),
            ..Default::default()
        };
        for event in &events {
            match self.deliver(event).await {
                Delivery::Sent => report.sent += 1,
                _ => report.skipped += 1,
            }
        }
        Ok(report)
    }

    /// Send one event. Never fails: problems are logged and the event stays
    /// unsent.
    pub async fn deliver(&self, event: &ScheduledEvent) -> Delivery {
        // The ticker may queue an event again before the worker got to it.
        match scheduled::get_event(&self.db, event.id).await {
            Ok(Some(current)) if current.sent => return Delivery::AlreadySent,
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(id = event.id, "scheduled event vanished");
                return Delivery::Undeliverable;
            }
            Err(e) => {
                warn!(id = event.id, error = %e, "failed to re-read scheduled event");
                return Delivery::Deferred;
            }
        }

        let to = match event.flex_id() {
            Ok(FlexId::Phone(number)) => number,
            Ok(other) => {
                warn!(
                    id = event.id,
                    kind = ?other.kind(),
                    "no driver for scheduled event, leaving unsent"
                );
                return Delivery::Undeliverable;
            }
            Err(e) => {
                warn!(id = event.id, error = %e, "malformed scheduled event");
                return Delivery::Undeliverable;
            }
        };
        let Some(sms) = &self.sms else {
            warn!(id = event.id, "no SMS driver configured, leaving scheduled event unsent");
            return Delivery::Undeliverable;
        };

        if let Err(e) = sms.send(&to, &event.content).await {
            warn!(id = event.id, error = %e, "scheduled send failed, will retry");
            return Delivery::Deferred;
        }
        match scheduled::mark_sent(&self.db, event.id).await {
            Ok(_) => {
                debug!(id = event.id, plugin = %event.plugin, "scheduled event sent");
                Delivery::Sent
            }
            Err(e) => {
                error!(id = event.id, error = %e, "sent but failed to mark scheduled event");
                Delivery::Sent
            }
        }
    }

    /// Start the ticker and the send worker. Both stop when `shutdown` is
    /// cancelled; the returned handle completes once they have.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::channel::<ScheduledEvent>(self.capacity);
        let worker = self.clone();
        let worker_cancel = shutdown.clone();

        let worker_task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some(event) = event else { break };
                        worker.deliver(&event).await;
                    }
                    _ = worker_cancel.cancelled() => break,
                }
            }
            debug!("scheduled send worker stopped");
        });

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            // Skip the first immediate tick.
            interval.tick().await;
            info!(interval_secs = self.interval.as_secs(), "scheduler started");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let now = chrono::Local::now().naive_local();
                        match scheduled::due_events(&self.db, now).await {
                            Ok(events) => {
                                for event in events {
                                    if tx.send(event).await.is_err() {
                                        break;
                                    }
                                }
                            }
                            Err(e) => warn!(error = %e, "failed to load due events (non-fatal)"),
                        }
                    }
                    _ = shutdown.cancelled() => {
                        info!("scheduler shutting down");
                        break;
                    }
                }
            }
            drop(tx);
            let _ = worker_task.await;
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abot_core::{AdapterType, HealthStatus, PluginAdapter};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingSms {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PluginAdapter for RecordingSms {
        fn name(&self) -> &str {
            "recording"
        }

        fn version(&self) -> semver::Version {
            semver::Version::new(0, 1, 0)
        }

        fn adapter_type(&self) -> AdapterType {
            AdapterType::Sms
        }

        async fn health_check(&self) -> Result<HealthStatus, AbotError> {
            Ok(HealthStatus::Healthy)
        }

        async fn shutdown(&self) -> Result<(), AbotError> {
            Ok(())
        }
    }

    #[async_trait]
    impl SmsSender for RecordingSms {
        async fn send(&self, to: &str, body: &str) -> Result<(), AbotError> {
            if self.fail {
                return Err(AbotError::Channel {
                    message: "provider down".into(),
                    source: None,
                });
            }
            self.sent.lock().await.push((to.into(), body.into()));
            Ok(())
        }
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    async fn db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(dir.path().join("t.db").to_str().unwrap())
            .await
            .unwrap();
        (dir, db)
    }

    fn scheduler(db: &Database, sms: Option<Arc<RecordingSms>>) -> Scheduler {
        Scheduler::new(
            db.clone(),
            sms.map(|s| s as Arc<dyn SmsSender>),
            &SchedulerConfig::default(),
        )
    }

    fn phone() -> FlexId {
        FlexId::Phone("+13105550123".into())
    }

    #[tokio::test]
    async fn due_events_are_sent_once() {
        let (_dir, db) = db().await;
        let sms = Arc::new(RecordingSms::default());
        let id = scheduled::schedule_event(&db, "Reminder", &phone(), at(9, 0), "reminder")
            .await
            .unwrap();
        scheduled::schedule_event(&db, "Later", &phone(), at(18, 0), "reminder")
            .await
            .unwrap();

        let s = scheduler(&db, Some(sms.clone()));
        let report = s.tick(at(9, 5)).await.unwrap();
        assert_eq!(report, TickReport { due: 1, sent: 1, skipped: 0 });
        assert!(scheduled::get_event(&db, id).await.unwrap().unwrap().sent);

        let report = s.tick(at(9, 10)).await.unwrap();
        assert_eq!(report.due, 0);
        assert_eq!(
            *sms.sent.lock().await,
            vec![("+13105550123".to_string(), "Reminder".to_string())]
        );
    }

    #[tokio::test]
    async fn failed_sends_stay_unsent() {
        let (_dir, db) = db().await;
        let sms = Arc::new(RecordingSms {
            fail: true,
            ..Default::default()
        });
        let id = scheduled::schedule_event(&db, "Reminder", &phone(), at(9, 0), "reminder")
            .await
            .unwrap();
        let report = scheduler(&db, Some(sms)).tick(at(9, 5)).await.unwrap();
        assert_eq!(report.sent, 0);
        assert!(!scheduled::get_event(&db, id).await.unwrap().unwrap().sent);
    }

    #[tokio::test]
    async fn non_phone_events_are_left_alone() {
        let (_dir, db) = db().await;
        let sms = Arc::new(RecordingSms::default());
        let email = FlexId::Email("ann@example.com".into());
        let id = scheduled::schedule_event(&db, "Reminder", &email, at(9, 0), "reminder")
            .await
            .unwrap();
        let report = scheduler(&db, Some(sms.clone())).tick(at(9, 5)).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert!(sms.sent.lock().await.is_empty());
        assert!(!scheduled::get_event(&db, id).await.unwrap().unwrap().sent);
    }

    #[tokio::test]
    async fn without_sms_driver_nothing_is_sent() {
        let (_dir, db) = db().await;
        let id = scheduled::schedule_event(&db, "Reminder", &phone(), at(9, 0), "reminder")
            .await
            .unwrap();
        let s = scheduler(&db, None);
        let event = scheduled::get_event(&db, id).await.unwrap().unwrap();
        assert_eq!(s.deliver(&event).await, Delivery::Undeliverable);
        assert!(!scheduled::get_event(&db, id).await.unwrap().unwrap().sent);
    }

    #[tokio::test]
    async fn stale_copies_are_not_resent() {
        let (_dir, db) = db().await;
        let sms = Arc::new(RecordingSms::default());
        let id = scheduled::schedule_event(&db, "Reminder", &phone(), at(9, 0), "reminder")
            .await
            .unwrap();
        let event = scheduled::get_event(&db, id).await.unwrap().unwrap();
        let s = scheduler(&db, Some(sms.clone()));
        assert_eq!(s.deliver(&event).await, Delivery::Sent);
        assert_eq!(s.deliver(&event).await, Delivery::AlreadySent);
        assert_eq!(sms.sent.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn spawned_loop_stops_on_cancel() {
        let (_dir, db) = db().await;
        let token = CancellationToken::new();
        let handle = scheduler(&db, None).spawn(token.clone());
        token.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}

//! Scheduler task execution for time-based triggers.
//!
//! This module provides the background task that evaluates schedule rules and
//! fires their actions (feed checks, digest sends) when a rule's minute
//! arrives.
//!
//! # Features
//!
//! - Minute-level rule evaluation
//! - Edge-triggered firing (each rule fires at most once per minute)
//! - Graceful shutdown handling
//!
//! # Example
//!
//! ```no_run
//! use podbrief::{PodBrief, config::Config};
//! use podbrief::scheduler::Scheduler;
//! use podbrief::scheduler_task::SchedulerTask;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let rules = config.persistence.schedule_rules.clone();
//! let service = Arc::new(PodBrief::new(config).await?);
//! let scheduler = Arc::new(Scheduler::new(rules));
//!
//! let task = SchedulerTask::new(service.clone(), scheduler);
//!
//! // Run scheduler task (blocks until shutdown)
//! tokio::spawn(async move {
//!     task.run().await;
//! });
//! # Ok(())
//! # }
//! ```

use crate::error::Error;
use crate::scheduler::{ScheduleAction, Scheduler};
use crate::service::PodBrief;
use chrono::Local;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

/// Scheduler task that periodically checks schedule rules and fires actions
///
/// The task evaluates the rules several times per minute but dedups fires by
/// minute, so a rule fires exactly once when its time arrives even if a slow
/// tick lands twice in the same minute.
pub struct SchedulerTask {
    /// Reference to the scheduler for rule evaluation
    scheduler: Arc<Scheduler>,

    /// Reference to the service for firing actions and checking shutdown status
    service: Arc<PodBrief>,
}

impl SchedulerTask {
    /// Creates a new scheduler task
    pub fn new(service: Arc<PodBrief>, scheduler: Arc<Scheduler>) -> Self {
        Self { scheduler, service }
    }

    /// Starts the scheduler task
    ///
    /// This runs in a loop evaluating schedule rules. The task will:
    /// 1. Check if shutdown was requested
    /// 2. Get the current time and collect due actions
    /// 3. Fire each due action, unless already fired this minute
    /// 4. Sleep for 20 seconds before the next check
    ///
    /// Checking a few times per minute means a tick delayed past the minute
    /// boundary cannot skip a fire; the minute key prevents double fires.
    pub async fn run(self) {
        info!("Scheduler task started");

        let mut last_fired_minute: Option<String> = None;

        loop {
            if !self.service.is_running() {
                info!("Scheduler task shutting down");
                break;
            }

            let now = Local::now();
            let minute_key = now.format("%Y-%m-%d %H:%M").to_string();

            if last_fired_minute.as_deref() != Some(&minute_key) {
                let due = self.scheduler.due_actions(now);
                if !due.is_empty() {
                    last_fired_minute = Some(minute_key);
                    for action in due {
                        self.fire_action(action).await;
                    }
                }
            }

            sleep(Duration::from_secs(20)).await;
        }

        info!("Scheduler task stopped");
    }

    /// Fire a schedule action
    ///
    /// Failures are logged and swallowed; the next scheduled fire tries again.
    async fn fire_action(&self, action: ScheduleAction) {
        match action {
            ScheduleAction::CheckFeeds => {
                info!("Scheduled feed check firing");
                match self.service.check_all_feeds_now().await {
                    Ok(report) => {
                        debug!(
                            discovered = report.episodes_discovered,
                            annotated = report.episodes_annotated,
                            "Scheduled feed check complete"
                        );
                    }
                    Err(Error::CycleInProgress) => {
                        debug!("Cycle already in progress, skipping scheduled feed check");
                    }
                    Err(e) => {
                        warn!(error = %e, "Scheduled feed check failed");
                    }
                }
            }
            ScheduleAction::SendDigest => {
                info!("Scheduled digest firing");
                if let Err(e) = self.service.send_digest_now().await {
                    warn!(error = %e, "Scheduled digest failed");
                }
            }
        }
    }
}

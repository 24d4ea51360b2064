//! Background service starters — feed poller and time-based scheduler.

use crate::poller;
use crate::scheduler;
use crate::scheduler_task;

use super::PodBrief;

impl PodBrief {
    /// Start the per-feed interval poller
    ///
    /// Each enabled podcast is checked on its own `check_interval`. The task
    /// exits when shutdown begins.
    pub fn start_poller(&self) -> tokio::task::JoinHandle<()> {
        let poller = poller::FeedPoller::new(std::sync::Arc::new(self.clone()));

        let handle = tokio::spawn(async move {
            poller.run().await;
        });

        tracing::info!("Feed poller background task started");

        handle
    }

    /// Start the scheduler task that evaluates schedule rules every minute
    ///
    /// An empty rule list still gets the built-in daily digest rule, so this
    /// always spawns a task.
    pub fn start_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let rules = self.config.persistence.schedule_rules.clone();
        let scheduler = std::sync::Arc::new(scheduler::Scheduler::new(rules));

        let task =
            scheduler_task::SchedulerTask::new(std::sync::Arc::new(self.clone()), scheduler);

        let handle = tokio::spawn(async move {
            task.run().await;
        });

        tracing::info!("Scheduler task started, checking rules every minute");

        handle
    }

    /// Start all background tasks
    pub fn start_background_tasks(&self) -> Vec<tokio::task::JoinHandle<()>> {
        vec![self.start_poller(), self.start_scheduler()]
    }
}

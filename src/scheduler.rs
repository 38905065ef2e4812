use chrono::Utc;
use cron::Schedule;
use futures::future::BoxFuture;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::services::{MailService, ServiceError};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

type Task = Arc<dyn Fn() -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync>;

/// A named task fired on a six-field (seconds first) cron schedule, evaluated in UTC
pub struct ScheduledJob {
    name: &'static str,
    schedule: Schedule,
    task: Task,
}

impl ScheduledJob {
    pub fn new<F>(name: &'static str, expression: &str, task: F) -> Result<Self, SchedulerError>
    where
        F: Fn() -> BoxFuture<'static, Result<(), ServiceError>> + Send + Sync + 'static,
    {
        let schedule = Schedule::from_str(expression).map_err(|e| SchedulerError::InvalidSchedule {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            schedule,
            task: Arc::new(task),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn next_run(&self) -> Option<chrono::DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Runs the job forever on its schedule. A failed run is logged and the
    /// next occurrence still fires; runs never overlap.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(next) = self.next_run() {
                info!("job {} next runs at {}", self.name, next);
                let wait = (next - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                info!("job {} starting", self.name);
                if let Err(e) = (self.task)().await {
                    error!("job {} failed: {}", self.name, e);
                }
            }
            info!("job {} has no upcoming runs, stopping", self.name);
        })
    }
}

pub fn mail_digest_job(mail: MailService, expression: &str) -> Result<ScheduledJob, SchedulerError> {
    ScheduledJob::new("mail-digest", expression, move || {
        let mail = mail.clone();
        Box::pin(async move { mail.send_digest().await.map(|_| ()) })
    })
}

/// Scheduler Service
/// Runs periodic maintenance on a cron schedule: expired sessions are pruned
/// and projects left in the trash past the retention window are purged
use crate::database::Repository;
use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

/// Maintenance frequency options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Minutes(u32),
    Hours(u32),
    Days(u32),
}

impl Frequency {
    /// Convert frequency to cron expression
    pub fn to_cron(self) -> String {
        match self {
            Frequency::Minutes(1) => "0 * * * * *".to_string(),
            Frequency::Minutes(m) => format!("0 */{} * * * *", m),
            Frequency::Hours(1) => "0 0 * * * *".to_string(),
            Frequency::Hours(h) => format!("0 0 */{} * * *", h),
            Frequency::Days(1) => "0 30 3 * * *".to_string(), // Daily at 03:30
            Frequency::Days(d) => format!("0 30 3 */{} * *", d),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        // "30m", "6h", "2d" or the named "daily", "weekly", "monthly"
        let s = s.trim().to_lowercase();

        match s.as_str() {
            "daily" => return Ok(Frequency::Days(1)),
            "weekly" => return Ok(Frequency::Days(7)),
            "monthly" => return Ok(Frequency::Days(30)),
            _ => {}
        }

        let Some(unit) = s.chars().last() else {
            return Err("Empty frequency string".to_string());
        };
        let number_part = &s[..s.len() - unit.len_utf8()];

        let value: u32 = number_part
            .parse()
            .map_err(|_| format!("Invalid number in frequency: {}", s))?;

        if value == 0 {
            return Err("Frequency value must be greater than 0".to_string());
        }

        match unit {
            'm' => Ok(Frequency::Minutes(value)),
            'h' => Ok(Frequency::Hours(value)),
            'd' => Ok(Frequency::Days(value)),
            _ => Err(format!(
                "Invalid frequency unit '{}'. Use 'm' (minutes), 'h' (hours), or 'd' (days)",
                unit
            )),
        }
    }
}

/// What a maintenance run removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaintenanceReport {
    pub expired_sessions: u64,
    pub purged_projects: u64,
}

/// One maintenance pass over the database
#[derive(Clone)]
pub struct MaintenanceTask {
    repo: Repository,
    project_retention: Duration,
}

impl MaintenanceTask {
    pub fn new(repo: Repository, project_retention_days: i64) -> Self {
        Self {
            repo,
            project_retention: Duration::days(project_retention_days),
        }
    }

    pub async fn run_once(&self) -> Result<MaintenanceReport> {
        let now = Utc::now();

        let expired_sessions = self.repo.delete_expired_sessions(now).await?;
        let purged_projects = self
            .repo
            .purge_deleted_projects(now - self.project_retention)
            .await?;

        Ok(MaintenanceReport {
            expired_sessions,
            purged_projects,
        })
    }
}

/// Scheduler service for periodic maintenance
pub struct SchedulerService {
    scheduler: Arc<RwLock<JobScheduler>>,
    task: MaintenanceTask,
    current_job_id: Arc<RwLock<Option<Uuid>>>,
}

impl SchedulerService {
    /// Create new scheduler service
    pub async fn new(task: MaintenanceTask) -> Result<Self> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self {
            scheduler: Arc::new(RwLock::new(scheduler)),
            task,
            current_job_id: Arc::new(RwLock::new(None)),
        })
    }

    /// Start the scheduler
    pub async fn start(&self) -> Result<()> {
        let scheduler = self.scheduler.read().await;
        scheduler
            .start()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to start scheduler: {}", e)))?;
        tracing::info!("Maintenance scheduler started");
        Ok(())
    }

    /// Schedule maintenance, replacing any previous schedule
    pub async fn schedule_maintenance(&self, frequency: Frequency) -> Result<()> {
        self.cancel_maintenance().await?;

        let cron_expr = frequency.to_cron();
        let task = self.task.clone();

        let job = Job::new_async(cron_expr.clone(), move |_uuid, _l| {
            let task = task.clone();
            Box::pin(async move {
                tracing::info!("Running scheduled maintenance");

                match task.run_once().await {
                    Ok(report) => tracing::info!(
                        "Maintenance finished: {} expired sessions, {} purged projects",
                        report.expired_sessions,
                        report.purged_projects
                    ),
                    Err(e) => tracing::error!("Maintenance failed: {}", e),
                }
            })
        })
        .map_err(|e| AppError::Scheduler(format!("Failed to create maintenance job: {}", e)))?;

        let job_id = job.guid();

        let scheduler = self.scheduler.write().await;
        scheduler
            .add(job)
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to schedule job: {}", e)))?;

        let mut current_job = self.current_job_id.write().await;
        *current_job = Some(job_id);

        tracing::info!("Maintenance scheduled: {:?} ({})", frequency, cron_expr);
        Ok(())
    }

    /// Cancel scheduled maintenance
    pub async fn cancel_maintenance(&self) -> Result<()> {
        let mut current_job = self.current_job_id.write().await;

        if let Some(job_id) = *current_job {
            let scheduler = self.scheduler.write().await;
            scheduler
                .remove(&job_id)
                .await
                .map_err(|e| AppError::Scheduler(format!("Failed to remove job: {}", e)))?;

            *current_job = None;
            tracing::info!("Maintenance schedule cancelled");
        }

        Ok(())
    }

    pub async fn is_scheduled(&self) -> bool {
        self.current_job_id.read().await.is_some()
    }

    /// Shutdown scheduler gracefully
    pub async fn shutdown(&self) -> Result<()> {
        let mut scheduler = self.scheduler.write().await;
        scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::Scheduler(format!("Failed to shutdown scheduler: {}", e)))?;
        tracing::info!("Maintenance scheduler shutdown");
        Ok(())
    }
}

//! Cron-style job scheduler using tokio-cron-scheduler.

#[cfg(feature = "scheduler")]
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

#[cfg(feature = "scheduler")]
use crate::state::AppState;

/// Scheduler configuration. Expressions use the six-field form with seconds.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
    pub moderation_cron: String,
    pub scheduled_publish_cron: String,
    pub feed_heater_cron: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            moderation_cron: "0 0 * * * *".to_string(),
            scheduled_publish_cron: "0 * * * * *".to_string(),
            feed_heater_cron: "0 0 3 * * *".to_string(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.enabled),
            moderation_cron: std::env::var("MODERATION_CRON").unwrap_or(defaults.moderation_cron),
            scheduled_publish_cron: std::env::var("SCHEDULED_PUBLISH_CRON")
                .unwrap_or(defaults.scheduled_publish_cron),
            feed_heater_cron: std::env::var("FEED_HEATER_CRON").unwrap_or(defaults.feed_heater_cron),
        }
    }
}

/// Cron job scheduler wrapper.
#[cfg(feature = "scheduler")]
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

#[cfg(feature = "scheduler")]
impl Scheduler {
    /// Create a new scheduler.
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    /// Add a cron job.
    pub async fn add_cron<F, Fut>(
        &self,
        name: &'static str,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                tracing::debug!(job = name, "Cron job fired");
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(job = name, schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    /// Start the scheduler.
    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    /// Stop the scheduler.
    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Register the moderation sweep, scheduled publishing and feed heater jobs.
#[cfg(feature = "scheduler")]
pub async fn register_jobs(scheduler: &Scheduler, state: &AppState) -> Result<(), JobSchedulerError> {
    let config = scheduler.config.clone();

    let pipeline = state.pipeline.clone();
    let comments = state.comments.clone();
    scheduler
        .add_cron("moderation", &config.moderation_cron, move || {
            let pipeline = pipeline.clone();
            let comments = comments.clone();
            async move {
                pipeline.do_moderation().await;
                comments.do_moderation().await;
            }
        })
        .await?;

    let pipeline = state.pipeline.clone();
    scheduler
        .add_cron("scheduled_publish", &config.scheduled_publish_cron, move || {
            let pipeline = pipeline.clone();
            async move {
                match pipeline.publish_scheduled().await {
                    Ok(0) => {}
                    Ok(published) => tracing::info!(published, "Scheduled posts published"),
                    Err(e) => tracing::error!(error = %e, "Scheduled publishing failed"),
                }
            }
        })
        .await?;

    let heater = state.heater.clone();
    scheduler
        .add_cron("feed_heater", &config.feed_heater_cron, move || {
            let heater = heater.clone();
            async move {
                if let Err(e) = heater.trigger().await {
                    tracing::error!(error = %e, "Feed heater not queued");
                }
            }
        })
        .await?;

    Ok(())
}

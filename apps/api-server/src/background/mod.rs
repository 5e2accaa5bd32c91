//! Background processing - cron jobs driving the periodic pipeline work.

mod scheduler;

pub use scheduler::SchedulerConfig;
#[cfg(feature = "scheduler")]
pub use scheduler::{Scheduler, register_jobs};

//! Scheduling infrastructure for automated task execution
//!
//! This module provides the cron-based scheduler for background jobs:
//! - Daily goal materialization (population-wide batch)
//! - Recommendation generation
//! - Storage maintenance (health check, cleanup, recovery)
//!
//! All jobs run under the [`JobRegistry`] guard: per-kind single-flight and
//! a minimum re-run spacing window, so concurrent trigger sources (cron
//! ticks, startup pass, manual calls) never run the same job twice at once.

pub mod error;
pub mod jobs;
pub mod registry;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use jobs::JobContext;
pub use registry::{JobLease, JobRegistry, SkipReason};
pub use scheduler::{GoalScheduler, GoalSchedulerConfig};

//! Job run-state registry
//!
//! The single serialization point for scheduler bookkeeping. Every trigger
//! source (cron tick, startup pass, manual call) must acquire a lease via
//! [`JobRegistry::try_begin`] before executing a job body; the lease releases
//! the running flag and stamps the completion time on drop, on success and
//! error alike.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use macroplan_domain::{JobKind, JobStatus};
use parking_lot::Mutex;

const ALL_KINDS: [JobKind; 3] =
    [JobKind::DailyGoals, JobKind::Recommendations, JobKind::Maintenance];

#[derive(Debug, Default, Clone, Copy)]
struct KindState {
    running: bool,
    last_completed: Option<i64>,
}

/// Why a job trigger was refused. Refusals are logged skips, never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The same job kind is currently running
    Overlap,
    /// The job completed too recently
    TooSoon { remaining_secs: u64 },
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Overlap => write!(f, "already running"),
            Self::TooSoon { remaining_secs } => {
                write!(f, "ran too recently ({remaining_secs}s until eligible)")
            }
        }
    }
}

/// Per-kind single-flight guard with minimum re-run spacing.
///
/// Cheap to clone; clones share the same underlying state.
#[derive(Clone)]
pub struct JobRegistry {
    min_spacing: Duration,
    inner: Arc<Mutex<HashMap<JobKind, KindState>>>,
}

impl JobRegistry {
    /// Create a registry with the given minimum spacing between runs of the
    /// same job kind.
    pub fn new(min_spacing: Duration) -> Self {
        Self { min_spacing, inner: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Atomically transition a job kind from idle to running.
    ///
    /// Fails with [`SkipReason::Overlap`] when the kind is already running
    /// and with [`SkipReason::TooSoon`] when it completed inside the spacing
    /// window. Distinct kinds never block each other.
    pub fn try_begin(&self, kind: JobKind) -> Result<JobLease, SkipReason> {
        let mut inner = self.inner.lock();
        let state = inner.entry(kind).or_default();

        if state.running {
            return Err(SkipReason::Overlap);
        }

        if let Some(last) = state.last_completed {
            let elapsed = Utc::now().timestamp().saturating_sub(last);
            let min = self.min_spacing.as_secs() as i64;
            if elapsed < min {
                return Err(SkipReason::TooSoon { remaining_secs: (min - elapsed) as u64 });
            }
        }

        state.running = true;
        Ok(JobLease { registry: self.clone(), kind })
    }

    /// Read-only snapshot of every job kind's run state.
    pub fn snapshot(&self) -> Vec<JobStatus> {
        let inner = self.inner.lock();
        ALL_KINDS
            .iter()
            .map(|kind| {
                let state = inner.get(kind).copied().unwrap_or_default();
                JobStatus {
                    kind: *kind,
                    running: state.running,
                    last_completed: state.last_completed,
                }
            })
            .collect()
    }

    fn finish(&self, kind: JobKind) {
        let mut inner = self.inner.lock();
        let state = inner.entry(kind).or_default();
        state.running = false;
        state.last_completed = Some(Utc::now().timestamp());
    }
}

/// Lease held for the duration of one job execution.
///
/// Dropping the lease transitions the kind back to idle unconditionally.
pub struct JobLease {
    registry: JobRegistry,
    kind: JobKind,
}

impl Drop for JobLease {
    fn drop(&mut self) {
        self.registry.finish(self.kind);
    }
}

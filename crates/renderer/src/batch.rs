//! Batch generation.
//!
//! Renders many (request, theme) jobs on a bounded pool of tokio tasks. All
//! jobs share one compositor, so the second theme for a city is served from
//! the content cache. The cancel flag is checked before each job is
//! submitted; jobs already running complete.

use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use poster_common::request::output_filename;
use poster_common::{OutputNaming, PosterError, PosterRequest, Theme};

use crate::compositor::PosterCompositor;

/// Cooperative cancellation shared between a runner and whoever stops it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag before starting a new batch.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// One poster to render. The runner fills in `request.output_path`.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub request: PosterRequest,
    pub theme_id: String,
    pub theme: Theme,
}

impl BatchJob {
    pub fn new(request: PosterRequest, theme_id: impl Into<String>, theme: Theme) -> Self {
        Self {
            request,
            theme_id: theme_id.into(),
            theme,
        }
    }
}

#[derive(Debug)]
pub enum JobOutcome {
    Completed {
        theme: String,
        path: PathBuf,
        duration: Duration,
    },
    Failed {
        theme: String,
        error: PosterError,
    },
    Skipped {
        theme: String,
    },
}

impl JobOutcome {
    pub fn theme(&self) -> &str {
        match self {
            JobOutcome::Completed { theme, .. }
            | JobOutcome::Failed { theme, .. }
            | JobOutcome::Skipped { theme } => theme,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, JobOutcome::Completed { .. })
    }
}

/// Outcome counts for logging and exit codes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn of(outcomes: &[JobOutcome]) -> Self {
        outcomes.iter().fold(Self::default(), |mut s, o| {
            match o {
                JobOutcome::Completed { .. } => s.completed += 1,
                JobOutcome::Failed { .. } => s.failed += 1,
                JobOutcome::Skipped { .. } => s.skipped += 1,
            }
            s
        })
    }
}

pub struct BatchRunner {
    compositor: Arc<PosterCompositor>,
    posters_dir: PathBuf,
    workers: usize,
    cancel: CancelToken,
}

impl BatchRunner {
    pub fn new(compositor: Arc<PosterCompositor>, posters_dir: impl Into<PathBuf>, workers: usize) -> Self {
        Self {
            compositor,
            posters_dir: posters_dir.into(),
            workers: workers.max(1),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run every job. Outcomes come back in job order.
    pub async fn run(&self, jobs: Vec<BatchJob>) -> Vec<JobOutcome> {
        let total = jobs.len();
        info!(jobs = total, workers = self.workers, "Starting batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut handles = Vec::with_capacity(total);

        for job in jobs {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = %e, "Worker pool closed");
                    handles.push((job.theme_id, None));
                    continue;
                }
            };
            if self.cancel.is_cancelled() {
                drop(permit);
                handles.push((job.theme_id, None));
                continue;
            }

            let mut request = job.request;
            request.output_path = self.posters_dir.join(output_filename(
                &request.city,
                &job.theme_id,
                request.distance_m,
                request.format,
                OutputNaming::Micros,
                Utc::now(),
            ));
            let compositor = Arc::clone(&self.compositor);
            let theme_id = job.theme_id.clone();
            let theme = job.theme;

            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let result = compositor.generate(&request, &theme).await;
                drop(permit);
                match result {
                    Ok(path) => JobOutcome::Completed {
                        theme: theme_id,
                        path,
                        duration: start.elapsed(),
                    },
                    Err(error) => {
                        warn!(theme = %theme_id, error = %error, "Poster failed");
                        JobOutcome::Failed {
                            theme: theme_id,
                            error,
                        }
                    }
                }
            });
            handles.push((job.theme_id, Some(handle)));
        }

        let mut outcomes = Vec::with_capacity(total);
        for (theme, handle) in handles {
            let outcome = match handle {
                None => JobOutcome::Skipped { theme },
                Some(task) => match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => JobOutcome::Failed {
                        theme,
                        error: PosterError::InternalError(format!("render task panicked: {}", e)),
                    },
                },
            };
            outcomes.push(outcome);
        }

        let summary = BatchSummary::of(&outcomes);
        info!(
            completed = summary.completed,
            failed = summary.failed,
            skipped = summary.skipped,
            "Batch finished"
        );
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_shared() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            JobOutcome::Skipped { theme: "a".into() },
            JobOutcome::Failed {
                theme: "b".into(),
                error: PosterError::EmptyNetwork,
            },
            JobOutcome::Skipped { theme: "c".into() },
        ];
        let summary = BatchSummary::of(&outcomes);
        assert_eq!(summary, BatchSummary { completed: 0, failed: 1, skipped: 2 });
        assert_eq!(outcomes[1].theme(), "b");
    }
}

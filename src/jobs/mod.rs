//! Background answer jobs.
//!
//! A question is answered detached from the request that created it. Each job
//! reports its progress through [`JobStatus`] and can be awaited.
//!
//! A finished job drops its task handle itself. Finished statuses are kept for
//! the most recent jobs only; older ones are evicted once the answer is stored.

use crate::error::Result;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

/// Finished statuses retained by default.
pub const DEFAULT_FINISHED_CAPACITY: usize = 1024;

/// Progress of a question's answer job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "state")]
pub enum JobStatus {
    Pending,
    Running,
    Answered,
    /// An error message was written as the answer.
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Answered | JobStatus::Failed { .. })
    }
}

/// Statuses by question, with finished ones evicted oldest first.
struct StatusTable {
    statuses: HashMap<Uuid, JobStatus>,
    finished: VecDeque<Uuid>,
    capacity: usize,
}

impl StatusTable {
    fn set(&mut self, question_id: Uuid, status: JobStatus) {
        let finished = status.is_finished();
        let previous = self.statuses.insert(question_id, status);

        if finished && !previous.is_some_and(|p| p.is_finished()) {
            self.finished.push_back(question_id);
            while self.finished.len() > self.capacity {
                if let Some(evicted) = self.finished.pop_front() {
                    self.statuses.remove(&evicted);
                }
            }
        }
    }
}

type Handles = Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>;

/// Tracks detached answer tasks by question id.
pub struct AnswerJobs {
    table: Arc<RwLock<StatusTable>>,
    handles: Handles,
}

impl Default for AnswerJobs {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FINISHED_CAPACITY)
    }
}

impl AnswerJobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` finished statuses.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: Arc::new(RwLock::new(StatusTable {
                statuses: HashMap::new(),
                finished: VecDeque::new(),
                capacity,
            })),
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Run `job` in the background for `question_id`.
    ///
    /// The job is `Answered` when it returns `Ok` and `Failed` otherwise.
    pub async fn spawn<F>(&self, question_id: Uuid, job: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.table
            .write()
            .await
            .set(question_id, JobStatus::Pending);

        let table = Arc::clone(&self.table);
        let handles = Arc::clone(&self.handles);

        // Held until the handle is registered, so the task cannot remove it first.
        let mut registered = self.handles.lock().await;
        let handle = tokio::spawn(async move {
            table.write().await.set(question_id, JobStatus::Running);

            let status = match job.await {
                Ok(()) => JobStatus::Answered,
                Err(e) => {
                    error!("Answer job for question {} failed: {}", question_id, e);
                    JobStatus::Failed {
                        reason: e.to_string(),
                    }
                }
            };
            debug!("Question {} job finished: {:?}", question_id, status);
            table.write().await.set(question_id, status);

            handles.lock().await.remove(&question_id);
        });
        registered.insert(question_id, handle);
    }

    pub async fn status(&self, question_id: Uuid) -> Option<JobStatus> {
        self.table.read().await.statuses.get(&question_id).cloned()
    }

    /// Wait for the job of `question_id` to finish and return its final status.
    ///
    /// Returns the recorded status straight away when the job already
    /// finished, and `None` for unknown or evicted questions.
    pub async fn wait(&self, question_id: Uuid) -> Option<JobStatus> {
        let handle = self.handles.lock().await.remove(&question_id);
        if let Some(handle) = handle {
            self.settle(question_id, handle).await;
        }
        self.status(question_id).await
    }

    /// Wait for every outstanding job.
    pub async fn drain(&self) {
        let handles: Vec<_> = self.handles.lock().await.drain().collect();
        join_all(
            handles
                .into_iter()
                .map(|(question_id, handle)| self.settle(question_id, handle)),
        )
        .await;
    }

    /// Number of jobs still running.
    pub async fn active(&self) -> usize {
        self.handles.lock().await.len()
    }

    /// Number of statuses currently retained.
    pub async fn tracked(&self) -> usize {
        self.table.read().await.statuses.len()
    }

    async fn settle(&self, question_id: Uuid, handle: JoinHandle<()>) {
        if let Err(e) = handle.await {
            error!("Answer job for question {} aborted: {}", question_id, e);
            self.table.write().await.set(
                question_id,
                JobStatus::Failed {
                    reason: e.to_string(),
                },
            );
        }
    }
}

//! Fire-and-forget bookkeeping queue.
//!
//! A reply must never wait on trust math, timeline writes, or memory
//! persistence. The chat flow enqueues a job after the response is already
//! composed and moves on; a single worker task drains the channel and calls
//! whichever collaborator services are configured. A failed job is logged
//! with its id and dropped. No retries, no back-pressure on the caller.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::providers::{MemoryService, TimelineService, TrustService};
use crate::types::emotion::SeverityLevel;

// ============================================================================
// Jobs
// ============================================================================

/// One unit of deferred bookkeeping. Every job carries its own id so a
/// failure can be tied back to a log line.
#[derive(Debug, Clone)]
pub enum BackgroundJob {
    /// Report a completed exchange to the trust service.
    TrustUpdate {
        job_id: Uuid,
        user_id: String,
        severity: SeverityLevel,
    },
    /// Append a conversation event to the user's timeline.
    TimelineEvent {
        job_id: Uuid,
        user_id: String,
        kind: String,
        summary: String,
    },
    /// Persist the exchange to long-term memory.
    MemoryWrite {
        job_id: Uuid,
        user_id: String,
        user_message: String,
        reply: String,
    },
}

impl BackgroundJob {
    pub fn trust_update(user_id: impl Into<String>, severity: SeverityLevel) -> Self {
        BackgroundJob::TrustUpdate {
            job_id: Uuid::new_v4(),
            user_id: user_id.into(),
            severity,
        }
    }

    pub fn timeline_event(
        user_id: impl Into<String>,
        kind: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        BackgroundJob::TimelineEvent {
            job_id: Uuid::new_v4(),
            user_id: user_id.into(),
            kind: kind.into(),
            summary: summary.into(),
        }
    }

    pub fn memory_write(
        user_id: impl Into<String>,
        user_message: impl Into<String>,
        reply: impl Into<String>,
    ) -> Self {
        BackgroundJob::MemoryWrite {
            job_id: Uuid::new_v4(),
            user_id: user_id.into(),
            user_message: user_message.into(),
            reply: reply.into(),
        }
    }

    pub fn job_id(&self) -> Uuid {
        match self {
            BackgroundJob::TrustUpdate { job_id, .. }
            | BackgroundJob::TimelineEvent { job_id, .. }
            | BackgroundJob::MemoryWrite { job_id, .. } => *job_id,
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            BackgroundJob::TrustUpdate { .. } => "trust_update",
            BackgroundJob::TimelineEvent { .. } => "timeline_event",
            BackgroundJob::MemoryWrite { .. } => "memory_write",
        }
    }
}

// ============================================================================
// Queue
// ============================================================================

/// The collaborator set the worker dispatches to. Any of them may be
/// absent; a job whose service is missing completes as a no-op.
#[derive(Clone, Default)]
pub struct BackgroundServices {
    pub trust: Option<Arc<dyn TrustService>>,
    pub timeline: Option<Arc<dyn TimelineService>>,
    pub memory: Option<Arc<dyn MemoryService>>,
}

/// Unbounded job channel plus its single worker task.
pub struct BackgroundQueue {
    tx: mpsc::UnboundedSender<BackgroundJob>,
    worker: JoinHandle<()>,
}

/// Cloneable sender half, for embedding in shared request state.
#[derive(Clone)]
pub struct QueueHandle {
    tx: mpsc::UnboundedSender<BackgroundJob>,
}

impl QueueHandle {
    /// Hand a job to the worker. Never blocks and never fails the caller;
    /// once the queue is closed the job is dropped with a warning.
    pub fn enqueue(&self, job: BackgroundJob) {
        if let Err(e) = self.tx.send(job) {
            tracing::warn!(job = %e.0.job_id(), "background queue closed, dropping job");
        }
    }
}

impl BackgroundQueue {
    /// Start the worker. Must be called on a tokio runtime.
    pub fn spawn(services: BackgroundServices) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<BackgroundJob>();
        let worker = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                run_job(&services, job).await;
            }
            tracing::debug!("background queue drained, worker exiting");
        });
        BackgroundQueue { tx, worker }
    }

    /// Sender half for request handlers.
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            tx: self.tx.clone(),
        }
    }

    /// See [`QueueHandle::enqueue`].
    pub fn enqueue(&self, job: BackgroundJob) {
        if let Err(e) = self.tx.send(job) {
            tracing::warn!(job = %e.0.job_id(), "background queue closed, dropping job");
        }
    }

    /// Stop accepting jobs and wait for the worker to finish what is
    /// already queued. Outstanding [`QueueHandle`] clones keep the channel
    /// open; drop them before calling this or the await never finishes.
    pub async fn close(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            tracing::warn!(error = %e, "background worker did not exit cleanly");
        }
    }
}

async fn run_job(services: &BackgroundServices, job: BackgroundJob) {
    let job_id = job.job_id();
    let kind = job.kind_name();
    let outcome = match job {
        BackgroundJob::TrustUpdate {
            user_id, severity, ..
        } => match &services.trust {
            Some(svc) => svc.record_interaction(&user_id, severity.label()).await,
            None => Ok(()),
        },
        BackgroundJob::TimelineEvent {
            user_id,
            kind,
            summary,
            ..
        } => match &services.timeline {
            Some(svc) => svc.record(&user_id, &kind, &summary).await,
            None => Ok(()),
        },
        BackgroundJob::MemoryWrite {
            user_id,
            user_message,
            reply,
            ..
        } => match &services.memory {
            Some(svc) => svc.record(&user_id, &user_message, &reply).await,
            None => Ok(()),
        },
    };

    if let Err(e) = outcome {
        tracing::warn!(job = %job_id, kind, error = %e, "background job failed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTrust {
        calls: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl TrustService for RecordingTrust {
        async fn snapshot(
            &self,
            _user_id: &str,
        ) -> Result<crate::types::trust::TrustSnapshot, anyhow::Error> {
            Ok(Default::default())
        }

        async fn record_interaction(
            &self,
            user_id: &str,
            severity: &str,
        ) -> Result<(), anyhow::Error> {
            if self.fail {
                return Err(anyhow::anyhow!("trust service down"));
            }
            self.calls
                .lock()
                .push((user_id.to_string(), severity.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMemory {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MemoryService for RecordingMemory {
        async fn record(
            &self,
            user_id: &str,
            _user_message: &str,
            _reply: &str,
        ) -> Result<(), anyhow::Error> {
            self.calls.lock().push(user_id.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_jobs_reach_their_service() {
        let trust = Arc::new(RecordingTrust::default());
        let memory = Arc::new(RecordingMemory::default());
        let queue = BackgroundQueue::spawn(BackgroundServices {
            trust: Some(trust.clone()),
            timeline: None,
            memory: Some(memory.clone()),
        });

        queue.enqueue(BackgroundJob::trust_update("u1", SeverityLevel::Support));
        queue.enqueue(BackgroundJob::memory_write("u1", "hello", "hi there"));
        queue.close().await;

        assert_eq!(
            trust.calls.lock().as_slice(),
            &[("u1".to_string(), "SUPPORT".to_string())]
        );
        assert_eq!(memory.calls.lock().as_slice(), &["u1".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_the_worker() {
        let failing = Arc::new(RecordingTrust {
            calls: Mutex::new(Vec::new()),
            fail: true,
        });
        let memory = Arc::new(RecordingMemory::default());
        let queue = BackgroundQueue::spawn(BackgroundServices {
            trust: Some(failing),
            timeline: None,
            memory: Some(memory.clone()),
        });

        queue.enqueue(BackgroundJob::trust_update("u1", SeverityLevel::Casual));
        queue.enqueue(BackgroundJob::memory_write("u1", "still", "alive"));
        queue.close().await;

        assert_eq!(memory.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_service_is_a_noop() {
        let queue = BackgroundQueue::spawn(BackgroundServices::default());
        queue.enqueue(BackgroundJob::timeline_event("u1", "chat", "talked"));
        // Close drains without panicking even though nothing is wired up.
        queue.close().await;
    }

    #[test]
    fn test_each_job_gets_its_own_id() {
        let a = BackgroundJob::trust_update("u1", SeverityLevel::Casual);
        let b = BackgroundJob::trust_update("u1", SeverityLevel::Casual);
        assert_ne!(a.job_id(), b.job_id());
    }
}

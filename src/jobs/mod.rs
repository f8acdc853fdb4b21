//! Job handles and per-job progress.
//!
//! Each upload gets its own [`JobHandle`]; progress is stored as the bit
//! pattern of an `f64` in an atomic so the processing loop never waits on a
//! reader. The registry additionally remembers the most recently started job
//! for the job-agnostic `/progress` query.

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

pub type JobId = u64;

/// Receives progress updates from a running job.
pub trait ProgressSink: Send + Sync {
    fn set_progress(&self, percent: f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Done,
    Failed,
}

impl JobState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => JobState::Running,
            2 => JobState::Done,
            3 => JobState::Failed,
            _ => JobState::Idle,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            JobState::Idle => 0,
            JobState::Running => 1,
            JobState::Done => 2,
            JobState::Failed => 3,
        }
    }
}

#[derive(Debug)]
pub struct JobHandle {
    id: JobId,
    progress: AtomicU64,
    state: AtomicU8,
}

impl JobHandle {
    pub fn new(id: JobId) -> Self {
        Self {
            id,
            progress: AtomicU64::new(0f64.to_bits()),
            state: AtomicU8::new(JobState::Idle.as_u8()),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn progress(&self) -> f64 {
        f64::from_bits(self.progress.load(Ordering::Acquire))
    }

    pub fn state(&self) -> JobState {
        JobState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: JobState) {
        debug!("job {} → {:?}", self.id, state);
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Claim the job for a new run. Fails while another run holds it.
    pub fn try_start(&self) -> bool {
        let running = JobState::Running.as_u8();
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current != running).then_some(running)
            })
            .is_ok()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.id,
            value: self.progress(),
            state: self.state(),
        }
    }
}

impl ProgressSink for JobHandle {
    fn set_progress(&self, percent: f64) {
        let clamped = percent.clamp(0.0, 100.0);
        self.progress.store(clamped.to_bits(), Ordering::Release);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub value: f64,
    pub state: JobState,
}

// ── Registry ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RegistryInner {
    next_id: JobId,
    jobs: HashMap<JobId, Arc<JobHandle>>,
    order: VecDeque<JobId>,
    latest: Option<Arc<JobHandle>>,
}

#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<RwLock<RegistryInner>>,
    capacity: usize,
}

impl JobRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RegistryInner {
                next_id: 1,
                ..Default::default()
            })),
            capacity: capacity.max(1),
        }
    }

    /// Allocate a fresh idle job.
    pub async fn create(&self) -> Arc<JobHandle> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let handle = Arc::new(JobHandle::new(id));
        inner.jobs.insert(id, Arc::clone(&handle));
        inner.order.push_back(id);
        self.evict(&mut inner);
        handle
    }

    pub async fn get(&self, id: JobId) -> Option<Arc<JobHandle>> {
        self.inner.read().await.jobs.get(&id).cloned()
    }

    /// Mark `handle` as the job reported by the global progress query.
    pub async fn mark_latest(&self, handle: &Arc<JobHandle>) {
        self.inner.write().await.latest = Some(Arc::clone(handle));
    }

    /// Progress of the most recently started job, 0 if none ran yet.
    pub async fn latest_progress(&self) -> f64 {
        self.inner
            .read()
            .await
            .latest
            .as_ref()
            .map(|h| h.progress())
            .unwrap_or(0.0)
    }

    /// Drop the oldest finished jobs once over capacity. Idle jobs are
    /// still waiting for their upload and are kept.
    fn evict(&self, inner: &mut RegistryInner) {
        while inner.jobs.len() > self.capacity {
            let victim = inner.order.iter().position(|id| {
                inner
                    .jobs
                    .get(id)
                    .map(|h| matches!(h.state(), JobState::Done | JobState::Failed))
                    .unwrap_or(true)
            });
            let Some(pos) = victim else { break };
            if let Some(id) = inner.order.remove(pos) {
                inner.jobs.remove(&id);
                debug!("evicted job {}", id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_is_clamped() {
        let handle = JobHandle::new(1);
        handle.set_progress(150.0);
        assert_eq!(handle.progress(), 100.0);
        handle.set_progress(-3.0);
        assert_eq!(handle.progress(), 0.0);
        handle.set_progress(33.5);
        assert_eq!(handle.progress(), 33.5);
    }

    #[tokio::test]
    async fn test_jobs_are_independent() {
        let registry = JobRegistry::new(8);
        let a = registry.create().await;
        let b = registry.create().await;
        assert_ne!(a.id(), b.id());

        a.set_progress(40.0);
        b.set_progress(90.0);
        assert_eq!(registry.get(a.id()).await.unwrap().progress(), 40.0);
        assert_eq!(registry.get(b.id()).await.unwrap().progress(), 90.0);
    }

    #[tokio::test]
    async fn test_latest_progress() {
        let registry = JobRegistry::new(8);
        assert_eq!(registry.latest_progress().await, 0.0);

        let a = registry.create().await;
        registry.mark_latest(&a).await;
        a.set_progress(50.0);
        assert_eq!(registry.latest_progress().await, 50.0);

        let b = registry.create().await;
        registry.mark_latest(&b).await;
        assert_eq!(registry.latest_progress().await, 0.0);
    }

    #[tokio::test]
    async fn test_eviction_spares_running_jobs() {
        let registry = JobRegistry::new(2);
        let first = registry.create().await;
        first.set_state(JobState::Running);
        let second = registry.create().await;
        second.set_state(JobState::Done);
        let third = registry.create().await;

        assert!(registry.get(first.id()).await.is_some());
        assert!(registry.get(second.id()).await.is_none());
        assert!(registry.get(third.id()).await.is_some());
    }

    #[tokio::test]
    async fn test_eviction_spares_idle_jobs_awaiting_upload() {
        let registry = JobRegistry::new(2);
        let waiting = registry.create().await;
        let failed = registry.create().await;
        failed.set_state(JobState::Failed);
        let newest = registry.create().await;

        assert!(registry.get(waiting.id()).await.is_some());
        assert!(registry.get(failed.id()).await.is_none());
        assert!(registry.get(newest.id()).await.is_some());

        // nothing finished left to drop: registry grows past capacity
        let extra = registry.create().await;
        assert!(registry.get(waiting.id()).await.is_some());
        assert!(registry.get(extra.id()).await.is_some());
    }

    #[test]
    fn test_try_start_claims_once() {
        let handle = JobHandle::new(3);
        assert!(handle.try_start());
        assert_eq!(handle.state(), JobState::Running);
        assert!(!handle.try_start());

        handle.set_state(JobState::Done);
        assert!(handle.try_start());
        handle.set_state(JobState::Failed);
        assert!(handle.try_start());
    }

    #[test]
    fn test_try_start_single_winner_across_threads() {
        let handle = Arc::new(JobHandle::new(4));
        let winners: usize = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || handle.try_start() as usize)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|t| t.join().unwrap())
            .sum();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_snapshot_serializes_state() {
        let handle = JobHandle::new(7);
        handle.set_state(JobState::Done);
        handle.set_progress(100.0);
        let json = serde_json::to_value(handle.snapshot()).unwrap();
        assert_eq!(json, serde_json::json!({"job_id": 7, "value": 100.0, "state": "done"}));
    }
}

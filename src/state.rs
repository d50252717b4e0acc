use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where a capture run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Fetching,
    Aggregating,
    Persisting,
    Checkpointing,
    Done,
    Failed,
}

impl CapturePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapturePhase::Idle => "idle",
            CapturePhase::Fetching => "fetching",
            CapturePhase::Aggregating => "aggregating",
            CapturePhase::Persisting => "persisting",
            CapturePhase::Checkpointing => "checkpointing",
            CapturePhase::Done => "done",
            CapturePhase::Failed => "failed",
        }
    }
}

/// Allows at most one capture run at a time within the process.
#[derive(Clone, Default)]
pub struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` when another run holds the guard.
    pub fn try_acquire(&self) -> Option<RunPermit> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunPermit {
                running: self.running.clone(),
            })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Releases the guard when dropped, including on error paths.
pub struct RunPermit {
    running: Arc<AtomicBool>,
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

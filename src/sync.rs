//! Best-effort outbound sync of review outcomes and flags.
//!
//! Callers update and persist local state first, then enqueue. A single
//! worker sends queued operations in order; failures are logged and
//! counted, never reported back to the caller.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::{ApiError, ContentSource};
use crate::domain::{CardId, Domain};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOp {
  Answer { correct: bool },
  Known { known: bool },
  Favorite { favorite: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SyncJob {
  domain: Domain,
  id: CardId,
  op: SyncOp,
}

/// What the worker did before the last handle was dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub sent: usize,
  pub failed: usize,
}

/// Cloneable handle to the sync worker
#[derive(Debug, Clone)]
pub struct SyncQueue {
  tx: mpsc::UnboundedSender<SyncJob>,
}

impl SyncQueue {
  /// Start the worker on the current tokio runtime.
  ///
  /// The join handle resolves once every `SyncQueue` clone is dropped and
  /// the queue has drained.
  pub fn spawn(source: Arc<dyn ContentSource>) -> (Self, JoinHandle<SyncReport>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(run_worker(source, rx));
    (Self { tx }, worker)
  }

  pub fn record_answer(&self, domain: Domain, id: &CardId, correct: bool) -> bool {
    self.enqueue(domain, id, SyncOp::Answer { correct })
  }

  pub fn set_known(&self, domain: Domain, id: &CardId, known: bool) -> bool {
    self.enqueue(domain, id, SyncOp::Known { known })
  }

  pub fn set_favorite(&self, domain: Domain, id: &CardId, favorite: bool) -> bool {
    self.enqueue(domain, id, SyncOp::Favorite { favorite })
  }

  /// Returns whether the operation was queued. Ids the server never issued
  /// are skipped.
  fn enqueue(&self, domain: Domain, id: &CardId, op: SyncOp) -> bool {
    if !id.is_server_id() {
      tracing::debug!("Not syncing {:?} for local {} card {}", op, domain, id);
      return false;
    }

    let job = SyncJob {
      domain,
      id: id.clone(),
      op,
    };
    match self.tx.send(job) {
      Ok(()) => true,
      Err(e) => {
        tracing::warn!("Sync worker gone, dropping {:?}", e.0.op);
        false
      }
    }
  }
}

async fn run_worker(
  source: Arc<dyn ContentSource>,
  mut rx: mpsc::UnboundedReceiver<SyncJob>,
) -> SyncReport {
  let mut report = SyncReport::default();

  while let Some(job) = rx.recv().await {
    match send(source.as_ref(), &job).await {
      Ok(()) => report.sent += 1,
      Err(e) => {
        report.failed += 1;
        tracing::warn!(
          "Sync {:?} for {} card {} failed: {}",
          job.op,
          job.domain,
          job.id,
          e
        );
      }
    }
  }

  tracing::debug!("Sync queue drained: {} sent, {} failed", report.sent, report.failed);
  report
}

async fn send(source: &dyn ContentSource, job: &SyncJob) -> Result<(), ApiError> {
  match job.op {
    SyncOp::Answer { correct } => source.post_answer(job.domain, &job.id, correct).await,
    SyncOp::Known { known } => source.post_known(job.domain, &job.id, known).await,
    SyncOp::Favorite { favorite } => source.post_favorite(job.domain, &job.id, favorite).await,
  }
}

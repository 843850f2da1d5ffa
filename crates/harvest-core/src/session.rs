//! Per-operator context for long-running operations.
//!
//! Front ends serve several operators at once; each operator may run at most one
//! extraction or invite at a time. The registry only tracks what is running; the
//! engines themselves keep no state between calls.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::AbortHandle;

use crate::{
    domain::OperatorId,
    progress::{Progress, ProgressSnapshot},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Extract { session: String, target: String },
    Invite { session: String, channel: String },
}

impl OperationKind {
    pub fn label(&self) -> String {
        match self {
            OperationKind::Extract { session, target } => format!("extract {target} via {session}"),
            OperationKind::Invite { session, channel } => format!("invite to @{channel} via {session}"),
        }
    }
}

#[derive(Debug)]
struct ActiveOperation {
    kind: OperationKind,
    progress: Arc<Progress>,
    started_at: DateTime<Utc>,
    abort: Option<AbortHandle>,
}

#[derive(Clone, Debug)]
pub struct OperationStatus {
    pub kind: OperationKind,
    pub progress: ProgressSnapshot,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct OperatorSessions {
    inner: Mutex<HashMap<OperatorId, ActiveOperation>>,
}

impl OperatorSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new operation. Returns `None` when the operator already has one running.
    pub async fn begin(&self, operator: OperatorId, kind: OperationKind) -> Option<Arc<Progress>> {
        let mut map = self.inner.lock().await;
        if map.contains_key(&operator) {
            return None;
        }
        let progress = Progress::shared();
        tracing::info!(operator = operator.0, op = %kind.label(), "operation started");
        map.insert(
            operator,
            ActiveOperation {
                kind,
                progress: progress.clone(),
                started_at: Utc::now(),
                abort: None,
            },
        );
        Some(progress)
    }

    /// Attach the task running the operation so `cancel` can stop it. Returns `false`
    /// when the operation is no longer registered (already cancelled or finished).
    pub async fn attach(&self, operator: OperatorId, abort: AbortHandle) -> bool {
        match self.inner.lock().await.get_mut(&operator) {
            Some(op) => {
                op.abort = Some(abort);
                true
            }
            None => false,
        }
    }

    pub async fn finish(&self, operator: OperatorId) {
        if let Some(op) = self.inner.lock().await.remove(&operator) {
            tracing::info!(operator = operator.0, op = %op.kind.label(), "operation finished");
        }
    }

    /// Abort and forget the operator's operation. Returns `false` if nothing was running.
    pub async fn cancel(&self, operator: OperatorId) -> bool {
        let Some(op) = self.inner.lock().await.remove(&operator) else {
            return false;
        };
        if let Some(abort) = op.abort {
            abort.abort();
        }
        tracing::info!(operator = operator.0, op = %op.kind.label(), "operation cancelled");
        true
    }

    pub async fn status(&self, operator: OperatorId) -> Option<OperationStatus> {
        self.inner
            .lock()
            .await
            .get(&operator)
            .map(|op| OperationStatus {
                kind: op.kind.clone(),
                progress: op.progress.snapshot(),
                started_at: op.started_at,
            })
    }
}

//! Remote persistence contract.
//!
//! The store mutates local state first and describes the matching backend
//! write as a `RemoteOp`. The session hands ops to an `OpSink` (the network
//! dispatcher in `studio-remote`, or a recorder in tests) and tracks each
//! one in an `OpLedger` until its `OpOutcome` comes back.

use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use studio_core::id::RecordId;
use studio_core::model::{AssetPatch, CompositionScope, Layer, LayerKind, LayerPatch, PositionedAsset};

/// A backend write produced by a local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOp {
    /// `POST /layers/bulk-create`. `provisional` maps each kind to the local
    /// id it carries until the server answers.
    CreateLayers {
        scope: CompositionScope,
        provisional: Vec<(LayerKind, RecordId)>,
    },
    /// `PUT /layers/:id`
    UpdateLayer { id: RecordId, patch: LayerPatch },
    /// `POST /layers/:layer_id/assets`. `asset.id` is provisional.
    CreateAsset {
        layer_id: RecordId,
        asset: PositionedAsset,
    },
    /// `PUT /layers/assets/:id`
    UpdateAsset { id: RecordId, patch: AssetPatch },
    /// `DELETE /layers/assets/:id`
    DeleteAsset { id: RecordId },
}

impl RemoteOp {
    /// Short label for logs and the ledger.
    pub fn label(&self) -> &'static str {
        match self {
            RemoteOp::CreateLayers { .. } => "create layers",
            RemoteOp::UpdateLayer { .. } => "update layer",
            RemoteOp::CreateAsset { .. } => "create asset",
            RemoteOp::UpdateAsset { .. } => "update asset",
            RemoteOp::DeleteAsset { .. } => "delete asset",
        }
    }
}

/// Ops produced by one mutation; almost always zero, one, or two.
pub type Ops = SmallVec<[RemoteOp; 2]>;

/// A submitted op tagged with its ledger sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingOp {
    pub seq: u64,
    pub op: RemoteOp,
}

/// What the server said about a successful op.
#[derive(Debug, Clone, PartialEq)]
pub enum OpAck {
    Done,
    LayersCreated(Vec<Layer>),
    AssetCreated {
        provisional: RecordId,
        asset: PositionedAsset,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpOutcome {
    pub seq: u64,
    pub result: Result<OpAck, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpStatus {
    /// Applied to the local store, not yet handed to a sink.
    AppliedLocally,
    PendingRemote,
    Persisted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub label: &'static str,
    pub status: OpStatus,
}

/// Receives ops for background persistence. Must not block.
pub trait OpSink {
    /// Returns `false` if the op could not be queued.
    fn submit(&self, op: PendingOp) -> bool;
}

/// Sink that keeps every op in memory. Used for offline editing and tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    ops: Rc<RefCell<Vec<PendingOp>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything submitted so far.
    pub fn take(&self) -> Vec<PendingOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.ops.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.borrow().is_empty()
    }
}

impl OpSink for RecordingSink {
    fn submit(&self, op: PendingOp) -> bool {
        self.ops.borrow_mut().push(op);
        true
    }
}

/// Status of every op that has not been persisted yet. Persisted entries
/// are dropped; failures stay until the next full reload.
#[derive(Debug, Default)]
pub struct OpLedger {
    next_seq: u64,
    entries: BTreeMap<u64, LedgerEntry>,
}

impl OpLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an op that has been applied locally.
    pub fn record(&mut self, op: RemoteOp) -> PendingOp {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            seq,
            LedgerEntry {
                label: op.label(),
                status: OpStatus::AppliedLocally,
            },
        );
        PendingOp { seq, op }
    }

    pub fn mark_submitted(&mut self, seq: u64) {
        self.set_status(seq, OpStatus::PendingRemote);
    }

    pub fn mark_failed(&mut self, seq: u64, reason: impl Into<String>) {
        self.set_status(seq, OpStatus::Failed(reason.into()));
    }

    /// Settle an op. Returns `false` for unknown sequence numbers.
    pub fn complete(&mut self, outcome: &OpOutcome) -> bool {
        if !self.entries.contains_key(&outcome.seq) {
            return false;
        }
        match &outcome.result {
            Ok(_) => {
                self.entries.remove(&outcome.seq);
            }
            Err(reason) => self.mark_failed(outcome.seq, reason.clone()),
        }
        true
    }

    pub fn status(&self, seq: u64) -> Option<&OpStatus> {
        self.entries.get(&seq).map(|e| &e.status)
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .values()
            .filter(|e| matches!(e.status, OpStatus::AppliedLocally | OpStatus::PendingRemote))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (u64, &LedgerEntry)> {
        self.entries
            .iter()
            .filter(|(_, e)| matches!(e.status, OpStatus::Failed(_)))
            .map(|(seq, e)| (*seq, e))
    }

    /// Forget failures; a reload has resynchronized with the server.
    pub fn clear_failures(&mut self) {
        self.entries
            .retain(|_, e| !matches!(e.status, OpStatus::Failed(_)));
    }

    fn set_status(&mut self, seq: u64, status: OpStatus) {
        if let Some(entry) = self.entries.get_mut(&seq) {
            entry.status = status;
        }
    }
}

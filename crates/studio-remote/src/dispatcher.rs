//! Background persistence for editor ops.
//!
//! The session submits `PendingOp`s through [`Dispatcher`], which is an
//! `OpSink`. A tokio task pulls them off an unbounded channel and spawns
//! one request per op, so ops run concurrently and unordered. Each result
//! is sent back as an `OpOutcome` for the UI thread to feed into
//! `StudioSession::apply_outcome`.

use crate::api::{ApiError, StudioApi};
use log::{debug, error};
use std::sync::Arc;
use studio_editor::persist::{OpAck, OpOutcome, OpSink, PendingOp, RemoteOp};
use studio_editor::session::StudioSession;
use tokio::sync::mpsc;

/// Queue handle for remote writes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    ops: mpsc::UnboundedSender<PendingOp>,
}

pub type Outcomes = mpsc::UnboundedReceiver<OpOutcome>;

impl Dispatcher {
    /// Start the dispatch loop on the current tokio runtime.
    pub fn spawn(api: StudioApi) -> (Self, Outcomes) {
        let (ops_tx, mut ops_rx) = mpsc::unbounded_channel::<PendingOp>();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let api = Arc::new(api);

        tokio::spawn(async move {
            while let Some(pending) = ops_rx.recv().await {
                debug!("dispatching {} (op {})", pending.op.label(), pending.seq);
                let api = Arc::clone(&api);
                let outcome_tx = outcome_tx.clone();
                tokio::spawn(async move {
                    let outcome = execute(&api, pending).await;
                    // The receiver is gone once the view shuts down.
                    let _ = outcome_tx.send(outcome);
                });
            }
            debug!("op channel closed; dispatcher stopping");
        });

        (Self { ops: ops_tx }, outcome_rx)
    }
}

impl OpSink for Dispatcher {
    fn submit(&self, op: PendingOp) -> bool {
        self.ops.send(op).is_ok()
    }
}

/// Run one op against the backend.
pub async fn execute(api: &StudioApi, pending: PendingOp) -> OpOutcome {
    let PendingOp { seq, op } = pending;
    let label = op.label();
    let result = match op {
        RemoteOp::CreateLayers { scope, provisional } => {
            let kinds: Vec<_> = provisional.iter().map(|&(kind, _)| kind).collect();
            api.bulk_create_layers(scope, &kinds)
                .await
                .map(OpAck::LayersCreated)
        }
        RemoteOp::UpdateLayer { id, patch } => api.update_layer(id, &patch).await.map(|_| OpAck::Done),
        RemoteOp::CreateAsset { layer_id, asset } => {
            api.create_layer_asset(layer_id, &asset)
                .await
                .map(|created| OpAck::AssetCreated {
                    provisional: asset.id,
                    asset: created,
                })
        }
        RemoteOp::UpdateAsset { id, patch } => {
            api.update_layer_asset(id, &patch).await.map(|()| OpAck::Done)
        }
        RemoteOp::DeleteAsset { id } => api.delete_layer_asset(id).await.map(|()| OpAck::Done),
    };

    OpOutcome {
        seq,
        result: result.map_err(|err: ApiError| {
            error!("{label} (op {seq}) failed: {err}");
            err.to_string()
        }),
    }
}

/// Apply every outcome that has arrived so far. Returns how many were
/// applied.
pub fn drain_outcomes(outcomes: &mut Outcomes, session: &mut StudioSession) -> usize {
    let mut applied = 0;
    while let Ok(outcome) = outcomes.try_recv() {
        session.apply_outcome(outcome);
        applied += 1;
    }
    applied
}

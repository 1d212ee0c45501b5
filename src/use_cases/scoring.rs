// Outbound scoring port and the per-session sink task.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

use crate::use_cases::types::ScoringEvent;

// Port for the external scoring collaborator.
#[async_trait]
pub trait ScoringSink: Send + Sync {
    async fn apply_damage(&self, team_id: u64, amount: f64) -> Result<(), String>;
    async fn apply_penalty(&self, team_id: u64, points: i64, charge_id: u64)
    -> Result<(), String>;
}

/// Drains one session's scoring events into the sink, in emission order.
///
/// Fire-and-forget semantics: delivery failures are logged and dropped,
/// never retried, and the session tick loop is never blocked on them.
pub async fn scoring_sink_task(
    mut scoring_rx: mpsc::Receiver<ScoringEvent>,
    sink: Arc<dyn ScoringSink>,
) {
    while let Some(event) = scoring_rx.recv().await {
        let result = match &event {
            ScoringEvent::Damage { team_id, amount } => sink.apply_damage(*team_id, *amount).await,
            ScoringEvent::Penalty {
                team_id,
                charge_id,
                points,
            } => sink.apply_penalty(*team_id, *points, *charge_id).await,
        };
        if let Err(error) = result {
            warn!(%error, event = ?event, "scoring delivery failed; event dropped");
        }
    }
}

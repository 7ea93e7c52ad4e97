//! Producer loop (spec.md §4.9): a single background task multiplexes every
//! source of change into snapshot composition and broadcast, plus forwards
//! discrete job events unchanged.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use catalogue_store::CatalogueStore;
use event_broadcaster::EventBroadcaster;
use job_store::JobStore;
use translation_session::Status as SessionStatus;
use translationjob_controller::TranslationJobEvent;

use crate::snapshot::{self, Snapshot};

const SNAPSHOT_TICK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum Payload {
    Snapshot(Snapshot),
    JobEvent(TranslationJobEvent),
}

pub struct ProducerInputs {
    pub store: Arc<CatalogueStore>,
    pub jobs: Arc<JobStore>,
    pub ts_status: watch::Receiver<Option<SessionStatus>>,
    pub cs_updates: watch::Receiver<()>,
    pub eb_triggers: watch::Receiver<()>,
    pub job_events: mpsc::Receiver<TranslationJobEvent>,
}

fn compose_and_broadcast(inputs: &ProducerInputs, broadcaster: &EventBroadcaster<Payload>) {
    let snapshot = snapshot::compose(&inputs.store, &inputs.jobs, inputs.ts_status.borrow().as_ref());
    broadcaster.broadcast(Payload::Snapshot(snapshot));
}

/// Runs until the broadcaster has no more subscribers to serve and the
/// process is shutting down; in practice this runs for the operator's
/// lifetime as one of the workers spec.md §5 describes ("one AF producer").
pub async fn run(mut inputs: ProducerInputs, broadcaster: Arc<EventBroadcaster<Payload>>) {
    let mut tick = tokio::time::interval(SNAPSHOT_TICK);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    compose_and_broadcast(&inputs, &broadcaster);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                tracing::debug!("producer loop: periodic tick");
                compose_and_broadcast(&inputs, &broadcaster);
            }
            changed = inputs.cs_updates.changed() => {
                if changed.is_err() {
                    tracing::warn!("catalogue store update channel closed");
                    break;
                }
                tracing::debug!("producer loop: catalogue store updated");
                compose_and_broadcast(&inputs, &broadcaster);
            }
            changed = inputs.eb_triggers.changed() => {
                if changed.is_err() {
                    tracing::warn!("event broadcaster trigger channel closed");
                    break;
                }
                tracing::debug!("producer loop: trigger fired");
                compose_and_broadcast(&inputs, &broadcaster);
            }
            changed = inputs.ts_status.changed() => {
                if changed.is_err() {
                    tracing::warn!("translation session status channel closed");
                    break;
                }
                tracing::debug!("producer loop: translation service status changed");
                compose_and_broadcast(&inputs, &broadcaster);
            }
            event = inputs.job_events.recv() => {
                match event {
                    Some(event) => broadcaster.broadcast(Payload::JobEvent(event)),
                    None => {
                        tracing::warn!("translation job event channel closed");
                        break;
                    }
                }
            }
        }
    }
}

//! API façade (spec.md §4.9, §6): serves a composed snapshot over HTTP and
//! streams it — plus discrete job events — over SSE. The producer loop that
//! feeds the broadcaster lives in [`producer`]; this module only wires the
//! axum router and the per-request SSE translation.

pub mod producer;
pub mod snapshot;

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;

use catalogue_store::CatalogueStore;
use event_broadcaster::EventBroadcaster;
use job_store::JobStore;
use translation_session::Status as SessionStatus;
use translationjob_controller::TranslationJobEvent;

pub use producer::{Payload, ProducerInputs};

/// Interval between SSE keepalive comments (spec.md §6).
const SSE_KEEPALIVE: Duration = Duration::from_secs(15);

#[derive(Clone)]
struct AppState {
    store: Arc<CatalogueStore>,
    jobs: Arc<JobStore>,
    ts_status: watch::Receiver<Option<SessionStatus>>,
    broadcaster: Arc<EventBroadcaster<Payload>>,
}

/// Builds the façade's router. `ts_status` tracks the same channel fed into
/// [`producer::run`], so `GET /snapshot` can compose on demand between
/// broadcast ticks.
pub fn router(
    store: Arc<CatalogueStore>,
    jobs: Arc<JobStore>,
    ts_status: watch::Receiver<Option<SessionStatus>>,
    broadcaster: Arc<EventBroadcaster<Payload>>,
) -> Router {
    let state = AppState { store, jobs, ts_status, broadcaster };

    Router::new()
        .route("/snapshot", get(get_snapshot))
        .route("/events", get(get_events))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

async fn get_snapshot(State(state): State<AppState>) -> Json<snapshot::Snapshot> {
    Json(snapshot::compose(&state.store, &state.jobs, state.ts_status.borrow().as_ref()))
}

async fn get_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.broadcaster.subscribe();
    tracing::debug!(subscriber = ?id, "SSE client connected");

    let stream = ReceiverStream::new(rx).map(payload_to_event).map(Ok);

    Sse::new(DropGuardStream { inner: stream, broadcaster: state.broadcaster, id })
        .keep_alive(KeepAlive::new().interval(SSE_KEEPALIVE).text(""))
}

/// Wraps the subscriber stream so [`EventBroadcaster::unsubscribe`] runs as
/// soon as the client disconnects, instead of leaking a dead channel entry.
struct DropGuardStream<S> {
    inner: S,
    broadcaster: Arc<EventBroadcaster<Payload>>,
    id: event_broadcaster::SubscriberId,
}

impl<S: Stream + Unpin> Stream for DropGuardStream<S> {
    type Item = S::Item;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        std::pin::Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl<S> Drop for DropGuardStream<S> {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}

fn payload_to_event(payload: Payload) -> Event {
    match payload {
        Payload::Snapshot(snapshot) => Event::default()
            .event("snapshot")
            .json_data(snapshot)
            .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())),
        Payload::JobEvent(TranslationJobEvent::Processing { job }) => Event::default()
            .event("processing_translation")
            .json_data(serde_json::json!({ "job": job.to_string() }))
            .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())),
        Payload::JobEvent(TranslationJobEvent::Complete { job, page_url }) => Event::default()
            .event("translation_complete")
            .json_data(serde_json::json!({ "job": job.to_string(), "pageUrl": page_url }))
            .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())),
        Payload::JobEvent(TranslationJobEvent::Failed { job, reason, message }) => Event::default()
            .event("job_failed")
            .json_data(serde_json::json!({
                "job": job.to_string(),
                "reason": reason,
                "message": message,
            }))
            .unwrap_or_else(|err| Event::default().event("error").data(err.to_string())),
    }
}

use std::sync::Arc;

use foundation::geo::LatLngBounds;
use grid::{Cell, CellKey};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::{AuthChallenge, EventSink, LayerEvent};
use crate::query::FeatureQuery;
use crate::source::{FeaturePage, FeatureSource, SourceError};

/// Cross-batch shared state.
///
/// The in-flight counter is deliberately shared between overlapping
/// batches: `LoadingFinished` reflects return-to-zero of the whole
/// counter, carrying the most recently dispatched batch's bounds. This
/// mirrors the observed upstream behavior and is a documented limitation
/// rather than per-batch scoping.
#[derive(Debug, Default)]
struct BatchState {
    in_flight: usize,
    auth_pending: bool,
    last_bounds: Option<LatLngBounds>,
}

/// Issues one fetch per surviving cell and emits batch lifecycle events.
///
/// All per-cell failures are absorbed here and converted to events;
/// nothing propagates to the viewport controller.
pub struct RequestCoordinator {
    source: Arc<dyn FeatureSource>,
    events: EventSink,
    retry_tx: mpsc::UnboundedSender<String>,
    state: Arc<Mutex<BatchState>>,
}

impl RequestCoordinator {
    /// `retry_tx` receives the fresh credential whenever a host answers an
    /// authentication challenge.
    pub fn new(
        source: Arc<dyn FeatureSource>,
        events: EventSink,
        retry_tx: mpsc::UnboundedSender<String>,
    ) -> Self {
        Self {
            source,
            events,
            retry_tx,
            state: Arc::new(Mutex::new(BatchState::default())),
        }
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    pub fn auth_pending(&self) -> bool {
        self.state.lock().auth_pending
    }

    /// Re-arms the challenge latch once a retry credential has been
    /// accepted, so a later challenge can fire again.
    pub fn clear_auth_latch(&self) {
        self.state.lock().auth_pending = false;
    }

    /// Dispatches one fetch per cell.
    ///
    /// `LoadingStarted` is emitted once per non-empty batch, before any
    /// individual fetch can resolve; the counter is raised for the whole
    /// batch up front for the same reason. Fetch completion order is
    /// unspecified.
    pub fn dispatch(&self, cells: &[Cell], query: &FeatureQuery, bounds: LatLngBounds) {
        if cells.is_empty() {
            return;
        }

        {
            let mut state = self.state.lock();
            state.in_flight += cells.len();
            state.last_bounds = Some(bounds);
        }
        self.events.emit(LayerEvent::LoadingStarted { bounds });
        debug!(cells = cells.len(), in_flight = self.in_flight(), "dispatching cell batch");

        for cell in cells {
            let cell_query = query.clone().intersecting(cell.bounds);
            let source = Arc::clone(&self.source);
            let events = self.events.clone();
            let retry_tx = self.retry_tx.clone();
            let state = Arc::clone(&self.state);
            let key = cell.key;

            tokio::spawn(async move {
                let result = source.query(cell_query).await;
                settle_cell(&state, &events, &retry_tx, key, result);
            });
        }
    }
}

/// Books one completed fetch against the shared counter and emits the
/// corresponding events.
///
/// Runs under the state lock so the decrement and the resulting events are
/// one atomic step: `LoadingFinished` can never overtake a sibling's
/// arrival.
fn settle_cell(
    state: &Mutex<BatchState>,
    events: &EventSink,
    retry_tx: &mpsc::UnboundedSender<String>,
    key: CellKey,
    result: Result<FeaturePage, SourceError>,
) {
    let mut state = state.lock();
    state.in_flight = state.in_flight.saturating_sub(1);

    match result {
        Ok(page) => {
            events.emit(LayerEvent::FeaturesArrived { cell: key, page });
        }
        Err(error) if error.is_auth_challenge() => {
            if !state.auth_pending {
                state.auth_pending = true;
                warn!(cell = %key, "remote service challenged for credentials");
                events.emit(LayerEvent::AuthenticationRequired {
                    challenge: AuthChallenge::new(retry_tx.clone()),
                });
            }
        }
        Err(error) => {
            warn!(cell = %key, %error, "cell fetch failed");
            events.emit(LayerEvent::CellFailed { cell: key, error });
        }
    }

    if state.in_flight == 0
        && let Some(bounds) = state.last_bounds
    {
        events.emit(LayerEvent::LoadingFinished { bounds });
    }
}

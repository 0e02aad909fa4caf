use foundation::geo::LatLngBounds;
use grid::CellKey;
use tokio::sync::mpsc;

use crate::source::{FeaturePage, SourceError};

/// Retry affordance carried by [`LayerEvent::AuthenticationRequired`].
///
/// Supplying a fresh credential routes it back to the owning controller,
/// which clears the challenge latch, forgets the seen-cell table (nothing
/// was actually fetched under the rejected credential) and re-dispatches
/// the current viewport.
pub struct AuthChallenge {
    retry_tx: mpsc::UnboundedSender<String>,
}

impl AuthChallenge {
    pub(crate) fn new(retry_tx: mpsc::UnboundedSender<String>) -> Self {
        Self { retry_tx }
    }

    pub fn retry(&self, token: impl Into<String>) {
        let _ = self.retry_tx.send(token.into());
    }
}

impl std::fmt::Debug for AuthChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthChallenge").finish_non_exhaustive()
    }
}

/// Ordered lifecycle notifications for the host rendering layer.
///
/// Guarantees:
/// - `LoadingStarted` for a batch precedes any of that batch's arrivals.
/// - `LoadingFinished` fires exactly when the shared in-flight counter
///   returns to zero, never while fetches are still outstanding.
/// - `AuthenticationRequired` fires at most once per challenge, not per
///   failing cell.
#[derive(Debug)]
pub enum LayerEvent {
    LoadingStarted { bounds: LatLngBounds },
    /// One cell's raw payload; interpreting it is the renderer's business.
    FeaturesArrived { cell: CellKey, page: FeaturePage },
    /// A per-cell failure; sibling fetches are unaffected.
    CellFailed { cell: CellKey, error: SourceError },
    AuthenticationRequired { challenge: AuthChallenge },
    LoadingFinished { bounds: LatLngBounds },
}

/// Sending half of the lifecycle event stream.
///
/// Events travel over an unbounded channel so no emitter ever blocks; a
/// closed receiver simply drops further events.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<LayerEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<LayerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: LayerEvent) {
        let _ = self.tx.send(event);
    }
}

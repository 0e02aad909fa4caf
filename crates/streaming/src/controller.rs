use std::sync::Arc;

use foundation::geo::Viewport;
use grid::{GridIndexer, GridOrigin, InvalidCellSize, SeenCells};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::debug;

use crate::config::LayerOptions;
use crate::coordinator::RequestCoordinator;
use crate::events::{EventSink, LayerEvent};
use crate::source::FeatureSource;

/// A settled change of the host map's view.
///
/// Every variant carries the full new viewport; the variant itself is the
/// signal class, which matters because only zoom changes move the grid
/// origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ViewportSignal {
    Move(Viewport),
    Zoom(Viewport),
    Resize(Viewport),
}

impl ViewportSignal {
    pub fn viewport(&self) -> Viewport {
        match self {
            Self::Move(v) | Self::Zoom(v) | Self::Resize(v) => *v,
        }
    }

    pub fn is_zoom(&self) -> bool {
        matches!(self, Self::Zoom(_))
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Signal(ViewportSignal),
    Invalidate,
    Authenticate(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ControllerState {
    Idle,
    Debouncing,
    Dispatching,
}

/// Debounced driver of the indexer → dedupe → coordinator pipeline.
///
/// A single task owns all loader state; this handle only enqueues
/// commands, so callers never block. Dropping the last handle stops the
/// task (in-flight fetches still resolve and are still counted).
#[derive(Debug, Clone)]
pub struct ViewportController {
    tx: mpsc::UnboundedSender<Command>,
}

impl ViewportController {
    /// Spawns the controller task and performs one immediate,
    /// non-debounced dispatch against `initial`.
    pub fn spawn(
        source: Arc<dyn FeatureSource>,
        options: LayerOptions,
        initial: Viewport,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LayerEvent>), InvalidCellSize> {
        let indexer = options.indexer()?;
        let (events, event_rx) = EventSink::channel();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (retry_tx, retry_rx) = mpsc::unbounded_channel();

        let task = ControllerTask {
            indexer,
            seen: SeenCells::new(),
            coordinator: RequestCoordinator::new(source, events, retry_tx),
            origin: GridOrigin::from_viewport(&initial),
            viewport: initial,
            options,
            state: ControllerState::Idle,
            zoom_pending: false,
        };
        tokio::spawn(task.run(cmd_rx, retry_rx));

        Ok((Self { tx: cmd_tx }, event_rx))
    }

    pub fn signal(&self, signal: ViewportSignal) {
        let _ = self.tx.send(Command::Signal(signal));
    }

    /// Forgets every seen cell and re-dispatches the current viewport
    /// without moving the origin; for upstream filter/style changes.
    pub fn invalidate(&self) {
        let _ = self.tx.send(Command::Invalidate);
    }

    /// Supplies a credential, equivalent to answering an authentication
    /// challenge through its retry handle.
    pub fn authenticate(&self, token: impl Into<String>) {
        let _ = self.tx.send(Command::Authenticate(token.into()));
    }
}

struct ControllerTask {
    indexer: GridIndexer,
    seen: SeenCells,
    coordinator: RequestCoordinator,
    origin: GridOrigin,
    viewport: Viewport,
    options: LayerOptions,
    state: ControllerState,
    zoom_pending: bool,
}

impl ControllerTask {
    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut retry_rx: mpsc::UnboundedReceiver<String>,
    ) {
        self.dispatch();

        // One armed debounce deadline; every signal cancels and re-arms it.
        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    None => break,
                    Some(Command::Signal(signal)) => {
                        self.viewport = signal.viewport();
                        if signal.is_zoom() {
                            self.zoom_pending = true;
                        }
                        self.state = ControllerState::Debouncing;
                        deadline = Some(Instant::now() + self.options.debounce());
                    }
                    Some(Command::Invalidate) => {
                        self.seen.reset();
                        self.dispatch();
                    }
                    Some(Command::Authenticate(token)) => self.reauthenticate(token),
                },
                Some(token) = retry_rx.recv() => self.reauthenticate(token),
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                        if deadline.is_some() => {
                    deadline = None;
                    self.settle();
                }
            }
        }
    }

    /// Debounce expiry: the viewport has settled.
    fn settle(&mut self) {
        self.state = ControllerState::Dispatching;
        if self.zoom_pending {
            // The grid is re-anchored on the new view center; keys computed
            // against the old origin are meaningless now, so the seen table
            // goes with it.
            self.origin = GridOrigin::from_viewport(&self.viewport);
            self.seen.reset();
            self.zoom_pending = false;
        }
        self.dispatch();
        self.state = ControllerState::Idle;
    }

    /// Synchronous pipeline pass for the current viewport; the fetches it
    /// dispatches resolve on their own time.
    fn dispatch(&mut self) {
        let cells = self.indexer.compute_cells(&self.viewport, self.origin);
        let survivors = self.seen.filter(cells, self.options.deduplicate);
        debug!(
            state = ?self.state,
            survivors = survivors.len(),
            seen = self.seen.len(),
            "viewport dispatch"
        );
        self.coordinator
            .dispatch(&survivors, &self.options.query_template(), self.viewport.bounds);
    }

    /// Answers a pending challenge: nothing was fetched under the rejected
    /// credential, so the seen table is cleared and the whole current
    /// viewport goes out again.
    fn reauthenticate(&mut self, token: String) {
        debug!("re-dispatching after reauthentication");
        self.options.token = Some(token);
        self.coordinator.clear_auth_latch();
        self.seen.reset();
        self.dispatch();
    }
}

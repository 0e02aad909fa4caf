use std::sync::Arc;

use foundation::geo::Viewport;
use grid::InvalidCellSize;
use streaming::{
    FeatureSource, LayerEvent, LayerOptions, ViewportController, ViewportSignal,
};
use tokio::sync::mpsc;

/// Incrementally-loading feature layer.
///
/// The host map view owns one of these and delegates to it: viewport
/// signals go in through the `notify_*` methods, lifecycle events come
/// out of the receiver returned at construction. The layer owns a
/// [`ViewportController`] by plain composition and communicates with the
/// host only through those two surfaces; it renders nothing and holds no
/// visual feature state.
#[derive(Debug, Clone)]
pub struct FeatureLayer {
    controller: ViewportController,
}

impl FeatureLayer {
    /// Starts loading immediately against `initial`; fails fast on an
    /// invalid cell size.
    pub fn new(
        source: Arc<dyn FeatureSource>,
        options: LayerOptions,
        initial: Viewport,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LayerEvent>), InvalidCellSize> {
        let (controller, events) = ViewportController::spawn(source, options, initial)?;
        Ok((Self { controller }, events))
    }

    pub fn notify_move(&self, viewport: Viewport) {
        self.controller.signal(ViewportSignal::Move(viewport));
    }

    pub fn notify_zoom(&self, viewport: Viewport) {
        self.controller.signal(ViewportSignal::Zoom(viewport));
    }

    pub fn notify_resize(&self, viewport: Viewport) {
        self.controller.signal(ViewportSignal::Resize(viewport));
    }

    /// Forces a refetch of the visible region without re-anchoring the
    /// grid; for upstream filter or style changes.
    pub fn refresh(&self) {
        self.controller.invalidate();
    }

    /// Supplies a credential for a pending authentication challenge.
    pub fn authenticate(&self, token: impl Into<String>) {
        self.controller.authenticate(token);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use foundation::geo::{LatLngBounds, Viewport};
    use foundation::math::{Vec2, unproject, world_size};
    use streaming::{FeaturePage, LayerEvent, LayerOptions, MemoryFeatureSource};

    use super::FeatureLayer;

    fn options() -> LayerOptions {
        LayerOptions {
            cell_size: 256.0,
            padding: 0.0,
            ..LayerOptions::default()
        }
    }

    fn viewport_at(zoom: u8, half_w: f64, half_h: f64) -> Viewport {
        let c = world_size(zoom) / 2.0;
        let nw = unproject(Vec2::new(c - half_w, c - half_h), zoom);
        let se = unproject(Vec2::new(c + half_w, c + half_h), zoom);
        Viewport::new(LatLngBounds::from_corners(nw, se), zoom)
    }

    #[tokio::test]
    async fn invalid_cell_size_fails_at_construction() {
        let result = FeatureLayer::new(
            Arc::new(MemoryFeatureSource::new()),
            LayerOptions {
                cell_size: -1.0,
                ..LayerOptions::default()
            },
            viewport_at(4, 200.0, 200.0),
        );
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn loads_the_initial_viewport_and_hands_payloads_through() {
        let source = Arc::new(MemoryFeatureSource::new());
        let page = FeaturePage::new(serde_json::json!({
            "features": [{"attributes": {"id": 7}}]
        }));
        for _ in 0..4 {
            source.push_page(page.clone());
        }

        let (_layer, mut events) =
            FeatureLayer::new(source, options(), viewport_at(4, 200.0, 200.0)).unwrap();

        let mut arrivals = 0;
        loop {
            match events.recv().await.expect("event stream closed early") {
                LayerEvent::FeaturesArrived { page, .. } => {
                    assert_eq!(page.features().len(), 1);
                    arrivals += 1;
                }
                LayerEvent::LoadingFinished { .. } => break,
                _ => {}
            }
        }
        assert_eq!(arrivals, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_refetches_the_same_region() {
        let source = Arc::new(MemoryFeatureSource::new());
        let (layer, mut events) =
            FeatureLayer::new(source.clone(), options(), viewport_at(4, 200.0, 200.0)).unwrap();

        while !matches!(
            events.recv().await,
            Some(LayerEvent::LoadingFinished { .. })
        ) {}
        assert_eq!(source.call_count(), 4);

        layer.refresh();
        while !matches!(
            events.recv().await,
            Some(LayerEvent::LoadingFinished { .. })
        ) {}
        assert_eq!(source.call_count(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn pan_then_zoom_follows_the_dedupe_rules() {
        let source = Arc::new(MemoryFeatureSource::new());
        let (layer, mut events) =
            FeatureLayer::new(source.clone(), options(), viewport_at(4, 200.0, 200.0)).unwrap();

        while !matches!(
            events.recv().await,
            Some(LayerEvent::LoadingFinished { .. })
        ) {}

        // Pan inside the already-loaded cells: nothing new goes out.
        layer.notify_move(viewport_at(4, 210.0, 210.0));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(source.call_count(), 4);

        // Zoom re-anchors the grid and refetches.
        layer.notify_zoom(viewport_at(5, 200.0, 200.0));
        tokio::time::sleep(Duration::from_millis(500)).await;
        while !matches!(
            events.recv().await,
            Some(LayerEvent::LoadingFinished { .. })
        ) {}
        assert_eq!(source.call_count(), 8);
    }
}

use tokio::sync::Semaphore;

use crate::query::FeatureQuery;
use crate::source::{BoxFuture, FeaturePage, FeatureSource, SourceError};

/// Feature source whose responses are held back until the test releases
/// them, for exercising in-flight behavior deterministically.
pub(crate) struct GatedSource {
    gate: Semaphore,
}

impl GatedSource {
    pub(crate) fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
        }
    }

    /// Lets `n` pending queries resolve.
    pub(crate) fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }
}

impl FeatureSource for GatedSource {
    fn query(&self, _query: FeatureQuery) -> BoxFuture<'_, Result<FeaturePage, SourceError>> {
        Box::pin(async move {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| SourceError::transport("gate closed"))?;
            permit.forget();
            Ok(FeaturePage::empty())
        })
    }
}

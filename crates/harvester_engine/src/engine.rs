use harvester_core::{HarvestRequest, HarvestResult};

use crate::harvest::{EngineConfig, Harvester, ProgressSink};
use crate::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    Client(#[source] FetchError),
}

/// Blocking front for [`Harvester`]: owns a tokio runtime so synchronous
/// callers can run harvests without one of their own.
///
/// Must not be used from inside another tokio runtime.
pub struct EngineHandle {
    runtime: tokio::runtime::Runtime,
    harvester: Harvester,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("harvester-engine")
            .build()?;
        let harvester = {
            let _guard = runtime.enter();
            Harvester::new(config).map_err(EngineError::Client)?
        };
        Ok(Self { runtime, harvester })
    }

    pub fn harvest(&self, request: &HarvestRequest) -> HarvestResult {
        self.runtime.block_on(self.harvester.harvest(request))
    }

    pub fn harvest_with_sink(
        &self,
        request: &HarvestRequest,
        sink: &dyn ProgressSink,
    ) -> HarvestResult {
        self.runtime
            .block_on(self.harvester.harvest_with_sink(request, sink))
    }
}

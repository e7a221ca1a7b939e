//! Wiring of process-backed collaborators for one run

use std::sync::Arc;

use secstat_core::config::StatusConfig;
use secstat_core::execution::{ProcessExecutor, TokioProcessExecutor};
use secstat_core::sources::{
    AptPackageIndex, ProSubscription, ProcessAptSource, ProcessProSource, ProcessSnapSource,
    SnapPackages,
};
use secstat_core::status::{SecurityStatusAggregator, SecurityStatusService};
use tokio::runtime::Handle;

pub struct HostSources {
    pub index: AptPackageIndex<ProcessAptSource>,
    pub subscription: ProSubscription<ProcessProSource>,
    pub snaps: SnapPackages<ProcessSnapSource>,
}

impl HostSources {
    pub fn new(config: &StatusConfig, handle: Handle) -> Self {
        let executor: Arc<dyn ProcessExecutor> = Arc::new(TokioProcessExecutor);
        Self {
            index: AptPackageIndex::new(
                ProcessAptSource::new(executor.clone(), handle.clone())
                    .timeout(config.list_timeout),
            )
            .chunk_size(config.apt_query_chunk_size),
            subscription: ProSubscription::new(
                ProcessProSource::new(executor.clone(), handle.clone())
                    .timeout(config.status_timeout),
            ),
            snaps: SnapPackages::new(ProcessSnapSource::new(executor, handle)),
        }
    }

    pub fn status_service(&self, config: &StatusConfig) -> SecurityStatusService<'_> {
        SecurityStatusService::new(
            SecurityStatusAggregator::for_series(config.series.as_str()),
            &self.index,
            &self.subscription,
        )
    }
}

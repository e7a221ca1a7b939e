use std::sync::Arc;

use tokio::runtime::Handle;

use crate::execution::ProcessExecutor;
use crate::models::CoreResult;
use crate::sources::process_utils::run_and_collect_stdout;
use crate::sources::snap::{SnapSource, snap_list_request};

pub struct ProcessSnapSource {
    executor: Arc<dyn ProcessExecutor>,
    handle: Handle,
}

impl ProcessSnapSource {
    pub fn new(executor: Arc<dyn ProcessExecutor>, handle: Handle) -> Self {
        Self { executor, handle }
    }
}

impl SnapSource for ProcessSnapSource {
    fn list(&self) -> CoreResult<String> {
        run_and_collect_stdout(self.executor.as_ref(), &self.handle, snap_list_request())
    }
}

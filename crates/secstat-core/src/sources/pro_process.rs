use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::execution::ProcessExecutor;
use crate::models::CoreResult;
use crate::sources::pro::{ProSource, pro_status_request};
use crate::sources::process_utils::run_and_collect_stdout;

pub struct ProcessProSource {
    executor: Arc<dyn ProcessExecutor>,
    handle: Handle,
    timeout: Option<Duration>,
}

impl ProcessProSource {
    pub fn new(executor: Arc<dyn ProcessExecutor>, handle: Handle) -> Self {
        Self {
            executor,
            handle,
            timeout: None,
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl ProSource for ProcessProSource {
    fn status(&self) -> CoreResult<String> {
        let mut request = pro_status_request();
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        run_and_collect_stdout(self.executor.as_ref(), &self.handle, request)
    }
}

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::execution::{ProcessExecutor, ProcessSpawnRequest};
use crate::models::{CoreResult, SourceAction};
use crate::sources::apt::{
    AptSource, apt_cache_policy_request, apt_cache_show_request, apt_package_files_request,
    dpkg_installed_request,
};
use crate::sources::process_utils::run_and_collect_stdout;

pub struct ProcessAptSource {
    executor: Arc<dyn ProcessExecutor>,
    handle: Handle,
    timeout: Option<Duration>,
}

impl ProcessAptSource {
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

    fn run(&self, mut request: ProcessSpawnRequest) -> CoreResult<String> {
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }
        run_and_collect_stdout(self.executor.as_ref(), &self.handle, request)
    }
}

impl AptSource for ProcessAptSource {
    fn list_installed(&self) -> CoreResult<String> {
        self.run(dpkg_installed_request(SourceAction::ListInstalled))
    }

    fn package_files(&self) -> CoreResult<String> {
        self.run(apt_package_files_request())
    }

    fn policy(&self, names: &[String]) -> CoreResult<String> {
        self.run(apt_cache_policy_request(names))
    }

    fn show(&self, names: &[String]) -> CoreResult<String> {
        self.run(apt_cache_show_request(names))
    }
}

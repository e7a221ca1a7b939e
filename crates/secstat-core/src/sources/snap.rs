use std::time::Duration;

use tracing::debug;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::models::{ContainerPackage, CoreErrorKind, CoreResult, SourceAction, SourceId};
use crate::sources::ContainerPackageLister;

const SNAP_COMMAND: &str = "snap";
const LIST_TIMEOUT: Duration = Duration::from_secs(60);

pub trait SnapSource: Send + Sync {
    fn list(&self) -> CoreResult<String>;
}

pub struct SnapPackages<S: SnapSource> {
    source: S,
}

impl<S: SnapSource> SnapPackages<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: SnapSource> ContainerPackageLister for SnapPackages<S> {
    fn installed_container_packages(&self) -> CoreResult<Vec<ContainerPackage>> {
        let raw = match self.source.list() {
            Ok(raw) => raw,
            // Machines without snapd simply have no snaps.
            Err(error) if error.kind == CoreErrorKind::Unavailable => {
                debug!(%error, "snap is not installed");
                return Ok(Vec::new());
            }
            Err(error) => return Err(error),
        };
        Ok(parse_snap_list(&raw))
    }
}

pub fn snap_list_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        SourceId::Snap,
        SourceAction::ListContainerPackages,
        CommandSpec::new(SNAP_COMMAND).arg("list").env("LC_ALL", "C"),
    )
    .timeout(LIST_TIMEOUT)
}

fn parse_snap_list(output: &str) -> Vec<ContainerPackage> {
    let mut packages = Vec::new();

    // First line is the column header.
    for line in output.lines().skip(1) {
        // Format: "core22  20230801  864  latest/stable  canonical**  base"
        let mut columns = line.split_whitespace();
        let (Some(name), Some(version)) = (columns.next(), columns.next()) else {
            continue;
        };
        packages.push(ContainerPackage {
            name: name.to_owned(),
            version: version.to_owned(),
        });
    }

    packages
}

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::classify::OriginTable;
use crate::models::{InstalledPackage, ServiceBucket, VersionRecord};
use crate::version::VersionOrdering;

/// One newer version of an installed package, served by a security origin.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecurityUpdate {
    pub package: String,
    pub version: VersionRecord,
    pub site: String,
}

/// Newer security versions grouped by the service that provides them.
///
/// Services iterate in [`ServiceBucket`] declaration order; within a service the
/// updates keep package order, then version order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SecurityUpdates {
    by_service: BTreeMap<ServiceBucket, Vec<SecurityUpdate>>,
}

impl SecurityUpdates {
    pub fn for_service(&self, service: ServiceBucket) -> &[SecurityUpdate] {
        self.by_service
            .get(&service)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, service: ServiceBucket) -> usize {
        self.for_service(service).len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServiceBucket, &[SecurityUpdate])> {
        self.by_service
            .iter()
            .map(|(service, updates)| (*service, updates.as_slice()))
    }

    /// Names of packages with at least one update from `service`.
    pub fn package_names(&self, service: ServiceBucket) -> BTreeSet<&str> {
        self.for_service(service)
            .iter()
            .map(|update| update.package.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_service.is_empty()
    }
}

pub struct SecurityUpdateScanner<'a> {
    table: &'a OriginTable,
    ordering: &'a dyn VersionOrdering,
}

impl<'a> SecurityUpdateScanner<'a> {
    pub fn new(table: &'a OriginTable, ordering: &'a dyn VersionOrdering) -> Self {
        Self { table, ordering }
    }

    pub fn scan<'p>(
        &self,
        packages: impl IntoIterator<Item = &'p InstalledPackage>,
    ) -> SecurityUpdates {
        let mut updates = SecurityUpdates::default();

        for package in packages {
            for version in &package.available_versions {
                if !self.is_newer(package, version) {
                    continue;
                }

                // One version counts once, under the first origin that matches.
                let matched = version
                    .origins
                    .iter()
                    .find_map(|origin| self.table.service_for(origin).map(|s| (s, origin)));

                if let Some((service, origin)) = matched {
                    updates
                        .by_service
                        .entry(service)
                        .or_default()
                        .push(SecurityUpdate {
                            package: package.name.clone(),
                            version: version.clone(),
                            site: origin.site.clone(),
                        });
                }
            }
        }

        debug!(
            services = updates.by_service.len(),
            updates = updates.by_service.values().map(Vec::len).sum::<usize>(),
            "security update scan finished"
        );
        updates
    }

    fn is_newer(&self, package: &InstalledPackage, version: &VersionRecord) -> bool {
        match self
            .ordering
            .compare(&version.version, &package.installed_version.version)
        {
            Some(ordering) => ordering == Ordering::Greater,
            None => {
                debug!(
                    package = %package.name,
                    version = %version.version,
                    installed = %package.installed_version.version,
                    "skipping version that cannot be ordered"
                );
                false
            }
        }
    }
}

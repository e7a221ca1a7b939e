use tracing::trace;

use crate::models::{InstalledPackage, OriginTuple, ServiceBucket};

const UBUNTU_ORIGIN: &str = "Ubuntu";
const ESM_INFRA_ORIGIN: &str = "UbuntuESM";
const ESM_APPS_ORIGIN: &str = "UbuntuESMApps";

/// Maps `(origin, archive)` pairs of the running series onto security services.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OriginTable {
    series: String,
    entries: Vec<(String, String, ServiceBucket)>,
}

impl OriginTable {
    pub fn for_series(series: impl Into<String>) -> Self {
        let series = series.into();
        let entry = |origin: &str, suffix: &str, service| {
            (origin.to_string(), format!("{series}-{suffix}"), service)
        };
        let entries = vec![
            entry(UBUNTU_ORIGIN, "security", ServiceBucket::StandardSecurity),
            entry(ESM_APPS_ORIGIN, "apps-security", ServiceBucket::EsmApps),
            entry(ESM_INFRA_ORIGIN, "infra-security", ServiceBucket::EsmInfra),
            entry(ESM_APPS_ORIGIN, "apps-updates", ServiceBucket::EsmApps),
            entry(ESM_INFRA_ORIGIN, "infra-updates", ServiceBucket::EsmInfra),
        ];
        Self { series, entries }
    }

    pub fn series(&self) -> &str {
        &self.series
    }

    pub fn service_for(&self, origin: &OriginTuple) -> Option<ServiceBucket> {
        self.entries
            .iter()
            .find(|(label, archive, _)| {
                *label == origin.origin_label && *archive == origin.archive_label
            })
            .map(|(_, _, service)| *service)
    }
}

/// Decides which service "owns" an installed package.
///
/// Packages don't have origins, their versions do. The installed version is
/// inspected first; when it only carries the local dpkg record the candidate
/// version stands in for it.
#[derive(Clone, Debug)]
pub struct OriginClassifier {
    table: OriginTable,
}

impl OriginClassifier {
    pub fn new(table: OriginTable) -> Self {
        Self { table }
    }

    pub fn for_series(series: impl Into<String>) -> Self {
        Self::new(OriginTable::for_series(series))
    }

    pub fn table(&self) -> &OriginTable {
        &self.table
    }

    /// Ubuntu origins with a component outside main/restricted/universe/multiverse
    /// classify as [`ServiceBucket::Unknown`] and count towards unknown packages.
    pub fn classify(&self, package: &InstalledPackage) -> ServiceBucket {
        let mut origins = &package.installed_version.origins;

        if origins.len() == 1 {
            if package.candidate_is_installed() {
                return ServiceBucket::Unknown;
            }
            match package.candidate_version() {
                Some(candidate) => origins = &candidate.origins,
                None => return ServiceBucket::Unknown,
            }
        }

        for origin in origins {
            if let Some(service) = self.table.service_for(origin)
                && service.is_esm()
            {
                return service;
            }
            if origin.origin_label == UBUNTU_ORIGIN {
                trace!(
                    package = %package.name,
                    component = %origin.component,
                    "classified by archive component"
                );
                return ServiceBucket::from_component(&origin.component)
                    .unwrap_or(ServiceBucket::Unknown);
            }
        }

        ServiceBucket::ThirdParty
    }
}

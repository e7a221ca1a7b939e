//! Security status report and per-service package listings.
//!
//! The aggregator classifies every installed package, scans for newer
//! security versions, and gates each service against the subscription
//! snapshot. Everything here is a pure transformation of collaborator output;
//! collaborator failures are returned as-is and no partial report is built.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::OriginClassifier;
use crate::entitlement::availability;
use crate::models::report::REPORT_SCHEMA_VERSION;
use crate::models::{
    CoreResult, InstalledPackage, SecurityReport, SecuritySummary, ServiceBucket,
    SubscriptionStatus, UpgradablePackage,
};
use crate::scan::{SecurityUpdateScanner, SecurityUpdates};
use crate::sources::{PackageIndex, SubscriptionStatusSource};
use crate::version::{DpkgVersionOrdering, VersionOrdering};

/// Installed packages partitioned by origin bucket.
#[derive(Clone, Debug, Default)]
pub struct PackagesByOrigin {
    all: Vec<InstalledPackage>,
    buckets: BTreeMap<ServiceBucket, Vec<usize>>,
}

impl PackagesByOrigin {
    pub fn all(&self) -> &[InstalledPackage] {
        &self.all
    }

    pub fn bucket(&self, bucket: ServiceBucket) -> impl Iterator<Item = &InstalledPackage> {
        self.buckets
            .get(&bucket)
            .into_iter()
            .flatten()
            .map(|index| &self.all[*index])
    }

    pub fn count(&self, bucket: ServiceBucket) -> usize {
        self.buckets.get(&bucket).map_or(0, Vec::len)
    }

    /// Packages of several buckets, bucket by bucket in the order given.
    pub fn buckets<'a>(
        &'a self,
        buckets: &'a [ServiceBucket],
    ) -> impl Iterator<Item = &'a InstalledPackage> {
        buckets.iter().flat_map(|bucket| self.bucket(*bucket))
    }
}

/// Counts shown at the top of every human-readable view.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub installed: usize,
    pub main_restricted: usize,
    pub universe_multiverse: usize,
    pub third_party: usize,
    pub unknown: usize,
    pub esm_infra_installed: usize,
    pub esm_apps_installed: usize,
}

impl From<&SecuritySummary> for PackageSummary {
    fn from(summary: &SecuritySummary) -> Self {
        Self {
            installed: summary.num_installed_packages,
            main_restricted: summary.num_main_packages
                + summary.num_restricted_packages
                + summary.num_esm_infra_packages,
            universe_multiverse: summary.num_universe_packages
                + summary.num_multiverse_packages
                + summary.num_esm_apps_packages,
            third_party: summary.num_third_party_packages,
            unknown: summary.num_unknown_packages,
            esm_infra_installed: summary.num_esm_infra_packages,
            esm_apps_installed: summary.num_esm_apps_packages,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ListingKind {
    ThirdParty,
    Unknown,
    EsmInfra,
    EsmApps,
}

impl ListingKind {
    /// Origin buckets whose packages make up the listing, in display order.
    pub fn buckets(self) -> &'static [ServiceBucket] {
        match self {
            Self::ThirdParty => &[ServiceBucket::ThirdParty],
            Self::Unknown => &[ServiceBucket::Unknown],
            Self::EsmInfra => &[
                ServiceBucket::EsmInfra,
                ServiceBucket::Main,
                ServiceBucket::Restricted,
            ],
            Self::EsmApps => &[
                ServiceBucket::EsmApps,
                ServiceBucket::Universe,
                ServiceBucket::Multiverse,
            ],
        }
    }

    /// ESM service whose pending updates are highlighted in the listing.
    pub fn update_service(self) -> Option<ServiceBucket> {
        match self {
            Self::EsmInfra => Some(ServiceBucket::EsmInfra),
            Self::EsmApps => Some(ServiceBucket::EsmApps),
            Self::ThirdParty | Self::Unknown => None,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackageListing {
    pub kind: ListingKind,
    pub summary: PackageSummary,
    pub packages: Vec<String>,
    /// Packages in the listing with a newer version from the listing's ESM service.
    pub with_updates: BTreeSet<String>,
    /// Example package for policy hints; always the first listed package.
    pub hint_package: Option<String>,
}

pub struct SecurityStatusAggregator {
    classifier: OriginClassifier,
    ordering: Box<dyn VersionOrdering>,
}

impl SecurityStatusAggregator {
    pub fn new(classifier: OriginClassifier) -> Self {
        Self::with_ordering(classifier, Box::new(DpkgVersionOrdering))
    }

    pub fn with_ordering(
        classifier: OriginClassifier,
        ordering: Box<dyn VersionOrdering>,
    ) -> Self {
        Self {
            classifier,
            ordering,
        }
    }

    pub fn for_series(series: impl Into<String>) -> Self {
        Self::new(OriginClassifier::for_series(series))
    }

    pub fn classifier(&self) -> &OriginClassifier {
        &self.classifier
    }

    pub fn partition(&self, packages: Vec<InstalledPackage>) -> PackagesByOrigin {
        let mut buckets: BTreeMap<ServiceBucket, Vec<usize>> = BTreeMap::new();
        for (index, package) in packages.iter().enumerate() {
            buckets
                .entry(self.classifier.classify(package))
                .or_default()
                .push(index);
        }
        PackagesByOrigin {
            all: packages,
            buckets,
        }
    }

    pub fn scan<'p>(
        &self,
        packages: impl IntoIterator<Item = &'p InstalledPackage>,
    ) -> SecurityUpdates {
        SecurityUpdateScanner::new(self.classifier.table(), self.ordering.as_ref())
            .scan(packages)
    }

    pub fn build_report(
        &self,
        packages: Vec<InstalledPackage>,
        status: SubscriptionStatus,
    ) -> SecurityReport {
        let by_origin = self.partition(packages);
        let updates = self.scan(by_origin.all());

        let mut upgradable = Vec::new();
        for (service, service_updates) in updates.iter() {
            let service_status = availability(service, &status);
            upgradable.extend(service_updates.iter().map(|update| UpgradablePackage {
                package: update.package.clone(),
                version: update.version.version.clone(),
                service_name: service,
                status: service_status,
                origin: update.site.clone(),
                download_size: update.version.download_size,
            }));
        }

        debug!(
            installed = by_origin.all().len(),
            upgradable = upgradable.len(),
            attached = status.attached,
            "built security status report"
        );

        SecurityReport {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            summary: SecuritySummary {
                num_installed_packages: by_origin.all().len(),
                num_main_packages: by_origin.count(ServiceBucket::Main),
                num_restricted_packages: by_origin.count(ServiceBucket::Restricted),
                num_universe_packages: by_origin.count(ServiceBucket::Universe),
                num_multiverse_packages: by_origin.count(ServiceBucket::Multiverse),
                num_third_party_packages: by_origin.count(ServiceBucket::ThirdParty),
                num_unknown_packages: by_origin.count(ServiceBucket::Unknown),
                num_esm_infra_packages: by_origin.count(ServiceBucket::EsmInfra),
                num_esm_apps_packages: by_origin.count(ServiceBucket::EsmApps),
                num_esm_infra_updates: updates.count(ServiceBucket::EsmInfra),
                num_esm_apps_updates: updates.count(ServiceBucket::EsmApps),
                num_standard_security_updates: updates.count(ServiceBucket::StandardSecurity),
                ua: status,
            },
            packages: upgradable,
        }
    }

    pub fn summarize(&self, by_origin: &PackagesByOrigin) -> PackageSummary {
        let count = |buckets: &[ServiceBucket]| -> usize {
            buckets.iter().map(|bucket| by_origin.count(*bucket)).sum()
        };
        PackageSummary {
            installed: by_origin.all().len(),
            main_restricted: count(ListingKind::EsmInfra.buckets()),
            universe_multiverse: count(ListingKind::EsmApps.buckets()),
            third_party: by_origin.count(ServiceBucket::ThirdParty),
            unknown: by_origin.count(ServiceBucket::Unknown),
            esm_infra_installed: by_origin.count(ServiceBucket::EsmInfra),
            esm_apps_installed: by_origin.count(ServiceBucket::EsmApps),
        }
    }

    pub fn listing(&self, kind: ListingKind, by_origin: &PackagesByOrigin) -> PackageListing {
        let members: Vec<&InstalledPackage> = by_origin.buckets(kind.buckets()).collect();

        let with_updates = match kind.update_service() {
            Some(service) => self
                .scan(members.iter().copied())
                .package_names(service)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => BTreeSet::new(),
        };

        let packages: Vec<String> = members.iter().map(|p| p.name.clone()).collect();
        PackageListing {
            kind,
            summary: self.summarize(by_origin),
            hint_package: packages.first().cloned(),
            packages,
            with_updates,
        }
    }
}

/// Report and listing entry points backed by live collaborators.
pub struct SecurityStatusService<'a> {
    aggregator: SecurityStatusAggregator,
    index: &'a dyn PackageIndex,
    subscription: &'a dyn SubscriptionStatusSource,
}

impl<'a> SecurityStatusService<'a> {
    pub fn new(
        aggregator: SecurityStatusAggregator,
        index: &'a dyn PackageIndex,
        subscription: &'a dyn SubscriptionStatusSource,
    ) -> Self {
        Self {
            aggregator,
            index,
            subscription,
        }
    }

    pub fn aggregator(&self) -> &SecurityStatusAggregator {
        &self.aggregator
    }

    pub fn security_status(&self) -> CoreResult<SecurityReport> {
        let status = self.subscription.subscription_status()?;
        let packages = self.index.installed_packages_with_origins()?;
        Ok(self.aggregator.build_report(packages, status))
    }

    pub fn packages_by_origin(&self) -> CoreResult<PackagesByOrigin> {
        let packages = self.index.installed_packages_with_origins()?;
        Ok(self.aggregator.partition(packages))
    }

    pub fn listing(&self, kind: ListingKind) -> CoreResult<PackageListing> {
        let by_origin = self.packages_by_origin()?;
        Ok(self.aggregator.listing(kind, &by_origin))
    }
}

#[cfg(test)]
mod tests {
    use crate::models::{
        InstalledPackage, OriginTuple, ServiceBucket, SubscriptionStatus, UpdateAvailability,
        VersionRecord,
    };

    use super::{ListingKind, PackageSummary, SecurityStatusAggregator};

    fn archive(component: &str) -> OriginTuple {
        OriginTuple::new("Ubuntu", "jammy", component, "archive.ubuntu.com")
    }

    fn package(name: &str, installed: VersionRecord, newer: Vec<VersionRecord>) -> InstalledPackage {
        let installed = installed.origin(OriginTuple::local_install());
        let mut available = newer;
        available.push(installed.clone());
        InstalledPackage {
            name: name.to_string(),
            candidate: available.first().map(|v| v.version.clone()),
            installed_version: installed,
            available_versions: available,
        }
    }

    fn fixture() -> Vec<InstalledPackage> {
        vec![
            package(
                "openssl",
                VersionRecord::new("3.0.2-0ubuntu1").origin(archive("main")),
                vec![VersionRecord::new("3.0.2-0ubuntu1.10")
                    .download_size(1_200)
                    .origin(OriginTuple::new("Ubuntu", "jammy-security", "main", "security.ubuntu.com"))],
            ),
            package(
                "libavcodec58",
                VersionRecord::new("4.4.1-3ubuntu5").origin(archive("universe")),
                vec![VersionRecord::new("4.4.1-3ubuntu5+esm1")
                    .download_size(5_000)
                    .origin(OriginTuple::new("UbuntuESMApps", "jammy-apps-security", "main", "esm.ubuntu.com"))],
            ),
            package(
                "linux-firmware",
                VersionRecord::new("20220329").origin(archive("restricted")),
                Vec::new(),
            ),
            package(
                "google-chrome-stable",
                VersionRecord::new("120.0").origin(OriginTuple::new("Google LLC", "stable", "main", "dl.google.com")),
                Vec::new(),
            ),
            package("local-tool", VersionRecord::new("0.1"), Vec::new()),
        ]
    }

    #[test]
    fn summary_counts_every_bucket() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let report = aggregator.build_report(fixture(), SubscriptionStatus::unattached());
        let summary = &report.summary;

        assert_eq!(report.schema_version, "0.1");
        assert_eq!(summary.num_installed_packages, 5);
        assert_eq!(summary.num_main_packages, 1);
        assert_eq!(summary.num_restricted_packages, 1);
        assert_eq!(summary.num_universe_packages, 1);
        assert_eq!(summary.num_multiverse_packages, 0);
        assert_eq!(summary.num_third_party_packages, 1);
        assert_eq!(summary.num_unknown_packages, 1);
        assert_eq!(summary.num_esm_infra_packages, 0);
        assert_eq!(summary.num_esm_apps_packages, 0);
        assert_eq!(summary.num_standard_security_updates, 1);
        assert_eq!(summary.num_esm_apps_updates, 1);
        assert_eq!(summary.num_esm_infra_updates, 0);
    }

    #[test]
    fn packages_are_service_major_and_gated() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let report = aggregator.build_report(fixture(), SubscriptionStatus::unattached());

        assert_eq!(report.packages.len(), 2);
        assert_eq!(report.packages[0].package, "openssl");
        assert_eq!(report.packages[0].service_name, ServiceBucket::StandardSecurity);
        assert_eq!(report.packages[0].status, UpdateAvailability::UpgradeAvailable);
        assert_eq!(report.packages[0].origin, "security.ubuntu.com");
        assert_eq!(report.packages[0].download_size, 1_200);
        assert_eq!(report.packages[1].package, "libavcodec58");
        assert_eq!(report.packages[1].version, "4.4.1-3ubuntu5+esm1");
        assert_eq!(report.packages[1].service_name, ServiceBucket::EsmApps);
        assert_eq!(report.packages[1].status, UpdateAvailability::PendingAttach);
    }

    #[test]
    fn attached_and_enabled_makes_esm_available() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let status = SubscriptionStatus::attached(&[ServiceBucket::EsmApps], &[ServiceBucket::EsmApps]);
        let report = aggregator.build_report(fixture(), status);

        assert_eq!(report.packages[1].status, UpdateAvailability::UpgradeAvailable);
        assert!(report.summary.ua.attached);
    }

    #[test]
    fn report_json_is_stable_between_runs() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let first = aggregator
            .build_report(fixture(), SubscriptionStatus::unattached())
            .to_json()
            .unwrap();
        let second = aggregator
            .build_report(fixture(), SubscriptionStatus::unattached())
            .to_json()
            .unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with(r#"{"_schema_version":"0.1","summary":{"ua":{"attached":false"#));
        assert!(first.contains(r#""service_name":"esm-apps","status":"pending_attach""#));
    }

    #[test]
    fn esm_apps_listing_highlights_packages_with_updates() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let by_origin = aggregator.partition(fixture());
        let listing = aggregator.listing(ListingKind::EsmApps, &by_origin);

        assert_eq!(listing.packages, vec!["libavcodec58".to_string()]);
        assert!(listing.with_updates.contains("libavcodec58"));
        assert_eq!(listing.hint_package.as_deref(), Some("libavcodec58"));
        assert_eq!(listing.summary.universe_multiverse, 1);
        assert_eq!(listing.summary.main_restricted, 2);
    }

    #[test]
    fn esm_infra_listing_orders_esm_then_main_then_restricted() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let by_origin = aggregator.partition(fixture());
        let listing = aggregator.listing(ListingKind::EsmInfra, &by_origin);

        assert_eq!(listing.packages, vec!["openssl".to_string(), "linux-firmware".to_string()]);
        // openssl's update comes from standard security, not esm-infra
        assert!(listing.with_updates.is_empty());
    }

    #[test]
    fn third_party_and_unknown_listings() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let by_origin = aggregator.partition(fixture());

        let third_party = aggregator.listing(ListingKind::ThirdParty, &by_origin);
        assert_eq!(third_party.packages, vec!["google-chrome-stable".to_string()]);
        assert!(third_party.with_updates.is_empty());

        let unknown = aggregator.listing(ListingKind::Unknown, &by_origin);
        assert_eq!(unknown.packages, vec!["local-tool".to_string()]);
        assert_eq!(unknown.hint_package.as_deref(), Some("local-tool"));
    }

    #[test]
    fn empty_listing_has_no_hint() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let by_origin = aggregator.partition(Vec::new());
        let listing = aggregator.listing(ListingKind::ThirdParty, &by_origin);

        assert!(listing.packages.is_empty());
        assert!(listing.hint_package.is_none());
        assert_eq!(listing.summary.installed, 0);
    }

    #[test]
    fn report_summary_converts_to_listing_summary() {
        let aggregator = SecurityStatusAggregator::for_series("jammy");
        let by_origin = aggregator.partition(fixture());
        let report = aggregator.build_report(fixture(), SubscriptionStatus::unattached());

        assert_eq!(
            PackageSummary::from(&report.summary),
            aggregator.summarize(&by_origin)
        );
    }
}

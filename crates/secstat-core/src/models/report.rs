use serde::{Deserialize, Serialize};

use crate::models::{ServiceBucket, SubscriptionStatus, UpdateAvailability};

pub const REPORT_SCHEMA_VERSION: &str = "0.1";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SecuritySummary {
    pub ua: SubscriptionStatus,
    pub num_installed_packages: usize,
    pub num_main_packages: usize,
    pub num_restricted_packages: usize,
    pub num_universe_packages: usize,
    pub num_multiverse_packages: usize,
    pub num_third_party_packages: usize,
    pub num_unknown_packages: usize,
    pub num_esm_infra_packages: usize,
    pub num_esm_apps_packages: usize,
    pub num_esm_infra_updates: usize,
    pub num_esm_apps_updates: usize,
    pub num_standard_security_updates: usize,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct UpgradablePackage {
    pub package: String,
    pub version: String,
    pub service_name: ServiceBucket,
    pub status: UpdateAvailability,
    pub origin: String,
    pub download_size: u64,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SecurityReport {
    #[serde(rename = "_schema_version")]
    pub schema_version: String,
    pub summary: SecuritySummary,
    pub packages: Vec<UpgradablePackage>,
}

impl SecurityReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub manifest_data: String,
}

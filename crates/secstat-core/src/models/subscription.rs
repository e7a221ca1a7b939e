use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::ServiceBucket;

/// Snapshot of the machine's subscription, as reported by the status collaborator.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionStatus {
    pub attached: bool,
    pub enabled_services: BTreeSet<ServiceBucket>,
    pub entitled_services: BTreeSet<ServiceBucket>,
}

impl SubscriptionStatus {
    pub fn unattached() -> Self {
        Self::default()
    }

    /// Builds an attached snapshot; anything that is not an ESM service is dropped.
    pub fn attached(entitled: &[ServiceBucket], enabled: &[ServiceBucket]) -> Self {
        Self {
            attached: true,
            enabled_services: enabled.iter().copied().filter(|s| s.is_esm()).collect(),
            entitled_services: entitled.iter().copied().filter(|s| s.is_esm()).collect(),
        }
    }

    pub fn is_entitled(&self, service: ServiceBucket) -> bool {
        self.entitled_services.contains(&service)
    }

    pub fn is_enabled(&self, service: ServiceBucket) -> bool {
        self.enabled_services.contains(&service)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateAvailability {
    UpgradeAvailable,
    PendingAttach,
    PendingEnable,
    UpgradeUnavailable,
}

impl UpdateAvailability {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpgradeAvailable => "upgrade_available",
            Self::PendingAttach => "pending_attach",
            Self::PendingEnable => "pending_enable",
            Self::UpgradeUnavailable => "upgrade_unavailable",
        }
    }
}

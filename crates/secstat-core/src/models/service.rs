use serde::{Deserialize, Serialize};

/// Closed classification set for packages and update opportunities.
///
/// Declaration order is also the iteration order of every per-service map in
/// a report, which keeps the `packages` list stable between runs.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServiceBucket {
    StandardSecurity,
    EsmInfra,
    EsmApps,
    Main,
    Restricted,
    Universe,
    Multiverse,
    ThirdParty,
    Unknown,
}

impl ServiceBucket {
    pub const ALL: [ServiceBucket; 9] = [
        Self::StandardSecurity,
        Self::EsmInfra,
        Self::EsmApps,
        Self::Main,
        Self::Restricted,
        Self::Universe,
        Self::Multiverse,
        Self::ThirdParty,
        Self::Unknown,
    ];

    pub const ESM: [ServiceBucket; 2] = [Self::EsmInfra, Self::EsmApps];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StandardSecurity => "standard-security",
            Self::EsmInfra => "esm-infra",
            Self::EsmApps => "esm-apps",
            Self::Main => "main",
            Self::Restricted => "restricted",
            Self::Universe => "universe",
            Self::Multiverse => "multiverse",
            Self::ThirdParty => "third-party",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_esm(self) -> bool {
        matches!(self, Self::EsmInfra | Self::EsmApps)
    }

    /// Maps an Ubuntu archive component onto its bucket.
    pub fn from_component(component: &str) -> Option<Self> {
        match component {
            "main" => Some(Self::Main),
            "restricted" => Some(Self::Restricted),
            "universe" => Some(Self::Universe),
            "multiverse" => Some(Self::Multiverse),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServiceBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ServiceBucket {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == value)
            .ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::ServiceBucket;

    #[test]
    fn buckets_roundtrip_to_and_from_labels() {
        for bucket in ServiceBucket::ALL {
            let parsed: Option<ServiceBucket> = bucket.as_str().parse().ok();
            assert_eq!(parsed, Some(bucket));
        }
        assert!("esm".parse::<ServiceBucket>().is_err());
    }

    #[test]
    fn serializes_as_kebab_case_labels() {
        let json = serde_json::to_string(&ServiceBucket::StandardSecurity).unwrap();
        assert_eq!(json, "\"standard-security\"");
        let json = serde_json::to_string(&ServiceBucket::ThirdParty).unwrap();
        assert_eq!(json, "\"third-party\"");
    }

    #[test]
    fn only_components_map_to_archive_buckets() {
        assert_eq!(
            ServiceBucket::from_component("universe"),
            Some(ServiceBucket::Universe)
        );
        assert_eq!(ServiceBucket::from_component("esm-infra"), None);
        assert_eq!(ServiceBucket::from_component(""), None);
    }
}

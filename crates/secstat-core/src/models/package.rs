use serde::{Deserialize, Serialize};

/// Archive label apt gives the dpkg status file, i.e. "installed locally".
pub const LOCAL_INSTALL_ARCHIVE: &str = "now";

#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct OriginTuple {
    pub origin_label: String,
    pub archive_label: String,
    pub component: String,
    pub site: String,
}

impl OriginTuple {
    pub fn new(
        origin_label: impl Into<String>,
        archive_label: impl Into<String>,
        component: impl Into<String>,
        site: impl Into<String>,
    ) -> Self {
        Self {
            origin_label: origin_label.into(),
            archive_label: archive_label.into(),
            component: component.into(),
            site: site.into(),
        }
    }

    pub fn local_install() -> Self {
        Self {
            archive_label: LOCAL_INSTALL_ARCHIVE.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub version: String,
    pub download_size: u64,
    pub origins: Vec<OriginTuple>,
}

impl VersionRecord {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            download_size: 0,
            origins: Vec::new(),
        }
    }

    pub fn download_size(mut self, download_size: u64) -> Self {
        self.download_size = download_size;
        self
    }

    pub fn origin(mut self, origin: OriginTuple) -> Self {
        self.origins.push(origin);
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct InstalledPackage {
    pub name: String,
    pub installed_version: VersionRecord,
    /// Every version the index knows about, installed one included, in index order.
    pub available_versions: Vec<VersionRecord>,
    /// Version string of the index's preferred candidate, if it has one.
    pub candidate: Option<String>,
}

impl InstalledPackage {
    pub fn candidate_version(&self) -> Option<&VersionRecord> {
        let candidate = self.candidate.as_deref()?;
        if candidate == self.installed_version.version {
            return Some(&self.installed_version);
        }
        self.available_versions
            .iter()
            .find(|version| version.version == candidate)
    }

    /// Whether the candidate is the installed version (or there is no candidate at all).
    pub fn candidate_is_installed(&self) -> bool {
        match self.candidate.as_deref() {
            Some(candidate) => candidate == self.installed_version.version,
            None => true,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ContainerPackage {
    pub name: String,
    pub version: String,
}

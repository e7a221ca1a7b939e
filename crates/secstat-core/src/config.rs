use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::models::{CoreError, CoreErrorKind, CoreResult, SourceAction, SourceId};
use crate::sources::apt::DEFAULT_CHUNK_SIZE;

pub const OS_RELEASE_PATH: &str = "/etc/os-release";

const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_STATUS_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings shared by every report and manifest run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StatusConfig {
    /// Release codename, e.g. "jammy". Drives the origin table.
    pub series: String,
    pub apt_query_chunk_size: usize,
    pub list_timeout: Duration,
    pub status_timeout: Duration,
}

impl StatusConfig {
    pub fn new(series: impl Into<String>) -> Self {
        Self {
            series: series.into(),
            apt_query_chunk_size: DEFAULT_CHUNK_SIZE,
            list_timeout: DEFAULT_LIST_TIMEOUT,
            status_timeout: DEFAULT_STATUS_TIMEOUT,
        }
    }

    /// Uses `series` when given, otherwise reads the codename from `os_release`.
    pub fn resolve(series: Option<String>, os_release: &Path) -> CoreResult<Self> {
        match series {
            Some(series) if !series.trim().is_empty() => Ok(Self::new(series.trim())),
            _ => Ok(Self::new(ReleaseInfo::load(os_release)?.require_series()?)),
        }
    }
}

/// The subset of os-release(5) the classifier cares about.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReleaseInfo {
    pub id: Option<String>,
    pub version_id: Option<String>,
    pub version_codename: Option<String>,
    pub ubuntu_codename: Option<String>,
}

impl ReleaseInfo {
    pub fn parse(content: &str) -> Self {
        let mut info = Self::default();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            if value.is_empty() {
                continue;
            }
            let slot = match key.trim() {
                "ID" => &mut info.id,
                "VERSION_ID" => &mut info.version_id,
                "VERSION_CODENAME" => &mut info.version_codename,
                "UBUNTU_CODENAME" => &mut info.ubuntu_codename,
                _ => continue,
            };
            *slot = Some(value.to_owned());
        }

        info
    }

    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|error| {
            release_error(format!("failed to read {}: {error}", path.display()))
        })?;
        let info = Self::parse(&content);
        debug!(path = %path.display(), series = ?info.series(), "read release info");
        Ok(info)
    }

    pub fn series(&self) -> Option<&str> {
        self.version_codename
            .as_deref()
            .or(self.ubuntu_codename.as_deref())
    }

    pub fn require_series(&self) -> CoreResult<String> {
        self.series()
            .map(str::to_owned)
            .ok_or_else(|| release_error("os-release does not name a release codename".to_string()))
    }
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn release_error(message: String) -> CoreError {
    CoreError::new(
        SourceId::Release,
        SourceAction::DetectRelease,
        CoreErrorKind::Unavailable,
        message,
    )
}

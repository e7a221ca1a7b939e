use std::collections::{HashMap, HashSet};
use std::time::Duration;

use tracing::{debug, warn};

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::models::{
    CoreResult, InstalledPackage, OriginTuple, SourceAction, SourceId, VersionRecord,
};
use crate::sources::{ManifestLineSource, PackageIndex};

const DPKG_QUERY_COMMAND: &str = "dpkg-query";
const APT_CACHE_COMMAND: &str = "apt-cache";
const DPKG_STATUS_FILE: &str = "/var/lib/dpkg/status";
const INSTALLED_FORMAT: &str = "${db:Status-Abbrev}\t${Package}\t${Version}\n";
const LIST_TIMEOUT: Duration = Duration::from_secs(120);

pub const DEFAULT_CHUNK_SIZE: usize = 256;

pub trait AptSource: Send + Sync {
    /// `dpkg-query` rows of status, name and version.
    fn list_installed(&self) -> CoreResult<String>;
    /// Global `apt-cache policy` output describing every package file.
    fn package_files(&self) -> CoreResult<String>;
    /// `apt-cache policy` version tables for `names`.
    fn policy(&self, names: &[String]) -> CoreResult<String>;
    /// `apt-cache show` stanzas for `names`.
    fn show(&self, names: &[String]) -> CoreResult<String>;
}

pub struct AptPackageIndex<S: AptSource> {
    source: S,
    chunk_size: usize,
}

impl<S: AptSource> AptPackageIndex<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl<S: AptSource> PackageIndex for AptPackageIndex<S> {
    fn installed_packages_with_origins(&self) -> CoreResult<Vec<InstalledPackage>> {
        let mut seen = HashSet::new();
        let installed: Vec<(String, String)> = parse_dpkg_installed(&self.source.list_installed()?)
            .into_iter()
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect();
        let files = parse_package_files(&self.source.package_files()?);

        let names: Vec<String> = installed.iter().map(|(name, _)| name.clone()).collect();
        let mut policies = HashMap::new();
        let mut sizes = HashMap::new();
        for chunk in names.chunks(self.chunk_size) {
            for entry in parse_policy(&self.source.policy(chunk)?, &files) {
                policies.insert(entry.name.clone(), entry);
            }
            // Sizes are informational; a failing `show` must not sink the scan.
            match self.source.show(chunk) {
                Ok(raw) => sizes.extend(parse_show_sizes(&raw)),
                Err(error) => warn!(%error, "apt-cache show failed; download sizes unknown"),
            }
        }

        let packages: Vec<InstalledPackage> = installed
            .into_iter()
            .map(|(name, version)| {
                let policy = policies.remove(&name);
                build_installed_package(name, version, policy, &sizes)
            })
            .collect();

        debug!(
            packages = packages.len(),
            package_files = files.len(),
            "read installed packages from apt"
        );
        Ok(packages)
    }
}

impl<S: AptSource> ManifestLineSource for AptPackageIndex<S> {
    fn manifest_lines(&self) -> CoreResult<Vec<String>> {
        let raw = self.source.list_installed()?;
        Ok(parse_dpkg_installed(&raw)
            .into_iter()
            .map(|(name, version)| format!("{name}\t{version}"))
            .collect())
    }
}

pub fn dpkg_installed_request(action: SourceAction) -> ProcessSpawnRequest {
    apt_request(
        SourceId::Dpkg,
        action,
        CommandSpec::new(DPKG_QUERY_COMMAND).args(["-W", "-f", INSTALLED_FORMAT]),
    )
}

pub fn apt_package_files_request() -> ProcessSpawnRequest {
    apt_request(
        SourceId::Apt,
        SourceAction::ListVersions,
        CommandSpec::new(APT_CACHE_COMMAND).arg("policy"),
    )
}

pub fn apt_cache_policy_request(names: &[String]) -> ProcessSpawnRequest {
    apt_request(
        SourceId::Apt,
        SourceAction::ListVersions,
        CommandSpec::new(APT_CACHE_COMMAND)
            .arg("policy")
            .args(names.iter().cloned()),
    )
}

pub fn apt_cache_show_request(names: &[String]) -> ProcessSpawnRequest {
    apt_request(
        SourceId::Apt,
        SourceAction::ListVersions,
        CommandSpec::new(APT_CACHE_COMMAND)
            .arg("show")
            .args(names.iter().cloned()),
    )
}

fn apt_request(source: SourceId, action: SourceAction, command: CommandSpec) -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(source, action, command.env("LC_ALL", "C")).timeout(LIST_TIMEOUT)
}

/// Installed rows as `(name, version)`, in dpkg order.
fn parse_dpkg_installed(output: &str) -> Vec<(String, String)> {
    let mut packages = Vec::new();

    for line in output.lines().filter(|line| !line.trim().is_empty()) {
        // Format: "ii \tbash\t5.1-6ubuntu1"
        let mut fields = line.split('\t');
        let (Some(status), Some(name), Some(version)) = (fields.next(), fields.next(), fields.next())
        else {
            continue;
        };
        if status.trim() != "ii" {
            continue;
        }
        let name = name.trim();
        let version = version.trim();
        if name.is_empty() || version.is_empty() {
            continue;
        }
        packages.push((name.to_owned(), version.to_owned()));
    }

    packages
}

/// Maps each package-file line of the global policy table to its origin.
fn parse_package_files(output: &str) -> HashMap<String, OriginTuple> {
    let mut files = HashMap::new();
    let mut current: Option<(String, OriginTuple)> = None;

    for line in output.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("Pinned packages:") {
            break;
        }

        if let Some((_, location)) = split_priority(trimmed) {
            if let Some((key, origin)) = current.take() {
                files.insert(key, origin);
            }
            current = Some((location.to_owned(), OriginTuple::default()));
            continue;
        }

        let Some((_, origin)) = current.as_mut() else {
            continue;
        };
        if let Some(fields) = trimmed.strip_prefix("release ") {
            // Format: "v=22.04,o=Ubuntu,a=jammy-security,n=jammy,l=Ubuntu,c=main,b=amd64"
            for field in fields.split(',') {
                match field.split_once('=') {
                    Some(("o", value)) => origin.origin_label = value.to_owned(),
                    Some(("a", value)) => origin.archive_label = value.to_owned(),
                    Some(("c", value)) => origin.component = value.to_owned(),
                    _ => {}
                }
            }
        } else if let Some(site) = trimmed.strip_prefix("origin ") {
            origin.site = site.trim().to_owned();
        }
    }

    if let Some((key, origin)) = current.take() {
        files.insert(key, origin);
    }

    files
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
struct PolicyEntry {
    name: String,
    installed: Option<String>,
    candidate: Option<String>,
    versions: Vec<(String, Vec<OriginTuple>)>,
}

fn parse_policy(output: &str, files: &HashMap<String, OriginTuple>) -> Vec<PolicyEntry> {
    let mut entries = Vec::new();
    let mut current: Option<PolicyEntry> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        // Package header: "bash:" at column zero.
        if !line.starts_with(char::is_whitespace) {
            if let Some(entry) = current.take() {
                entries.push(entry);
            }
            let name = line.trim().trim_end_matches(':');
            current = Some(PolicyEntry {
                name: name.to_owned(),
                ..PolicyEntry::default()
            });
            continue;
        }

        let Some(entry) = current.as_mut() else {
            continue;
        };
        let trimmed = line.trim();

        if let Some(value) = trimmed.strip_prefix("Installed:") {
            entry.installed = policy_version(value);
        } else if let Some(value) = trimmed.strip_prefix("Candidate:") {
            entry.candidate = policy_version(value);
        } else if trimmed.starts_with("Version table:") {
            continue;
        } else if let Some(row) = version_row(line) {
            entry.versions.push((row.to_owned(), Vec::new()));
        } else if let Some((_, location)) = split_priority(trimmed) {
            let Some((_, origins)) = entry.versions.last_mut() else {
                continue;
            };
            if location == DPKG_STATUS_FILE {
                origins.push(OriginTuple::local_install());
            } else if let Some(origin) = files.get(location) {
                origins.push(origin.clone());
            } else {
                warn!(package = %entry.name, %location, "package file missing from apt policy");
            }
        }
    }

    if let Some(entry) = current.take() {
        entries.push(entry);
    }

    entries
}

fn policy_version(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "(none)" {
        None
    } else {
        Some(value.to_owned())
    }
}

/// Version rows sit at column five ("     1.0 500" or " *** 1.0 100"); package-file
/// rows beneath them are indented further. Phased updates carry a trailing
/// annotation: "     1.1 500 (phased 40%)".
fn version_row(line: &str) -> Option<&str> {
    let indent = line.len() - line.trim_start().len();
    let trimmed = line.trim();
    let row = match trimmed.strip_prefix("***") {
        Some(rest) => rest.trim_start(),
        None if indent <= 5 => trimmed,
        None => return None,
    };
    let (version, rest) = row.split_once(char::is_whitespace)?;
    let (priority, annotation) = match rest.trim_start().split_once(char::is_whitespace) {
        Some((priority, annotation)) => (priority, annotation.trim()),
        None => (rest.trim(), ""),
    };
    if priority.parse::<i32>().is_err() {
        return None;
    }
    if !annotation.is_empty() && !(annotation.starts_with('(') && annotation.ends_with(')')) {
        return None;
    }
    Some(version)
}

/// Splits "500 http://archive.ubuntu.com/ubuntu jammy/main amd64 Packages" into
/// its pin priority and package-file location.
fn split_priority(trimmed: &str) -> Option<(i32, &str)> {
    let (priority, location) = trimmed.split_once(' ')?;
    let priority = priority.parse::<i32>().ok()?;
    let location = location.trim();
    if location.is_empty() {
        return None;
    }
    Some((priority, location))
}

fn parse_show_sizes(output: &str) -> HashMap<(String, String), u64> {
    let mut sizes = HashMap::new();
    let mut package: Option<&str> = None;
    let mut version: Option<&str> = None;
    let mut size: Option<u64> = None;

    let mut flush = |package: &mut Option<&str>, version: &mut Option<&str>, size: &mut Option<u64>| {
        if let (Some(name), Some(version), Some(size)) = (package.take(), version.take(), size.take())
        {
            sizes.insert((name.to_owned(), version.to_owned()), size);
        }
    };

    for line in output.lines() {
        if line.trim().is_empty() {
            flush(&mut package, &mut version, &mut size);
            continue;
        }
        if let Some(value) = line.strip_prefix("Package:") {
            package = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("Version:") {
            version = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("Size:") {
            size = value.trim().parse().ok();
        }
    }
    flush(&mut package, &mut version, &mut size);

    sizes
}

fn build_installed_package(
    name: String,
    dpkg_version: String,
    policy: Option<PolicyEntry>,
    sizes: &HashMap<(String, String), u64>,
) -> InstalledPackage {
    let size_of = |version: &str| {
        sizes
            .get(&(name.clone(), version.to_owned()))
            .copied()
            .unwrap_or(0)
    };

    let Some(policy) = policy else {
        let installed = VersionRecord::new(dpkg_version.as_str())
            .download_size(size_of(&dpkg_version))
            .origin(OriginTuple::local_install());
        return InstalledPackage {
            name,
            available_versions: vec![installed.clone()],
            installed_version: installed,
            candidate: None,
        };
    };

    let available_versions: Vec<VersionRecord> = policy
        .versions
        .into_iter()
        .map(|(version, origins)| VersionRecord {
            download_size: size_of(&version),
            version,
            origins,
        })
        .collect();

    let installed_string = policy.installed.unwrap_or(dpkg_version);
    let installed_version = available_versions
        .iter()
        .find(|version| version.version == installed_string)
        .cloned()
        .unwrap_or_else(|| {
            VersionRecord::new(installed_string.as_str())
                .download_size(size_of(&installed_string))
                .origin(OriginTuple::local_install())
        });

    InstalledPackage {
        name,
        installed_version,
        available_versions,
        candidate: policy.candidate,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::models::{
        CoreError, CoreErrorKind, CoreResult, OriginTuple, SourceAction, SourceId,
    };
    use crate::sources::{ManifestLineSource, PackageIndex};

    use super::{
        AptPackageIndex, AptSource, apt_cache_policy_request, dpkg_installed_request,
        parse_dpkg_installed, parse_package_files, parse_policy, parse_show_sizes,
    };

    const INSTALLED_FIXTURE: &str = include_str!("../../tests/fixtures/apt/dpkg_installed.txt");
    const PACKAGE_FILES_FIXTURE: &str = include_str!("../../tests/fixtures/apt/policy_global.txt");
    const POLICY_FIXTURE: &str = include_str!("../../tests/fixtures/apt/policy_packages.txt");
    const SHOW_FIXTURE: &str = include_str!("../../tests/fixtures/apt/show.txt");

    #[test]
    fn parses_only_fully_installed_dpkg_rows() {
        let packages = parse_dpkg_installed(INSTALLED_FIXTURE);
        let names: Vec<&str> = packages.iter().map(|(name, _)| name.as_str()).collect();

        assert_eq!(
            names,
            vec!["bash", "libavcodec58", "openssl", "google-chrome-stable", "local-tool"]
        );
        assert_eq!(packages[0].1, "5.1-6ubuntu1");
    }

    #[test]
    fn parses_package_file_origins() {
        let files = parse_package_files(PACKAGE_FILES_FIXTURE);

        let security = &files["http://security.ubuntu.com/ubuntu jammy-security/main amd64 Packages"];
        assert_eq!(
            security,
            &OriginTuple::new("Ubuntu", "jammy-security", "main", "security.ubuntu.com")
        );
        let esm = &files["https://esm.ubuntu.com/apps/ubuntu jammy-apps-security/main amd64 Packages"];
        assert_eq!(esm.origin_label, "UbuntuESMApps");
        assert_eq!(esm.site, "esm.ubuntu.com");
        assert_eq!(files["/var/lib/dpkg/status"].archive_label, "now");
        assert!(!files.keys().any(|key| key.contains("Pinned")));
    }

    #[test]
    fn parses_policy_version_tables() {
        let files = parse_package_files(PACKAGE_FILES_FIXTURE);
        let entries = parse_policy(POLICY_FIXTURE, &files);

        assert_eq!(entries.len(), 5);
        let bash = &entries[0];
        assert_eq!(bash.name, "bash");
        assert_eq!(bash.installed.as_deref(), Some("5.1-6ubuntu1"));
        assert_eq!(bash.candidate.as_deref(), Some("5.1-6ubuntu1.1"));
        assert_eq!(bash.versions.len(), 2);
        assert_eq!(bash.versions[0].0, "5.1-6ubuntu1.1");
        assert_eq!(bash.versions[0].1.len(), 2);
        assert_eq!(bash.versions[0].1[1].archive_label, "jammy-security");
        assert_eq!(bash.versions[1].0, "5.1-6ubuntu1");
        assert_eq!(bash.versions[1].1.last(), Some(&OriginTuple::local_install()));

        let local = &entries[4];
        assert_eq!(local.name, "local-tool");
        assert_eq!(local.candidate.as_deref(), Some("0.1"));
        assert_eq!(local.versions.len(), 1);
        assert_eq!(local.versions[0].1, vec![OriginTuple::local_install()]);
    }

    #[test]
    fn phased_rows_keep_their_own_package_files() {
        let files = parse_package_files(PACKAGE_FILES_FIXTURE);
        let entries = parse_policy(POLICY_FIXTURE, &files);

        let openssl = entries.iter().find(|entry| entry.name == "openssl").unwrap();
        let versions: Vec<&str> = openssl.versions.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(
            versions,
            vec!["3.0.2-0ubuntu1.12", "3.0.2-0ubuntu1.10", "3.0.2-0ubuntu1"]
        );

        let phased: Vec<&str> = openssl.versions[0]
            .1
            .iter()
            .map(|origin| origin.archive_label.as_str())
            .collect();
        assert_eq!(phased, vec!["jammy-updates"]);
        let installed: Vec<&str> = openssl.versions[1]
            .1
            .iter()
            .map(|origin| origin.archive_label.as_str())
            .collect();
        assert_eq!(installed, vec!["jammy-updates", "jammy-security", "now"]);
    }

    #[test]
    fn phased_row_at_top_of_table_is_not_dropped() {
        let files = parse_package_files(PACKAGE_FILES_FIXTURE);
        let block = "systemd:\n  Installed: 249.11-0ubuntu3.6\n  Candidate: 249.11-0ubuntu3.7\n  Version table:\n     249.11-0ubuntu3.7 500 (phased 40%)\n        500 http://archive.ubuntu.com/ubuntu jammy-updates/main amd64 Packages\n *** 249.11-0ubuntu3.6 100\n        100 /var/lib/dpkg/status\n";
        let entries = parse_policy(block, &files);

        let versions = &entries[0].versions;
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].0, "249.11-0ubuntu3.7");
        assert_eq!(versions[0].1[0].archive_label, "jammy-updates");
        assert_eq!(versions[1].1, vec![OriginTuple::local_install()]);
    }

    #[test]
    fn policy_without_installed_version_reads_none() {
        let entries = parse_policy(
            "ghost:\n  Installed: (none)\n  Candidate: (none)\n  Version table:\n",
            &Default::default(),
        );
        assert_eq!(entries.len(), 1);
        assert!(entries[0].installed.is_none());
        assert!(entries[0].candidate.is_none());
        assert!(entries[0].versions.is_empty());
    }

    #[test]
    fn parses_download_sizes_per_version() {
        let sizes = parse_show_sizes(SHOW_FIXTURE);
        assert_eq!(
            sizes.get(&("bash".to_string(), "5.1-6ubuntu1.1".to_string())),
            Some(&769_428)
        );
        assert_eq!(
            sizes.get(&("bash".to_string(), "5.1-6ubuntu1".to_string())),
            Some(&768_906)
        );
    }

    #[test]
    fn index_assembles_installed_packages() {
        let index = AptPackageIndex::new(FixtureSource::default()).chunk_size(2);
        let packages = index.installed_packages_with_origins().unwrap();

        assert_eq!(packages.len(), 5);
        let bash = &packages[0];
        assert_eq!(bash.installed_version.version, "5.1-6ubuntu1");
        assert_eq!(bash.installed_version.origins.len(), 2);
        assert_eq!(bash.available_versions[0].download_size, 769_428);
        assert_eq!(bash.candidate.as_deref(), Some("5.1-6ubuntu1.1"));
    }

    #[test]
    fn index_queries_apt_in_chunks() {
        let source = FixtureSource::default();
        let index = AptPackageIndex::new(source).chunk_size(2);
        index.installed_packages_with_origins().unwrap();

        let calls = index.source.policy_calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], vec!["bash".to_string(), "libavcodec58".to_string()]);
        assert_eq!(calls[2], vec!["local-tool".to_string()]);
    }

    #[test]
    fn index_survives_failing_show() {
        let source = FixtureSource {
            fail_show: true,
            ..FixtureSource::default()
        };
        let packages = AptPackageIndex::new(source)
            .installed_packages_with_origins()
            .unwrap();
        assert!(packages
            .iter()
            .flat_map(|package| &package.available_versions)
            .all(|version| version.download_size == 0));
    }

    #[test]
    fn manifest_lines_keep_dpkg_order() {
        let index = AptPackageIndex::new(FixtureSource::default());
        let lines = index.manifest_lines().unwrap();
        assert_eq!(lines[0], "bash\t5.1-6ubuntu1");
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn installed_listing_failure_propagates() {
        let source = FixtureSource {
            fail_installed: true,
            ..FixtureSource::default()
        };
        let error = AptPackageIndex::new(source)
            .installed_packages_with_origins()
            .unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Unavailable);
    }

    #[test]
    fn request_builders_use_structured_args() {
        let installed = dpkg_installed_request(SourceAction::ListManifest);
        assert_eq!(installed.source, SourceId::Dpkg);
        assert_eq!(installed.action, SourceAction::ListManifest);
        assert_eq!(installed.command.args[0], "-W");
        assert_eq!(installed.command.env.get("LC_ALL").map(String::as_str), Some("C"));

        let policy = apt_cache_policy_request(&["bash".to_string(), "vim".to_string()]);
        assert_eq!(policy.command.args, vec!["policy", "bash", "vim"]);
        assert!(policy.timeout.is_some());
    }

    #[derive(Default)]
    struct FixtureSource {
        fail_installed: bool,
        fail_show: bool,
        policy_calls: Mutex<Vec<Vec<String>>>,
    }

    impl AptSource for FixtureSource {
        fn list_installed(&self) -> CoreResult<String> {
            if self.fail_installed {
                return Err(CoreError::new(
                    SourceId::Dpkg,
                    SourceAction::ListInstalled,
                    CoreErrorKind::Unavailable,
                    "dpkg database is locked",
                ));
            }
            Ok(INSTALLED_FIXTURE.to_string())
        }

        fn package_files(&self) -> CoreResult<String> {
            Ok(PACKAGE_FILES_FIXTURE.to_string())
        }

        fn policy(&self, names: &[String]) -> CoreResult<String> {
            self.policy_calls.lock().unwrap().push(names.to_vec());
            Ok(select_blocks(POLICY_FIXTURE, names))
        }

        fn show(&self, _names: &[String]) -> CoreResult<String> {
            if self.fail_show {
                return Err(CoreError::new(
                    SourceId::Apt,
                    SourceAction::ListVersions,
                    CoreErrorKind::ProcessFailure,
                    "E: No packages found",
                ));
            }
            Ok(SHOW_FIXTURE.to_string())
        }
    }

    /// Keeps only the policy blocks for `names`, as apt would print them.
    fn select_blocks(fixture: &str, names: &[String]) -> String {
        let mut out = String::new();
        let mut keep = false;
        for line in fixture.lines() {
            if !line.starts_with(char::is_whitespace) && !line.is_empty() {
                let name = line.trim_end_matches(':');
                keep = names.iter().any(|wanted| wanted == name);
            }
            if keep {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

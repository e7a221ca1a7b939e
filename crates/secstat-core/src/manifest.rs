use tracing::debug;

use crate::models::{CoreResult, PackageManifest};
use crate::sources::{ContainerPackageLister, ManifestLineSource};

/// Concatenates package-manager lines and container packages into one
/// `name\tversion` manifest, package-manager lines first. Nothing is sorted or
/// de-duplicated.
pub fn build_manifest(
    manager: &dyn ManifestLineSource,
    containers: &dyn ContainerPackageLister,
) -> CoreResult<PackageManifest> {
    let mut manifest_data = String::new();

    let lines = manager.manifest_lines()?;
    for line in &lines {
        manifest_data.push_str(line);
        manifest_data.push('\n');
    }

    let packages = containers.installed_container_packages()?;
    for package in &packages {
        manifest_data.push_str(&package.name);
        manifest_data.push('\t');
        manifest_data.push_str(&package.version);
        manifest_data.push('\n');
    }

    debug!(
        manager_lines = lines.len(),
        container_packages = packages.len(),
        "built package manifest"
    );
    Ok(PackageManifest { manifest_data })
}

#[cfg(test)]
mod tests {
    use crate::models::{ContainerPackage, CoreError, CoreErrorKind, CoreResult, SourceAction, SourceId};
    use crate::sources::{ContainerPackageLister, ManifestLineSource};

    use super::build_manifest;

    struct Lines(Vec<&'static str>);

    impl ManifestLineSource for Lines {
        fn manifest_lines(&self) -> CoreResult<Vec<String>> {
            Ok(self.0.iter().map(|line| line.to_string()).collect())
        }
    }

    struct Containers(Vec<(&'static str, &'static str)>);

    impl ContainerPackageLister for Containers {
        fn installed_container_packages(&self) -> CoreResult<Vec<ContainerPackage>> {
            Ok(self
                .0
                .iter()
                .map(|(name, version)| ContainerPackage {
                    name: name.to_string(),
                    version: version.to_string(),
                })
                .collect())
        }
    }

    struct Unavailable;

    impl ManifestLineSource for Unavailable {
        fn manifest_lines(&self) -> CoreResult<Vec<String>> {
            Err(CoreError::new(
                SourceId::Dpkg,
                SourceAction::ListManifest,
                CoreErrorKind::Unavailable,
                "dpkg database locked",
            ))
        }
    }

    fn snaps() -> Containers {
        Containers(vec![
            ("helloworld", "6.0.16"),
            ("bare", "1.0"),
            ("canonical-livepatch", "10.2.3"),
        ])
    }

    #[test]
    fn container_packages_only() {
        let manifest = build_manifest(&Lines(Vec::new()), &snaps()).unwrap();
        assert_eq!(
            manifest.manifest_data,
            "helloworld\t6.0.16\nbare\t1.0\ncanonical-livepatch\t10.2.3\n"
        );
    }

    #[test]
    fn manager_packages_only() {
        let manifest =
            build_manifest(&Lines(vec!["one\t4:1.0.2", "two\t0.1.1"]), &Containers(Vec::new()))
                .unwrap();
        assert_eq!(manifest.manifest_data, "one\t4:1.0.2\ntwo\t0.1.1\n");
    }

    #[test]
    fn manager_lines_precede_container_lines() {
        let manifest = build_manifest(&Lines(vec!["one\t4:1.0.2", "two\t0.1.1"]), &snaps()).unwrap();
        assert_eq!(
            manifest.manifest_data,
            "one\t4:1.0.2\ntwo\t0.1.1\nhelloworld\t6.0.16\nbare\t1.0\ncanonical-livepatch\t10.2.3\n"
        );
    }

    #[test]
    fn duplicate_names_are_kept() {
        let manifest = build_manifest(&Lines(vec!["bare\t1.0"]), &snaps()).unwrap();
        assert_eq!(manifest.manifest_data.matches("bare\t1.0\n").count(), 2);
    }

    #[test]
    fn empty_sources_give_empty_manifest() {
        let manifest = build_manifest(&Lines(Vec::new()), &Containers(Vec::new())).unwrap();
        assert!(manifest.manifest_data.is_empty());
    }

    #[test]
    fn collaborator_failure_propagates() {
        let error = build_manifest(&Unavailable, &snaps()).unwrap_err();
        assert_eq!(error.kind, CoreErrorKind::Unavailable);
        assert_eq!(error.collaborator, Some(SourceId::Dpkg));
    }

    #[test]
    fn serializes_as_manifest_data_field() {
        let manifest = build_manifest(&Lines(vec!["one\t1"]), &Containers(Vec::new())).unwrap();
        assert_eq!(
            serde_json::to_string(&manifest).unwrap(),
            r#"{"manifest_data":"one\t1\n"}"#
        );
    }
}

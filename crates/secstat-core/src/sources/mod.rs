pub mod apt;
pub mod apt_process;
pub(crate) mod process_utils;
pub mod pro;
pub mod pro_process;
pub mod snap;
pub mod snap_process;

pub use apt::{
    AptPackageIndex, AptSource, apt_cache_policy_request, apt_cache_show_request,
    apt_package_files_request, dpkg_installed_request,
};
pub use apt_process::ProcessAptSource;
pub use pro::{ProSource, ProSubscription, pro_status_request};
pub use pro_process::ProcessProSource;
pub use snap::{SnapPackages, SnapSource, snap_list_request};
pub use snap_process::ProcessSnapSource;

use crate::models::{ContainerPackage, CoreResult, InstalledPackage, SubscriptionStatus};

/// Installed packages with every known version and the origins of each.
pub trait PackageIndex: Send + Sync {
    fn installed_packages_with_origins(&self) -> CoreResult<Vec<InstalledPackage>>;
}

/// Installed package-manager packages, already formatted as `name\tversion`.
pub trait ManifestLineSource: Send + Sync {
    fn manifest_lines(&self) -> CoreResult<Vec<String>>;
}

pub trait ContainerPackageLister: Send + Sync {
    fn installed_container_packages(&self) -> CoreResult<Vec<ContainerPackage>>;
}

pub trait SubscriptionStatusSource: Send + Sync {
    fn subscription_status(&self) -> CoreResult<SubscriptionStatus>;
}

pub mod error;
pub mod package;
pub mod report;
pub mod service;
pub mod source;
pub mod subscription;

pub use error::{CoreError, CoreErrorKind, CoreResult};
pub use package::{ContainerPackage, InstalledPackage, OriginTuple, VersionRecord};
pub use report::{PackageManifest, SecurityReport, SecuritySummary, UpgradablePackage};
pub use service::ServiceBucket;
pub use source::{SourceAction, SourceId};
pub use subscription::{SubscriptionStatus, UpdateAvailability};

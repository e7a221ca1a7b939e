#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SourceId {
    Apt,
    Dpkg,
    Snap,
    Pro,
    Release,
}

impl SourceId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Apt => "apt",
            Self::Dpkg => "dpkg",
            Self::Snap => "snap",
            Self::Pro => "pro",
            Self::Release => "release",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SourceAction {
    ListInstalled,
    ListVersions,
    ListManifest,
    ListContainerPackages,
    ReadSubscription,
    DetectRelease,
}

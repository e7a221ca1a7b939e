use crate::models::{ServiceBucket, SubscriptionStatus, UpdateAvailability};

/// Whether an update from `service` can be obtained under `status`.
///
/// Standard security updates are always available. ESM updates need an attached
/// machine with the service enabled; otherwise the result says what is missing.
pub fn availability(service: ServiceBucket, status: &SubscriptionStatus) -> UpdateAvailability {
    if service == ServiceBucket::StandardSecurity
        || (status.attached && status.is_enabled(service))
    {
        return UpdateAvailability::UpgradeAvailable;
    }
    if !status.attached {
        return UpdateAvailability::PendingAttach;
    }
    if status.is_entitled(service) {
        return UpdateAvailability::PendingEnable;
    }
    UpdateAvailability::UpgradeUnavailable
}

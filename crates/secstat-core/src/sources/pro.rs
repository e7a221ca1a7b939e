use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::models::{
    CoreError, CoreErrorKind, CoreResult, ServiceBucket, SourceAction, SourceId,
    SubscriptionStatus,
};
use crate::sources::SubscriptionStatusSource;

const PRO_COMMAND: &str = "pro";
const STATUS_TIMEOUT: Duration = Duration::from_secs(60);

pub trait ProSource: Send + Sync {
    /// `pro status --format json --all` output.
    fn status(&self) -> CoreResult<String>;
}

pub struct ProSubscription<S: ProSource> {
    source: S,
}

impl<S: ProSource> ProSubscription<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ProSource> SubscriptionStatusSource for ProSubscription<S> {
    fn subscription_status(&self) -> CoreResult<SubscriptionStatus> {
        let raw = self.source.status()?;
        let status = parse_pro_status(&raw)?;
        debug!(
            attached = status.attached,
            entitled = status.entitled_services.len(),
            enabled = status.enabled_services.len(),
            "read subscription status"
        );
        Ok(status)
    }
}

pub fn pro_status_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        SourceId::Pro,
        SourceAction::ReadSubscription,
        CommandSpec::new(PRO_COMMAND).args(["status", "--format", "json", "--all"]),
    )
    .timeout(STATUS_TIMEOUT)
}

#[derive(Debug, Deserialize)]
struct ProStatus {
    attached: bool,
    #[serde(default)]
    services: Vec<ProService>,
}

#[derive(Debug, Deserialize)]
struct ProService {
    name: String,
    #[serde(default)]
    entitled: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn parse_pro_status(output: &str) -> CoreResult<SubscriptionStatus> {
    let parsed: ProStatus = serde_json::from_str(output.trim()).map_err(|error| {
        CoreError::new(
            SourceId::Pro,
            SourceAction::ReadSubscription,
            CoreErrorKind::ParseFailure,
            format!("invalid pro status JSON: {error}"),
        )
    })?;

    if !parsed.attached {
        return Ok(SubscriptionStatus::unattached());
    }

    let mut entitled = Vec::new();
    let mut enabled = Vec::new();
    for service in &parsed.services {
        let Ok(bucket) = service.name.parse::<ServiceBucket>() else {
            continue;
        };
        if service.entitled.as_deref() == Some("yes") {
            entitled.push(bucket);
        }
        if service.status.as_deref() == Some("enabled") {
            enabled.push(bucket);
        }
    }

    Ok(SubscriptionStatus::attached(&entitled, &enabled))
}

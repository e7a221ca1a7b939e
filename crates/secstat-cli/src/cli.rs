//! Command line interface definition

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};
use secstat_core::status::ListingKind;

/// secstat - security update status of installed packages
#[derive(Debug, Parser)]
#[command(name = "secstat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Security update status of installed Ubuntu packages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Release codename to classify against (defaults to /etc/os-release)
    #[arg(long, global = true, env = "SECSTAT_SERIES", value_name = "CODENAME")]
    pub series: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show security updates and where installed packages come from
    SecurityStatus(SecurityStatusArgs),

    /// Print the installed package manifest as JSON
    Manifest,
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("listing").args(["thirdparty", "unavailable", "esm_infra", "esm_apps"])
))]
pub struct SecurityStatusArgs {
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// List packages installed from third-party sources
    #[arg(long)]
    pub thirdparty: bool,

    /// List packages no longer available for download
    #[arg(long)]
    pub unavailable: bool,

    /// List packages covered by esm-infra (Main/Restricted)
    #[arg(long)]
    pub esm_infra: bool,

    /// List packages covered by esm-apps (Universe/Multiverse)
    #[arg(long)]
    pub esm_apps: bool,
}

impl SecurityStatusArgs {
    pub fn listing(&self) -> Option<ListingKind> {
        if self.thirdparty {
            Some(ListingKind::ThirdParty)
        } else if self.unavailable {
            Some(ListingKind::Unknown)
        } else if self.esm_infra {
            Some(ListingKind::EsmInfra)
        } else if self.esm_apps {
            Some(ListingKind::EsmApps)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

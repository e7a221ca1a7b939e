//! Output rendering

use std::io::{self, Write};

use secstat_core::entitlement::availability;
use secstat_core::models::{PackageManifest, SecurityReport, ServiceBucket, UpdateAvailability};
use secstat_core::status::{ListingKind, PackageListing, PackageSummary};

use crate::cli::OutputFormat;

/// Writes reports, listings and manifests in the requested format.
pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn render_report(&self, out: &mut impl Write, report: &SecurityReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, report),
            OutputFormat::Text => render_report_text(out, report),
        }
    }

    pub fn render_listing(&self, out: &mut impl Write, listing: &PackageListing) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => write_json(out, listing),
            OutputFormat::Text => render_listing_text(out, listing),
        }
    }
}

pub fn render_manifest(out: &mut impl Write, manifest: &PackageManifest) -> io::Result<()> {
    write_json(out, manifest)
}

fn write_json(out: &mut impl Write, value: &impl serde::Serialize) -> io::Result<()> {
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    writeln!(out, "{json}")
}

fn render_report_text(out: &mut impl Write, report: &SecurityReport) -> io::Result<()> {
    let summary = &report.summary;
    write_package_summary(out, &PackageSummary::from(summary), None)?;

    writeln!(out, "To get more information about the packages, run")?;
    writeln!(out, "    secstat security-status --help")?;
    writeln!(out, "for a list of available options.")?;
    writeln!(out)?;

    let standard = summary.num_standard_security_updates;
    writeln!(
        out,
        "{} standard security update{} available.",
        count_or_no(standard),
        plural(standard)
    )?;
    writeln!(out)?;

    let services = [
        (
            ServiceBucket::EsmInfra,
            "Main/Restricted",
            summary.num_esm_infra_packages,
            summary.num_esm_infra_updates,
        ),
        (
            ServiceBucket::EsmApps,
            "Universe/Multiverse",
            summary.num_esm_apps_packages,
            summary.num_esm_apps_updates,
        ),
    ];
    for (service, repository, installed, updates) in services {
        match availability(service, &summary.ua) {
            UpdateAvailability::UpgradeAvailable => writeln!(
                out,
                "This machine is receiving security patching for Ubuntu {repository} via {service}.\n\
                 {} package{} installed from {service}, {} pending update{}.",
                installed,
                plural(installed),
                count_or_no(updates),
                plural(updates)
            )?,
            UpdateAvailability::PendingAttach => writeln!(
                out,
                "{} additional security update{} for Ubuntu {repository} available with {service}.\n\
                 Attach this machine to an Ubuntu Pro subscription to receive them.",
                count_or_no(updates),
                plural(updates)
            )?,
            UpdateAvailability::PendingEnable => writeln!(
                out,
                "{} additional security update{} for Ubuntu {repository} available with {service}.\n\
                 Enable {service} with: pro enable {service}",
                count_or_no(updates),
                plural(updates)
            )?,
            UpdateAvailability::UpgradeUnavailable => writeln!(
                out,
                "{} additional security update{} for Ubuntu {repository} need {service},\n\
                 which this subscription is not entitled to.",
                count_or_no(updates),
                plural(updates)
            )?,
        }
        writeln!(out)?;
    }

    Ok(())
}

fn render_listing_text(out: &mut impl Write, listing: &PackageListing) -> io::Result<()> {
    write_package_summary(out, &listing.summary, Some(listing.kind))?;

    if listing.packages.is_empty() {
        writeln!(out, "{}", empty_message(listing.kind))?;
        return Ok(());
    }

    writeln!(out, "{}", description(listing.kind))?;
    writeln!(out)?;
    writeln!(out, "Packages:")?;
    writeln!(out, "{}", listing.packages.join(" "))?;

    if let Some(service) = listing.kind.update_service()
        && !listing.with_updates.is_empty()
    {
        writeln!(out)?;
        writeln!(out, "Packages with {service} updates:")?;
        let names: Vec<&str> = listing.with_updates.iter().map(String::as_str).collect();
        writeln!(out, "{}", names.join(" "))?;
    }

    if let Some(hint) = &listing.hint_package {
        writeln!(out)?;
        writeln!(out, "For example, run:")?;
        writeln!(out, "    apt-cache policy {hint}")?;
        writeln!(out, "to learn more about that package.")?;
    }

    Ok(())
}

fn write_package_summary(
    out: &mut impl Write,
    summary: &PackageSummary,
    show: Option<ListingKind>,
) -> io::Result<()> {
    let total = summary.installed;
    writeln!(out, "{total} package{} installed:", plural(total))?;

    let offset = " ".repeat(total.to_string().len() + 1);
    let shown = |kind: ListingKind| show.is_none_or(|selected| selected == kind);
    // A filtered summary always shows its own line, even at zero.
    let always = |kind: ListingKind| show == Some(kind);

    if shown(ListingKind::EsmInfra) {
        let count = summary.main_restricted;
        writeln!(
            out,
            "{offset}{count} package{} from Ubuntu Main/Restricted repository",
            plural(count)
        )?;
    }
    if shown(ListingKind::EsmApps)
        && (summary.universe_multiverse > 0 || always(ListingKind::EsmApps))
    {
        let count = summary.universe_multiverse;
        writeln!(
            out,
            "{offset}{count} package{} from Ubuntu Universe/Multiverse repository",
            plural(count)
        )?;
    }
    if shown(ListingKind::ThirdParty) && (summary.third_party > 0 || always(ListingKind::ThirdParty))
    {
        let count = summary.third_party;
        writeln!(out, "{offset}{count} package{} from third parties", plural(count))?;
    }
    if shown(ListingKind::Unknown) && (summary.unknown > 0 || always(ListingKind::Unknown)) {
        let count = summary.unknown;
        writeln!(
            out,
            "{offset}{count} package{} no longer available for download",
            plural(count)
        )?;
    }

    writeln!(out)
}

fn description(kind: ListingKind) -> &'static str {
    match kind {
        ListingKind::ThirdParty => {
            "Packages from third parties are not provided by the official Ubuntu\n\
             archive, for example packages from Personal Package Archives in Launchpad."
        }
        ListingKind::Unknown => {
            "Packages that are not available for download may be left over from a\n\
             previous release of Ubuntu, may have been installed directly from a\n\
             .deb file, or are from a source which has been disabled."
        }
        ListingKind::EsmInfra => {
            "Main/Restricted packages receive security updates from Canonical\n\
             through the esm-infra service once standard support ends."
        }
        ListingKind::EsmApps => {
            "Universe/Multiverse packages receive security updates from Canonical\n\
             through the esm-apps service."
        }
    }
}

fn empty_message(kind: ListingKind) -> &'static str {
    match kind {
        ListingKind::ThirdParty => "There are no third-party packages installed on this system.",
        ListingKind::Unknown => "There are no packages installed that are unavailable for download.",
        ListingKind::EsmInfra => "There are no Main/Restricted packages installed on this system.",
        ListingKind::EsmApps => "There are no Universe/Multiverse packages installed on this system.",
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

fn count_or_no(count: usize) -> String {
    if count == 0 {
        "No".to_string()
    } else {
        count.to_string()
    }
}

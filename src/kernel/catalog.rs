//! Kernel catalog construction from raw package listings.
//!
//! Parses package names against the kernel naming conventions with an
//! explicit grammar returning a tagged result, groups the matches into one
//! entry per kernel generation, and marks the running kernel. Strict
//! filtering: meta-packages (`linux-image-generic` and friends) and
//! non-kernel packages never enter the catalog.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::ParseError;
use crate::kernel::version::VersionKey;
use crate::models::{Catalog, KernelEntry, PackageKind, PackageRecord};

/// Outcome of matching one package name against the kernel naming grammar.
///
/// Tagged rather than coerced: callers can tell a versioned kernel package
/// from a meta-package from an unrelated package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Versioned kernel package, e.g. `linux-image-5.15.0-82-generic`.
    Kernel {
        kind: PackageKind,
        version: VersionKey,
    },
    /// Kernel meta-package without a concrete version, e.g. `linux-image-generic`.
    Meta,
    /// Not a kernel package. Ignored, not an error.
    Unrelated,
}

// Alternation order matters: longer prefixes first so `image-unsigned` and
// `modules-extra` are not swallowed by their shorter siblings.
static KERNEL_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^linux-(image-unsigned|image|headers|modules-extra|modules)-(\S+)$").unwrap()
});

/// Match a package name against the known kernel package naming conventions.
pub fn match_package_name(name: &str) -> NameMatch {
    let caps = match KERNEL_NAME.captures(name) {
        Some(caps) => caps,
        None => return NameMatch::Unrelated,
    };

    let kind = match &caps[1] {
        "image" | "image-unsigned" => PackageKind::Image,
        "headers" => PackageKind::Headers,
        _ => PackageKind::Modules,
    };

    match caps[2].parse::<VersionKey>() {
        Ok(version) => NameMatch::Kernel { kind, version },
        Err(_) => NameMatch::Meta,
    }
}

/// Build the kernel catalog from a raw package listing and the running-kernel
/// identifier reported by the host.
///
/// Package names sharing one extracted version are grouped into a single
/// entry. Records that do not match any kernel naming convention are simply
/// not kernel packages and are skipped; only an unparsable running-kernel
/// identifier is fatal.
///
/// # Arguments
///
/// * `records` - Installed package records from the package database query
/// * `running_release` - Running kernel identifier, e.g. from `uname -r`
pub fn build_catalog(
    records: &[PackageRecord],
    running_release: &str,
) -> Result<Catalog, ParseError> {
    let running: VersionKey = running_release.parse()?;

    let mut entries: BTreeMap<VersionKey, KernelEntry> = BTreeMap::new();

    for record in records {
        match match_package_name(&record.name) {
            NameMatch::Kernel { kind, version } => {
                let entry = entries.entry(version.clone()).or_insert_with(|| KernelEntry {
                    is_running: version == running,
                    version: version.clone(),
                    packages: BTreeMap::new(),
                });
                entry.packages.insert(record.name.clone(), kind);
            }
            NameMatch::Meta => {
                debug!(package = %record.name, "skipping kernel meta-package");
            }
            NameMatch::Unrelated => {}
        }
    }

    let running_installed = entries.contains_key(&running);
    if !running_installed {
        // Degraded condition: kernel binary deleted but still running. The
        // running version stays protected even without a catalog entry.
        warn!(
            running = %running,
            "running kernel has no installed package; it remains protected"
        );
    }

    debug!(
        generations = entries.len(),
        running = %running,
        "kernel catalog built"
    );

    Ok(Catalog::new(entries, running, running_installed))
}

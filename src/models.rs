//! Core data structures shared across kernreap modules.
//!
//! The catalog and classification types are built once per run and read-only
//! afterwards; every invocation recomputes them from a fresh package listing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::kernel::version::VersionKey;

/// Role a package plays within a kernel generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageKind {
    Image,
    Headers,
    Modules,
}

impl PackageKind {
    pub fn label(&self) -> &'static str {
        match self {
            PackageKind::Image => "image",
            PackageKind::Headers => "headers",
            PackageKind::Modules => "modules",
        }
    }
}

/// One row of the installed-package listing as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
}

impl PackageRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        PackageRecord {
            name: name.into(),
            version: version.into(),
        }
    }
}

/// One installed kernel generation: every package (image, headers, modules)
/// sharing a version, grouped into a single unit. Identity is the version.
#[derive(Debug, Clone, Serialize)]
pub struct KernelEntry {
    pub version: VersionKey,
    /// Package names mapped to the role each plays in this generation.
    pub packages: BTreeMap<String, PackageKind>,
    pub is_running: bool,
}

/// Immutable inventory of installed kernel generations, keyed by version.
///
/// The running version is tracked independently of catalog membership: a
/// kernel that is still running after its packages were removed from disk
/// has no entry here but stays protected (`running_installed` is false in
/// that degraded condition).
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: BTreeMap<VersionKey, KernelEntry>,
    running: VersionKey,
    running_installed: bool,
}

impl Catalog {
    pub(crate) fn new(
        entries: BTreeMap<VersionKey, KernelEntry>,
        running: VersionKey,
        running_installed: bool,
    ) -> Self {
        Catalog {
            entries,
            running,
            running_installed,
        }
    }

    /// Version of the currently running kernel, whether or not installed.
    pub fn running(&self) -> &VersionKey {
        &self.running
    }

    /// False when the running kernel has no corresponding installed packages.
    pub fn running_installed(&self) -> bool {
        self.running_installed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, version: &VersionKey) -> Option<&KernelEntry> {
        self.entries.get(version)
    }

    /// Entries in ascending version order.
    pub fn entries(&self) -> impl Iterator<Item = &KernelEntry> {
        self.entries.values()
    }

    /// Installed versions in ascending order.
    pub fn versions(&self) -> impl Iterator<Item = &VersionKey> {
        self.entries.keys()
    }
}

/// Result of partitioning the catalog into protected and removable kernels.
///
/// Invariants: `running` and `latest` are protected, `protected` and
/// `removable` are disjoint, and `removable` covers every installed version
/// outside the protected set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub running: VersionKey,
    pub latest: VersionKey,
    pub protected: BTreeSet<VersionKey>,
    pub removable: BTreeSet<VersionKey>,
}

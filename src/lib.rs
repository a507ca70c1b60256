//! kernreap: detect and remove obsolete Linux kernels and headers.
//!
//! Identifies installed kernel packages, classifies them against the running
//! and latest kernel versions, and produces a safety-validated removal plan.
//! The currently running kernel and the most recently installed kernel are
//! never removed.
//!
//! The crate is organized into functional modules:
//! - **error**: unified error type hierarchy
//! - **models**: core data structures (catalog, classification)
//! - **kernel**: version ordering, catalog construction, classification,
//!   and the removal-plan safety state machine
//! - **system**: process wrappers around `uname`, `dpkg`, and `apt-get`
//! - **report**: apt-style text output and JSON reporting
//!
//! Every invocation rebuilds the kernel inventory from scratch; nothing is
//! persisted between runs, and a plan is only executable after passing the
//! safety validator.

// Core foundational modules
pub mod error;
pub mod models;

// Kernel-domain logic
pub mod kernel;

// OS collaborators (package listing and removal)
pub mod system;

// Output formatting
pub mod report;

// Re-export error types for easy access
pub use error::{AppError, ParseError, Result, SystemError};

// Re-export model types for easy access
pub use models::{Catalog, Classification, KernelEntry, PackageKind, PackageRecord};

// Re-export the core pipeline pieces
pub use kernel::catalog::{build_catalog, match_package_name, NameMatch};
pub use kernel::classify::classify;
pub use kernel::validator::{
    PlanRejection, PlanStatus, ProposedPlan, RejectedReason, ValidatedPlan,
    BULK_CONFIRMATION_THRESHOLD,
};
pub use kernel::version::VersionKey;

//! Removal-plan safety validation.
//!
//! A proposed plan moves through a small state machine: Proposed, then
//! either Validated or Rejected. The rules run in a fixed order and the
//! first failing rule wins. The checks deliberately re-derive guarantees
//! the classifier already provides, as a separate pure function, so a
//! future classifier change cannot silently bypass them.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::kernel::version::VersionKey;
use crate::models::{Catalog, Classification};

/// Plans removing more generations than this are flagged for explicit
/// operator confirmation. A soft rule, not a rejection.
pub const BULK_CONFIRMATION_THRESHOLD: usize = 5;

/// Reason a proposed plan was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectedReason {
    /// A protected kernel appeared in the plan. The classifier makes this
    /// impossible, so triggering it indicates a defect upstream; logged at
    /// error severity for that reason.
    #[error("plan contains a protected kernel")]
    ProtectedKernelInPlan,

    /// Removal would leave zero kernels installed.
    #[error("no kernel would remain installed after removal")]
    NoKernelWouldRemain,
}

/// Outcome status of a validated plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    /// Removable work exists and every safety rule passed.
    Ready,
    /// Nothing to remove. Valid, but callers should report "nothing to do"
    /// rather than success.
    Empty,
}

/// A removal plan derived from a classification, not yet cleared to execute.
#[derive(Debug, Clone)]
pub struct ProposedPlan {
    versions: BTreeSet<VersionKey>,
    packages: Vec<String>,
}

impl ProposedPlan {
    /// Derive a plan covering every removable generation in the
    /// classification, expanded to the concrete package names.
    pub fn from_classification(catalog: &Catalog, classification: &Classification) -> Self {
        let mut packages = Vec::new();
        for version in &classification.removable {
            if let Some(entry) = catalog.get(version) {
                packages.extend(entry.packages.keys().cloned());
            }
        }
        ProposedPlan {
            versions: classification.removable.clone(),
            packages,
        }
    }

    pub fn versions(&self) -> &BTreeSet<VersionKey> {
        &self.versions
    }

    /// Run every safety rule, in order, against the plan.
    ///
    /// Consumes the proposal: the only way to obtain an executable plan is
    /// through this check, and any change to a validated plan requires
    /// building and validating a new proposal from scratch.
    pub fn validate(
        self,
        catalog: &Catalog,
        classification: &Classification,
    ) -> Result<ValidatedPlan, PlanRejection> {
        // Rule 1: no protected kernel may appear in the plan. Independent
        // re-check of a classifier guarantee.
        if let Some(overlap) = self
            .versions
            .intersection(&classification.protected)
            .next()
        {
            error!(
                version = %overlap,
                "protected kernel found in removal plan; refusing to validate"
            );
            return Err(PlanRejection {
                reason: RejectedReason::ProtectedKernelInPlan,
                detail: format!("protected kernel {overlap} is marked for removal"),
            });
        }

        // Rule 2: at least one kernel must remain installed. Recomputed from
        // the catalog size rather than trusting that rule 1 implies it.
        let remaining = catalog.len().saturating_sub(self.versions.len());
        if remaining < 1 {
            return Err(PlanRejection {
                reason: RejectedReason::NoKernelWouldRemain,
                detail: format!(
                    "removing {} of {} installed kernels would leave none",
                    self.versions.len(),
                    catalog.len()
                ),
            });
        }

        // Rule 3: bulk-removal guard. Flags the plan, never rejects it.
        let requires_confirmation = self.versions.len() > BULK_CONFIRMATION_THRESHOLD;
        if requires_confirmation {
            warn!(
                count = self.versions.len(),
                "bulk removal flagged for explicit confirmation"
            );
        }

        // Rule 4: an empty plan is valid but reported distinctly.
        let status = if self.versions.is_empty() {
            PlanStatus::Empty
        } else {
            PlanStatus::Ready
        };

        Ok(ValidatedPlan {
            versions: self.versions,
            packages: self.packages,
            status,
            requires_confirmation,
        })
    }
}

/// A plan that has passed every safety rule.
///
/// Fields are private: the executing collaborator reads the package list but
/// cannot add or substitute removal targets after validation.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedPlan {
    versions: BTreeSet<VersionKey>,
    packages: Vec<String>,
    status: PlanStatus,
    requires_confirmation: bool,
}

impl ValidatedPlan {
    pub fn status(&self) -> PlanStatus {
        self.status
    }

    /// Package names to remove, in deterministic version order.
    pub fn packages(&self) -> &[String] {
        &self.packages
    }

    pub fn versions(&self) -> &BTreeSet<VersionKey> {
        &self.versions
    }

    pub fn requires_confirmation(&self) -> bool {
        self.requires_confirmation
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }
}

/// A plan refused by the validator, carrying the first rule that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("removal plan rejected: {detail}")]
pub struct PlanRejection {
    pub reason: RejectedReason,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::catalog::build_catalog;
    use crate::kernel::classify::classify;
    use crate::models::PackageRecord;

    fn catalog_of(images: &[&str], running: &str) -> Catalog {
        let records: Vec<PackageRecord> = images
            .iter()
            .map(|v| PackageRecord::new(format!("linux-image-{v}"), "1.0"))
            .collect();
        build_catalog(&records, running).expect("catalog should build")
    }

    fn plan_of(versions: &[&str]) -> ProposedPlan {
        ProposedPlan {
            versions: versions.iter().map(|v| v.parse().unwrap()).collect(),
            packages: versions
                .iter()
                .map(|v| format!("linux-image-{v}"))
                .collect(),
        }
    }

    #[test]
    fn test_derived_plan_validates_ready() {
        let catalog = catalog_of(&["5.4.0-1", "5.4.0-2", "5.15.0-1"], "5.4.0-1");
        let classification = classify(&catalog);

        let plan = ProposedPlan::from_classification(&catalog, &classification)
            .validate(&catalog, &classification)
            .expect("classifier-derived plan must validate");

        assert_eq!(plan.status(), PlanStatus::Ready);
        assert!(!plan.requires_confirmation());
        assert_eq!(plan.packages(), ["linux-image-5.4.0-2"]);
    }

    #[test]
    fn test_protected_kernel_in_plan_is_rejected() {
        let catalog = catalog_of(&["5.4.0-1", "5.4.0-2", "5.15.0-1"], "5.4.0-1");
        let classification = classify(&catalog);

        // Tampered plan containing the running kernel.
        let rejection = plan_of(&["5.4.0-1", "5.4.0-2"])
            .validate(&catalog, &classification)
            .expect_err("protected kernel must be refused");

        assert_eq!(rejection.reason, RejectedReason::ProtectedKernelInPlan);
    }

    #[test]
    fn test_plan_leaving_no_kernel_is_rejected() {
        let catalog = catalog_of(&["5.15.0-1"], "5.15.0-1");
        let classification = classify(&catalog);

        // Tampered plan whose version is not even installed: it overlaps no
        // protected kernel, so rule 1 passes, but removing it would leave
        // the independently recomputed remaining count at zero.
        let rejection = plan_of(&["6.0.0-1"])
            .validate(&catalog, &classification)
            .expect_err("plan must be refused");

        assert_eq!(rejection.reason, RejectedReason::NoKernelWouldRemain);
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let catalog = catalog_of(&["5.4.0-1", "5.15.0-1"], "5.4.0-1");
        let classification = classify(&catalog);

        // Violates both the protected-overlap rule and the remaining-count
        // rule; the protected-overlap rejection must be reported.
        let rejection = plan_of(&["5.4.0-1", "5.15.0-1"])
            .validate(&catalog, &classification)
            .expect_err("plan must be refused");

        assert_eq!(rejection.reason, RejectedReason::ProtectedKernelInPlan);
    }

    #[test]
    fn test_empty_plan_is_valid_with_empty_status() {
        let catalog = catalog_of(&["5.15.0-1"], "5.15.0-1");
        let classification = classify(&catalog);

        let plan = ProposedPlan::from_classification(&catalog, &classification)
            .validate(&catalog, &classification)
            .expect("empty plan is valid");

        assert_eq!(plan.status(), PlanStatus::Empty);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_bulk_threshold_boundary() {
        let images: Vec<String> = (1..=7).map(|n| format!("5.4.0-{n}")).collect();
        let mut all: Vec<&str> = images.iter().map(String::as_str).collect();
        all.push("5.15.0-1");
        let catalog = catalog_of(&all, "5.15.0-1");
        let classification = classify(&catalog);

        // Exactly 5 removable generations: no confirmation required.
        let five: Vec<&str> = images.iter().take(5).map(String::as_str).collect();
        let plan = plan_of(&five)
            .validate(&catalog, &classification)
            .expect("plan must validate");
        assert!(!plan.requires_confirmation());

        // Six or more: flagged, still validated.
        let six: Vec<&str> = images.iter().take(6).map(String::as_str).collect();
        let plan = plan_of(&six)
            .validate(&catalog, &classification)
            .expect("bulk plan is flagged, not rejected");
        assert!(plan.requires_confirmation());
        assert_eq!(plan.status(), PlanStatus::Ready);
    }

    #[test]
    fn test_validated_plan_is_disjoint_from_protected() {
        let catalog = catalog_of(
            &["5.4.0-1", "5.4.0-2", "5.8.0-1", "5.15.0-1"],
            "5.4.0-2",
        );
        let classification = classify(&catalog);

        let plan = ProposedPlan::from_classification(&catalog, &classification)
            .validate(&catalog, &classification)
            .expect("plan must validate");

        for version in plan.versions() {
            assert!(!classification.protected.contains(version));
            assert!(classification.removable.contains(version));
        }
    }
}

//! Kernel classification: partition the catalog into protected and removable.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::{Catalog, Classification};

/// Partition the catalog into protected and removable kernel generations.
///
/// Protected is always `{running, latest}`; when the running kernel is also
/// the latest the set collapses to one element. Pure function of the
/// catalog: classifying the same catalog twice yields identical results.
pub fn classify(catalog: &Catalog) -> Classification {
    let running = catalog.running().clone();

    // Latest is the maximum under the version total order, independent of
    // which kernel is running. An empty catalog has no maximum; the running
    // version stands in so it is never proposed for removal either way.
    let latest = catalog
        .versions()
        .max()
        .cloned()
        .unwrap_or_else(|| running.clone());

    let mut protected = BTreeSet::new();
    protected.insert(running.clone());
    protected.insert(latest.clone());

    // With zero or one installed generation nothing is removable. The safety
    // validator re-checks this, but the sole remaining kernel must never be
    // proposed in the first place.
    let removable: BTreeSet<_> = if catalog.len() <= 1 {
        BTreeSet::new()
    } else {
        catalog
            .versions()
            .filter(|version| !protected.contains(*version))
            .cloned()
            .collect()
    };

    debug!(
        running = %running,
        latest = %latest,
        removable = removable.len(),
        "classification complete"
    );

    Classification {
        running,
        latest,
        protected,
        removable,
    }
}
